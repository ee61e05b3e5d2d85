//! Quill test utilities.
//!
//! Helpers for integration testing: request payload builders, user
//! fixtures, and assertion utilities for the JSON API.

use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

/// Password given to every [`TestUser`].
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Payload for creating a root category.
pub fn category(name: &str) -> JsonValue {
    json!({ "name": name })
}

/// Payload for creating a category under `parent_id`.
pub fn child_category(name: &str, parent_id: i64) -> JsonValue {
    json!({ "name": name, "parent_id": parent_id })
}

/// Payload for moving a category under `parent_id`, or to the root with `None`.
pub fn reparent(parent_id: Option<i64>) -> JsonValue {
    json!({ "parent_id": parent_id })
}

/// Payload for creating a post.
pub fn post(title: &str, category_id: i64) -> JsonValue {
    json!({
        "title": title,
        "content": format!("Body of {title}."),
        "category_id": category_id,
    })
}

/// Payload for creating or editing a comment.
pub fn comment(content: &str) -> JsonValue {
    json!({ "content": content })
}

/// Create a test user with a unique email address.
pub fn test_user(name: &str) -> TestUser {
    TestUser {
        name: name.to_string(),
        email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::now_v7().simple()),
        password: TEST_PASSWORD.to_string(),
    }
}

/// A user fixture; register it through the API to get a token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl TestUser {
    /// Set a custom email.
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// Set a custom password.
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    /// Body for `POST /api/auth/register`.
    pub fn register_payload(&self) -> JsonValue {
        json!({
            "name": self.name,
            "email": self.email,
            "password": self.password,
        })
    }

    /// Body for `POST /api/auth/login`.
    pub fn login_payload(&self) -> JsonValue {
        json!({
            "email": self.email,
            "password": self.password,
        })
    }
}

/// Assertion helpers for JSON responses.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON value equals expected.
    pub fn json_eq(actual: &Value, expected: &Value) {
        assert_eq!(
            actual, expected,
            "JSON mismatch:\nactual: {actual:#}\nexpected: {expected:#}"
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a `{data, meta}` page reports `total` items.
    pub fn page_total(page: &Value, total: i64) {
        assert_eq!(
            page["meta"]["total"].as_i64(),
            Some(total),
            "Expected page total {total}, got: {page}"
        );
    }

    /// Ids of the objects in a JSON array, or in a page's `data` array.
    pub fn ids(value: &Value) -> Vec<i64> {
        let items = value.get("data").unwrap_or(value);
        items
            .as_array()
            .map(|items| items.iter().filter_map(|i| i["id"].as_i64()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn payload_builders() {
        assert_eq!(child_category("Mobile", 1)["parent_id"], 1);
        assert_eq!(reparent(None), json!({"parent_id": null}));
        assert_eq!(post("Hello", 3)["category_id"], 3);
        assert_eq!(comment("hi")["content"], "hi");
    }

    #[test]
    fn test_users_get_unique_emails() {
        let a = test_user("Ada");
        let b = test_user("Ada");
        assert_ne!(a.email, b.email);
        assert!(a.email.starts_with("ada-"));
        assert_eq!(a.register_payload()["password"], TEST_PASSWORD);

        let custom = a.with_email("x@example.com").with_password("other-secret");
        assert_eq!(custom.login_payload()["email"], "x@example.com");
        assert_eq!(custom.login_payload()["password"], "other-secret");
    }

    #[test]
    fn test_assertions() {
        let page = json!({"data": [{"id": 2}, {"id": 1}], "meta": {"total": 2}});
        assert::has_key(&page, "meta");
        assert::page_total(&page, 2);
        assert_eq!(assert::ids(&page), vec![2, 1]);
        assert_eq!(assert::ids(&json!([{"id": 5}])), vec![5]);
        assert::json_eq(&page["meta"], &json!({"total": 2}));
        assert::contains("hello world", "world");
    }
}
