//! Materialized path encoding.
//!
//! A path lists a node's ancestors root first, each id followed by `/`, with a
//! leading `/`. Roots have the path `/`.

/// Deepest nesting the hierarchy accepts, counted in ancestors.
pub const MAX_DEPTH: usize = 64;

/// Path of a root category.
pub const ROOT: &str = "/";

/// Path prefix shared by every descendant of the node `id` at `path`.
pub fn lineage(path: &str, id: i64) -> String {
    format!("{path}{id}/")
}

/// Number of ancestors encoded in `path`.
pub fn depth(path: &str) -> usize {
    path.bytes().filter(|b| *b == b'/').count().saturating_sub(1)
}

/// Ancestor ids in `path`, root first.
///
/// Returns `None` if the path is malformed.
pub fn ancestor_ids(path: &str) -> Option<Vec<i64>> {
    let inner = path.strip_prefix('/')?;
    if inner.is_empty() {
        return Some(Vec::new());
    }
    let inner = inner.strip_suffix('/')?;
    inner.split('/').map(|s| s.parse().ok()).collect()
}

/// Half-open string range `[low, high)` covering every path that starts with
/// `lineage`.
///
/// Lineages always end in `/`, and `0` is the byte right after `/`, so
/// swapping the trailing slash for `0` gives the exclusive upper bound.
pub fn descendant_range(lineage: &str) -> (String, String) {
    let stem = lineage.strip_suffix('/').unwrap_or(lineage);
    (lineage.to_string(), format!("{stem}0"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn root_path() {
        assert_eq!(depth(ROOT), 0);
        assert_eq!(ancestor_ids(ROOT), Some(vec![]));
        assert_eq!(lineage(ROOT, 7), "/7/");
    }

    #[test]
    fn nested_path() {
        assert_eq!(depth("/1/4/"), 2);
        assert_eq!(ancestor_ids("/1/4/"), Some(vec![1, 4]));
        assert_eq!(lineage("/1/4/", 9), "/1/4/9/");
    }

    #[test]
    fn malformed_paths() {
        assert_eq!(ancestor_ids(""), None);
        assert_eq!(ancestor_ids("1/4/"), None);
        assert_eq!(ancestor_ids("/1/4"), None);
        assert_eq!(ancestor_ids("/1/x/"), None);
    }

    #[test]
    fn range_excludes_siblings_with_longer_ids() {
        let (low, high) = descendant_range("/1/");
        let inside = |p: &str| p >= low.as_str() && p < high.as_str();

        assert!(inside("/1/"));
        assert!(inside("/1/4/"));
        assert!(inside("/1/4/99/"));
        assert!(!inside("/10/"));
        assert!(!inside("/2/"));
        assert!(!inside("/"));
    }
}
