//! Descendant-set resolution.
//!
//! [`from_path_rows`] checks the result of the store's single prefix query
//! on `path`, and is the only strategy the store serves requests with.
//!
//! [`walk`] follows `parent_id` edges over an in-memory snapshot. Nothing in
//! the request path calls it: it is the oracle the unit and integration
//! tests compare the path strategy against, and it is public only so the
//! integration tests can reach it.
//!
//! Both give up with [`AppError::CorruptHierarchy`] rather than loop on data
//! that slipped past validation.

use std::collections::{BTreeSet, HashMap};

use crate::category::path::{self, MAX_DEPTH};
use crate::error::{AppError, AppResult};
use crate::models::Category;

/// Collect `target` plus the ids of `rows`, which must be the live rows whose
/// path starts with the target's lineage.
pub fn from_path_rows(target: &Category, rows: &[Category]) -> AppResult<BTreeSet<i64>> {
    let lineage = target.lineage();
    let base = target.depth();

    let mut ids = BTreeSet::from([target.id]);
    for row in rows {
        if !row.path.starts_with(&lineage) {
            return Err(AppError::CorruptHierarchy(format!(
                "category {} (path {}) is not below category {}",
                row.id, row.path, target.id
            )));
        }

        let Some(ancestors) = path::ancestor_ids(&row.path) else {
            return Err(AppError::CorruptHierarchy(format!(
                "category {} has malformed path {:?}",
                row.id, row.path
            )));
        };
        if ancestors.contains(&row.id) {
            return Err(AppError::CorruptHierarchy(format!(
                "category {} is listed among its own ancestors",
                row.id
            )));
        }
        if row.depth().saturating_sub(base) > MAX_DEPTH {
            return Err(AppError::CorruptHierarchy(format!(
                "category {} is nested more than {MAX_DEPTH} levels below category {}",
                row.id, target.id
            )));
        }

        if !ids.insert(row.id) {
            return Err(AppError::CorruptHierarchy(format!(
                "category {} appears twice below category {}",
                row.id, target.id
            )));
        }
    }

    Ok(ids)
}

/// Breadth-first walk of `parent_id` edges from `root` over `rows`.
///
/// Test oracle for [`from_path_rows`]; not used to serve requests.
///
/// The result includes `root` itself. Reaching a node twice, or going more
/// than [`MAX_DEPTH`] levels down, is reported as corruption.
pub fn walk(root: i64, rows: &[Category]) -> AppResult<BTreeSet<i64>> {
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in rows {
        if let Some(parent_id) = row.parent_id {
            children.entry(parent_id).or_default().push(row.id);
        }
    }

    let mut seen = BTreeSet::from([root]);
    let mut frontier = vec![root];
    let mut depth = 0;

    while !frontier.is_empty() {
        if depth > MAX_DEPTH {
            return Err(AppError::CorruptHierarchy(format!(
                "descendants of category {root} go deeper than {MAX_DEPTH} levels"
            )));
        }

        let mut next = Vec::new();
        for id in frontier {
            for &child in children.get(&id).map(Vec::as_slice).unwrap_or_default() {
                if !seen.insert(child) {
                    return Err(AppError::CorruptHierarchy(format!(
                        "category {child} is reached twice below category {root}"
                    )));
                }
                next.push(child);
            }
        }

        frontier = next;
        depth += 1;
    }

    Ok(seen)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn category(id: i64, parent_id: Option<i64>, path: &str) -> Category {
        Category {
            id,
            name: format!("c{id}"),
            parent_id,
            path: path.to_string(),
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    /// Technology(1) -> Mobile(2) -> Android(3), plus Cooking(4) and
    /// Tablets(5) under Technology.
    fn sample() -> Vec<Category> {
        vec![
            category(1, None, "/"),
            category(2, Some(1), "/1/"),
            category(3, Some(2), "/1/2/"),
            category(4, None, "/"),
            category(5, Some(1), "/1/"),
        ]
    }

    fn below(target: &Category, rows: &[Category]) -> Vec<Category> {
        let lineage = target.lineage();
        rows.iter()
            .filter(|r| r.path.starts_with(&lineage))
            .cloned()
            .collect()
    }

    #[test]
    fn walk_includes_root_and_all_levels() {
        let rows = sample();
        assert_eq!(walk(1, &rows).unwrap(), BTreeSet::from([1, 2, 3, 5]));
        assert_eq!(walk(2, &rows).unwrap(), BTreeSet::from([2, 3]));
        assert_eq!(walk(4, &rows).unwrap(), BTreeSet::from([4]));
    }

    #[test]
    fn path_rows_match_walk() {
        let rows = sample();
        for target in &rows {
            let by_path = from_path_rows(target, &below(target, &rows)).unwrap();
            let by_walk = walk(target.id, &rows).unwrap();
            assert_eq!(by_path, by_walk, "mismatch for category {}", target.id);
        }
    }

    #[test]
    fn walk_detects_cycle_through_root() {
        let rows = vec![category(1, Some(2), "/2/"), category(2, Some(1), "/1/")];
        let err = walk(1, &rows).unwrap_err();
        assert!(matches!(err, AppError::CorruptHierarchy(_)));
    }

    #[test]
    fn walk_detects_self_parent() {
        let rows = vec![category(1, Some(1), "/1/")];
        assert!(matches!(
            walk(1, &rows).unwrap_err(),
            AppError::CorruptHierarchy(_)
        ));
    }

    #[test]
    fn walk_bounds_depth() {
        let rows: Vec<_> = (1..=(MAX_DEPTH as i64 + 2))
            .map(|i| category(i, (i > 1).then_some(i - 1), ""))
            .collect();
        assert!(matches!(
            walk(1, &rows).unwrap_err(),
            AppError::CorruptHierarchy(_)
        ));

        let shallow: Vec<_> = rows[..MAX_DEPTH].to_vec();
        assert_eq!(walk(1, &shallow).unwrap().len(), MAX_DEPTH);
    }

    #[test]
    fn path_rows_reject_self_in_path() {
        let target = category(1, None, "/");
        let looped = category(2, Some(1), "/1/2/");
        let err = from_path_rows(&target, &[looped]).unwrap_err();
        assert!(matches!(err, AppError::CorruptHierarchy(_)));
    }

    #[test]
    fn path_rows_reject_foreign_rows() {
        let target = category(1, None, "/");
        let stranger = category(7, Some(10), "/10/");
        assert!(from_path_rows(&target, &[stranger]).is_err());
    }

    #[test]
    fn path_rows_reject_malformed_paths() {
        let target = category(1, None, "/");
        let broken = category(3, Some(1), "/1/x/");
        assert!(from_path_rows(&target, &[broken]).is_err());
    }
}
