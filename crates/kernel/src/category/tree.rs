//! Nested category tree built from flat rows.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::models::Category;

/// A category with its children, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}

/// Build a forest from categories.
///
/// Siblings keep the relative order they have in `categories`. Every input
/// row appears exactly once: rows whose parent is missing from the input,
/// and rows caught in a parent cycle, are appended as extra roots.
pub fn build_tree(categories: &[Category]) -> Vec<TreeNode> {
    let mut groups: HashMap<Option<i64>, Vec<&Category>> = HashMap::new();
    for category in categories {
        groups.entry(category.parent_id).or_default().push(category);
    }

    let mut placed = HashSet::with_capacity(categories.len());
    let mut roots = attach(None, &groups, &mut placed);

    if placed.len() < categories.len() {
        let ids: HashSet<i64> = categories.iter().map(|c| c.id).collect();

        // Orphans first, then whatever is left, which can only be cycles.
        let orphans = categories
            .iter()
            .filter(|c| c.parent_id.is_some_and(|p| !ids.contains(&p)));
        for category in orphans.chain(categories.iter()) {
            if placed.insert(category.id) {
                warn!(
                    category_id = category.id,
                    parent_id = ?category.parent_id,
                    "category not reachable from a root; listing it as one"
                );
                roots.push(TreeNode {
                    category: category.clone(),
                    children: attach(Some(category.id), &groups, &mut placed),
                });
            }
        }
    }

    roots
}

fn attach(
    parent_id: Option<i64>,
    groups: &HashMap<Option<i64>, Vec<&Category>>,
    placed: &mut HashSet<i64>,
) -> Vec<TreeNode> {
    let Some(members) = groups.get(&parent_id) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(members.len());
    for category in members {
        if !placed.insert(category.id) {
            continue;
        }
        nodes.push(TreeNode {
            category: (*category).clone(),
            children: attach(Some(category.id), groups, placed),
        });
    }
    nodes
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn category(id: i64, name: &str, parent_id: Option<i64>) -> Category {
        Category {
            id,
            name: name.to_string(),
            parent_id,
            path: String::new(),
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    fn collect_ids(nodes: &[TreeNode], out: &mut Vec<i64>) {
        for node in nodes {
            out.push(node.category.id);
            collect_ids(&node.children, out);
        }
    }

    fn check_parents(nodes: &[TreeNode], parent: Option<i64>) {
        for node in nodes {
            assert_eq!(node.category.parent_id, parent);
            check_parents(&node.children, Some(node.category.id));
        }
    }

    #[test]
    fn nests_children_under_parents() {
        let rows = vec![
            category(3, "Android", Some(2)),
            category(2, "Mobile", Some(1)),
            category(1, "Technology", None),
        ];

        let forest = build_tree(&rows);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].category.name, "Technology");
        assert_eq!(forest[0].children[0].category.name, "Mobile");
        assert_eq!(forest[0].children[0].children[0].category.name, "Android");
        assert_eq!(forest[0].size(), 3);
    }

    #[test]
    fn forest_keeps_input_order() {
        let rows = vec![
            category(5, "Art", None),
            category(2, "Books", Some(5)),
            category(1, "Music", None),
            category(4, "Albums", Some(5)),
        ];

        let forest = build_tree(&rows);
        let roots: Vec<_> = forest.iter().map(|n| n.category.id).collect();
        assert_eq!(roots, vec![5, 1]);

        let children: Vec<_> = forest[0].children.iter().map(|n| n.category.id).collect();
        assert_eq!(children, vec![2, 4]);
    }

    #[test]
    fn every_category_appears_once_with_its_parent() {
        let rows: Vec<_> = (1..=40)
            .map(|i| category(i, &format!("n{i}"), (i > 3).then_some(i / 3)))
            .collect();

        let forest = build_tree(&rows);
        let mut ids = Vec::new();
        collect_ids(&forest, &mut ids);
        ids.sort_unstable();
        assert_eq!(ids, (1..=40).collect::<Vec<_>>());
        check_parents(&forest, None);
    }

    #[test]
    fn idempotent_and_input_untouched() {
        let rows = vec![
            category(1, "Technology", None),
            category(2, "Mobile", Some(1)),
            category(3, "Android", Some(2)),
            category(4, "Cooking", None),
        ];
        let snapshot = rows.clone();

        let first = build_tree(&rows);
        let second = build_tree(&rows);
        assert_eq!(first, second);
        assert_eq!(rows, snapshot);
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        assert!(build_tree(&[]).is_empty());
    }

    #[test]
    fn orphans_become_extra_roots() {
        let rows = vec![
            category(7, "Stray child", Some(8)),
            category(8, "Stray", Some(99)),
            category(1, "Root", None),
        ];

        let forest = build_tree(&rows);
        let roots: Vec<_> = forest.iter().map(|n| n.category.id).collect();
        assert_eq!(roots, vec![1, 8]);
        assert_eq!(forest[1].children[0].category.id, 7);
    }

    #[test]
    fn cycles_terminate_and_keep_every_row() {
        let rows = vec![
            category(1, "a", Some(2)),
            category(2, "b", Some(1)),
            category(3, "c", None),
        ];

        let forest = build_tree(&rows);
        let mut ids = Vec::new();
        collect_ids(&forest, &mut ids);
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn serializes_flat_fields_with_children() {
        let forest = build_tree(&[category(1, "Technology", None)]);
        let json = serde_json::to_value(&forest).unwrap();

        assert_eq!(json[0]["id"], 1);
        assert_eq!(json[0]["name"], "Technology");
        assert!(json[0]["children"].as_array().unwrap().is_empty());
    }
}
