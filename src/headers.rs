//! FILENAME: src/headers.rs
//! Hierarchical label tree for row and column groupings.
//!
//! Each axis of the table owns one tree. The root's label is `""` and
//! represents the grand total; every other node's label is its parent's
//! label joined with its own value by `LABEL_SEPARATOR`. Nodes are created
//! lazily the first time a path is visited and never deleted.
//!
//! Children are owned by their parent (no back-pointers); parent lookup goes
//! through the path label via `parent_label`.

use rustc_hash::FxHashMap;

use crate::definition::Sort;

/// Path label delimiter. Chosen to be unlikely to appear in data.
pub const LABEL_SEPARATOR: &str = " | ";

/// One axis hierarchy. Wraps the root node and the tree-wide default
/// ordering strategy.
pub struct HeaderTree {
    root: HeaderNode,
}

impl HeaderTree {
    pub fn new(default_sort: Option<Sort>) -> Self {
        HeaderTree {
            root: HeaderNode::new(String::new(), default_sort),
        }
    }

    pub fn root(&self) -> &HeaderNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut HeaderNode {
        &mut self.root
    }

    /// Ordered labels of the whole tree, see [`HeaderNode::labels`].
    pub fn labels(&self, recursive: bool, include_self: bool) -> Vec<String> {
        self.root.labels(recursive, include_self)
    }
}

/// A node in a label tree.
pub struct HeaderNode {
    label: String,
    children: FxHashMap<String, HeaderNode>,
    /// First-visit order of the children, the default iteration order when
    /// no ordering strategy applies.
    order: Vec<String>,
    default_sort: Option<Sort>,
    sort: Option<Sort>,
}

impl HeaderNode {
    fn new(label: String, default_sort: Option<Sort>) -> Self {
        HeaderNode {
            label,
            children: FxHashMap::default(),
            order: Vec::new(),
            default_sort,
            sort: None,
        }
    }

    /// The full path label of this node (`""` for the root).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Overrides the ordering strategy for this node's direct children.
    /// `None` falls back to the tree's default strategy.
    pub fn set_sort(&mut self, sort: Option<Sort>) {
        self.sort = sort;
    }

    /// Returns the child for `value`, creating and registering it if absent.
    /// Idempotent per value.
    pub fn descend(&mut self, value: &str) -> &mut HeaderNode {
        let label = if self.label.is_empty() {
            value.to_string()
        } else {
            format!("{}{}{}", self.label, LABEL_SEPARATOR, value)
        };
        let default_sort = self.default_sort.clone();
        let order = &mut self.order;
        self.children.entry(value.to_string()).or_insert_with(|| {
            order.push(value.to_string());
            HeaderNode::new(label, default_sort)
        })
    }

    /// Looks up an existing child by its raw value.
    pub fn child(&self, value: &str) -> Option<&HeaderNode> {
        self.children.get(value)
    }

    /// Produces the ordered label sequence for this node.
    ///
    /// Direct children are ordered by the node's effective strategy (own
    /// override, else inherited default, else first-visit order). With
    /// `recursive`, each child's label is followed immediately by its own
    /// recursive labels, giving a depth-first pre-order where a node always
    /// precedes its descendants. With `include_self`, this node's own label
    /// is appended last (this places the running total after a level's
    /// entries).
    ///
    /// An ordering strategy may drop labels; dropped or unknown labels are
    /// skipped, not errors.
    pub fn labels(&self, recursive: bool, include_self: bool) -> Vec<String> {
        let mut labels = Vec::new();
        if !self.children.is_empty() {
            let mut keys = self.order.clone();
            if let Some(sort) = self.sort.as_ref().or(self.default_sort.as_ref()) {
                keys = (**sort)(keys);
            }
            for key in &keys {
                if let Some(child) = self.children.get(key) {
                    labels.push(child.label.clone());
                    if recursive {
                        labels.extend(child.labels(true, false));
                    }
                }
            }
        }
        if include_self {
            labels.push(self.label.clone());
        }
        labels
    }
}

/// The label of a path label's immediate parent: truncate at the last
/// separator occurrence; `""` when there is none (the parent is the root).
pub fn parent_label(label: &str) -> &str {
    if label.is_empty() {
        return "";
    }
    match label.rfind(LABEL_SEPARATOR) {
        Some(idx) if idx > 0 => &label[..idx],
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{alpha_sort, fixed_order, reverse_alpha_sort};

    fn seeded_tree() -> HeaderTree {
        let mut tree = HeaderTree::new(Some(alpha_sort()));
        tree.root_mut().descend("A1").descend("A2").descend("A3");
        tree.root_mut().descend("A1").descend("B2").descend("A3");
        tree.root_mut().descend("A1").descend("B2").descend("B3");
        tree.root_mut().descend("A2").descend("A2").descend("A3");
        tree.root_mut().descend("A2").descend("B2").descend("B3");
        tree
    }

    #[test]
    fn descend_builds_separator_joined_labels() {
        let mut tree = seeded_tree();
        let node = tree.root_mut().descend("A1").descend("A2");
        assert_eq!(node.label(), "A1 | A2");
    }

    #[test]
    fn descend_is_idempotent_per_value() {
        let mut tree = HeaderTree::new(None);
        tree.root_mut().descend("X");
        tree.root_mut().descend("X");
        assert_eq!(tree.labels(false, false), vec!["X".to_string()]);
    }

    #[test]
    fn sort_override_applies_to_direct_children() {
        let mut tree = seeded_tree();
        let node = tree.root_mut().descend("A1").descend("B2");
        node.set_sort(Some(reverse_alpha_sort()));
        let labels = node.labels(false, false);
        assert_eq!(labels, vec!["A1 | B2 | B3", "A1 | B2 | A3"]);
    }

    #[test]
    fn recursive_labels_keep_each_node_before_its_descendants() {
        let tree = seeded_tree();
        let labels = tree.labels(true, true);
        assert_eq!(
            labels,
            vec![
                "A1",
                "A1 | A2",
                "A1 | A2 | A3",
                "A1 | B2",
                "A1 | B2 | A3",
                "A1 | B2 | B3",
                "A2",
                "A2 | A2",
                "A2 | A2 | A3",
                "A2 | B2",
                "A2 | B2 | B3",
                "",
            ]
        );
    }

    #[test]
    fn default_order_without_strategy_is_first_visit_order() {
        let mut tree = HeaderTree::new(None);
        tree.root_mut().descend("Zebra");
        tree.root_mut().descend("Apple");
        tree.root_mut().descend("Zebra");
        assert_eq!(tree.labels(false, false), vec!["Zebra", "Apple"]);
    }

    #[test]
    fn filtering_strategy_drops_absent_labels_silently() {
        let mut tree = HeaderTree::new(None);
        tree.root_mut().descend("Mar");
        tree.root_mut().descend("Jan");
        tree.root_mut().descend("Sometime");
        tree.root_mut()
            .set_sort(Some(fixed_order(["Jan", "Feb", "Mar"])));
        assert_eq!(tree.labels(false, false), vec!["Jan", "Mar"]);
    }

    #[test]
    fn parent_label_walks_up_one_level_at_a_time() {
        assert_eq!(parent_label(""), "");
        assert_eq!(parent_label("A1"), "");
        assert_eq!(parent_label("A1 | B1"), "A1");
        assert_eq!(parent_label("A1 | B1 | C1"), "A1 | B1");
    }

    #[test]
    fn parent_label_chain_reaches_root_in_depth_steps() {
        let mut label = "A1 | B1 | C1";
        let mut steps = 0;
        while !label.is_empty() {
            label = parent_label(label);
            steps += 1;
        }
        assert_eq!(steps, 3);
    }
}
