//! Hierarchical tag index
//!
//! Maps slash-delimited tag paths to registered values and answers exact
//! and wildcard lookups. A query segment equal to `*` matches any single
//! concrete segment at that position.

use std::collections::BTreeMap;

use super::tag::{SEPARATOR, WILDCARD};

/// A trie over tag path segments.
///
/// Children are kept in a `BTreeMap` so traversal order, and therefore
/// glob results, are deterministic.
#[derive(Debug, Clone)]
pub struct TagTree<T> {
    root: Node<T>,
}

#[derive(Debug, Clone)]
struct Node<T> {
    children: BTreeMap<String, Node<T>>,
    values: Vec<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Node {
            children: BTreeMap::new(),
            values: Vec::new(),
        }
    }
}

impl<T> Default for TagTree<T> {
    fn default() -> Self {
        TagTree {
            root: Node::default(),
        }
    }
}

impl<T: Clone + PartialEq> TagTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a value at the given path.
    ///
    /// Re-inserting an identical (path, value) pair is a no-op.
    pub fn insert(&mut self, path: &str, value: T) {
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = node.children.entry(segment.to_string()).or_default();
        }
        if !node.values.contains(&value) {
            node.values.push(value);
        }
    }

    /// Returns the first value registered at exactly this path.
    pub fn lookup_exact(&self, path: &str) -> Option<&T> {
        let mut node = &self.root;
        for segment in segments(path) {
            node = node.children.get(segment)?;
        }
        node.values.first()
    }

    /// Returns every value whose registered path matches the pattern.
    ///
    /// Pattern segments equal to the wildcard marker match any single
    /// segment; all other segments must match literally.
    pub fn glob(&self, pattern: &str) -> Vec<T> {
        let parts: Vec<&str> = segments(pattern).collect();
        let mut results = Vec::new();
        collect(&self.root, &parts, &mut results);
        results
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty() && self.root.values.is_empty()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

fn collect<'a, T: Clone + PartialEq>(node: &'a Node<T>, pattern: &[&str], results: &mut Vec<T>) {
    match pattern.split_first() {
        None => {
            for value in &node.values {
                if !results.contains(value) {
                    results.push(value.clone());
                }
            }
        }
        Some((segment, rest)) => {
            if segment.len() == 1 && segment.starts_with(WILDCARD) {
                for child in node.children.values() {
                    collect(child, rest, results);
                }
            } else if let Some(child) = node.children.get(*segment) {
                collect(child, rest, results);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagTree<u32> {
        let mut tree = TagTree::new();
        tree.insert("Core/Class", 1);
        tree.insert("Core/Hash", 2);
        tree.insert("Orwik/Class", 3);
        tree.insert("Orwik/Widget/Input", 4);
        tree
    }

    #[test]
    fn exact_lookup() {
        let tree = sample();
        assert_eq!(tree.lookup_exact("Core/Class"), Some(&1));
        assert_eq!(tree.lookup_exact("Core/Missing"), None);
    }

    #[test]
    fn leading_slash_is_ignored() {
        let tree = sample();
        assert_eq!(tree.lookup_exact("/Core/Class"), Some(&1));
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut tree = sample();
        tree.insert("Core/Class", 1);
        assert_eq!(tree.glob("Core/Class"), vec![1]);
    }

    #[test]
    fn same_path_multiple_values() {
        let mut tree = sample();
        tree.insert("Core/Class", 9);
        assert_eq!(tree.glob("Core/Class"), vec![1, 9]);
    }

    #[test]
    fn glob_with_literal_pattern() {
        let tree = sample();
        assert_eq!(tree.glob("Orwik/Class"), vec![3]);
    }

    #[test]
    fn glob_wildcard_name() {
        let tree = sample();
        assert_eq!(tree.glob("Core/*"), vec![1, 2]);
    }

    #[test]
    fn glob_wildcard_namespace() {
        let tree = sample();
        assert_eq!(tree.glob("*/Class"), vec![1, 3]);
    }

    #[test]
    fn wildcard_matches_exactly_one_segment() {
        let tree = sample();
        // Orwik/Widget/Input is two segments below Orwik.
        assert!(!tree.glob("Orwik/*").contains(&4));
        assert_eq!(tree.glob("Orwik/*/Input"), vec![4]);
    }

    #[test]
    fn no_match_returns_empty() {
        let tree = sample();
        assert!(tree.glob("Missing/*").is_empty());
    }

    #[test]
    fn empty_tree() {
        let tree: TagTree<u32> = TagTree::new();
        assert!(tree.is_empty());
        assert!(tree.glob("*").is_empty());
    }
}
