//! Segment trie holding compiled routes.
//!
//! Each node maps literal segments to children and owns at most one *fuzzy* child, shared by
//! every named, template and wildcard continuation at that position. Routes are anchored in a
//! node's terminal list in two ways:
//!
//! - at the node where a fuzzy segment of the route branches off (the route passes through the
//!   fuzzy child, so the list acts as a fallback for everything below it)
//! - at the leaf node reached by the route's last literal segment
//!
//! A route with several fuzzy segments sits in several lists. The tree only narrows candidates;
//! the route regex makes the final decision, so a fuzzy list may hold routes whose regex will not
//! match a path that reaches it.
//!
//! ## Example
//!
//! Registering `/user/list`, `/user/:id` and `/user/:id/*rest` yields:
//!
//! ```text
//! root
//! └── "user"   routes: [/user/:id/*rest, /user/:id]
//!     ├── "list"   routes: [/user/list]
//!     └── (fuzzy)  routes: [/user/:id/*rest]
//!         └── (fuzzy)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use super::compile::{specificity, CompiledRoute, Segment};

/// Node in the route tree.
#[derive(Default)]
pub(crate) struct RouteNode {
    /// Children keyed by literal segment text (the root URI uses the key `/`)
    children: HashMap<String, RouteNode>,
    /// Single child shared by all fuzzy segments at this position
    fuzzy: Option<Box<RouteNode>>,
    /// Routes anchored here, most specific first
    routes: Vec<Arc<CompiledRoute>>,
}

impl RouteNode {
    /// Insert a route into the tree below this node.
    pub(crate) fn insert(&mut self, route: &Arc<CompiledRoute>) {
        self.insert_segments(&route.segments, route);
    }

    fn insert_segments(&mut self, segments: &[Segment], route: &Arc<CompiledRoute>) {
        let Some((segment, remaining)) = segments.split_first() else {
            return;
        };

        if segment.is_fuzzy() {
            self.anchor(route);
            self.fuzzy
                .get_or_insert_with(Box::default)
                .insert_segments(remaining, route);
            return;
        }

        let key = match segment {
            Segment::Literal(text) => text.clone(),
            _ => return,
        };
        let child = self.children.entry(key).or_default();
        if remaining.is_empty() {
            child.anchor(route);
        } else {
            child.insert_segments(remaining, route);
        }
    }

    /// Append to the terminal list and restore specificity order. The sort is stable, so
    /// equally specific routes keep registration order.
    fn anchor(&mut self, route: &Arc<CompiledRoute>) {
        self.routes.push(Arc::clone(route));
        self.routes.sort_by(|a, b| specificity(b, a));
    }

    /// Swap every occurrence of the route with `id` for `route`, keeping list positions.
    pub(crate) fn replace(&mut self, id: u64, route: &Arc<CompiledRoute>) {
        for slot in self.routes.iter_mut().filter(|r| r.id == id) {
            *slot = Arc::clone(route);
        }
        for child in self.children.values_mut() {
            child.replace(id, route);
        }
        if let Some(fuzzy) = self.fuzzy.as_deref_mut() {
            fuzzy.replace(id, route);
        }
    }

    /// Walk `segments` from this node and collect the non-empty terminal lists met on the way,
    /// shallowest first.
    ///
    /// At each depth the current node's list is collected, then the walk prefers the literal
    /// child over the fuzzy child. The walk stops when neither exists. On the final segment the
    /// fuzzy child of the reached node is also consulted, so `/user/*any` is a candidate for
    /// `/user`.
    pub(crate) fn candidates<'a>(&'a self, segments: &[&str]) -> Vec<&'a [Arc<CompiledRoute>]> {
        let mut lists: Vec<&'a [Arc<CompiledRoute>]> = Vec::with_capacity(segments.len() + 1);
        let last = segments.len().saturating_sub(1);
        let mut node = self;

        for (depth, segment) in segments.iter().enumerate() {
            if !node.routes.is_empty() {
                lists.push(&node.routes);
            }

            if let Some(child) = node.children.get(*segment) {
                node = child;
                if depth == last && !node.routes.is_empty() {
                    lists.push(&node.routes);
                    break;
                }
            } else if let Some(fuzzy) = node.fuzzy.as_deref() {
                node = fuzzy;
            } else {
                break;
            }

            if depth == last {
                if let Some(fuzzy) = node.fuzzy.as_deref() {
                    node = fuzzy;
                }
                if !node.routes.is_empty() {
                    lists.push(&node.routes);
                }
            }
        }

        lists
    }

    /// Number of route slots anchored in this subtree (a route counts once per list).
    #[cfg(test)]
    pub(crate) fn anchored(&self) -> usize {
        self.routes.len()
            + self.children.values().map(RouteNode::anchored).sum::<usize>()
            + self.fuzzy.as_deref().map_or(0, RouteNode::anchored)
    }
}

/// Split a request path the way the tree is keyed: the root (or an empty path) is the single
/// segment `/`, anything else is split on `/` after the leading slash.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() || path == "/" {
        return vec!["/"];
    }
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}
