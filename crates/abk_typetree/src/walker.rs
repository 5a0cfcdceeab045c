//! Blind substring substitution over a whole type tree.
//!
//! The walker has no notion of field semantics: every string leaf and every
//! mapping key is a candidate, whatever role it plays in the asset. Structural
//! fields that must not be patched textually are the caller's responsibility
//! and are regenerated after the walk.

use crate::Node;
use std::collections::BTreeSet;

/// A substitution would merge two distinct entries into one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Collision {
    #[error("mapping key '{0}' would be produced twice")]
    MapKey(String),
    #[error("set member {0:?} would be produced twice")]
    SetMember(Node),
}

impl Node {
    /// Replace every occurrence of `old` with `new` in all string leaves and
    /// mapping keys below this node, in place.
    ///
    /// Returns the number of strings (leaves or keys) that were rewritten.
    /// Integer and byte scalars are never touched. An empty `old` is a no-op.
    ///
    /// Fails without modifying the tree when two mapping keys or two set
    /// members would become equal, see [`Node::find_collision`].
    ///
    /// Applying the same substitution twice is a no-op the second time as long
    /// as `new` does not itself contain `old`.
    pub fn substitute(&mut self, old: &str, new: &str) -> Result<usize, Collision> {
        if old.is_empty() {
            return Ok(0);
        }
        if let Some(collision) = self.find_collision(old, new) {
            return Err(collision);
        }
        Ok(self.rewrite(old, new))
    }

    /// The first entry that substituting `old` with `new` would merge with a
    /// sibling, if any. Read-only.
    pub fn find_collision(&self, old: &str, new: &str) -> Option<Collision> {
        if old.is_empty() {
            return None;
        }

        let mut stack: Vec<&Node> = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Node::Map(map) => {
                    if map.keys().any(|k| k.contains(old)) {
                        let mut seen = BTreeSet::new();
                        for key in map.keys() {
                            let key = key.replace(old, new);
                            if !seen.insert(key.clone()) {
                                return Some(Collision::MapKey(key));
                            }
                        }
                    }
                    stack.extend(map.values());
                }
                Node::Seq(items) => stack.extend(items.iter()),
                Node::Tuple(items) => stack.extend(items.iter()),
                Node::Set(items) => {
                    if items.iter().any(|m| m.contains_str(old)) {
                        let mut seen = BTreeSet::new();
                        for member in items {
                            let mut member = member.clone();
                            member.rewrite(old, new);
                            if seen.contains(&member) {
                                return Some(Collision::SetMember(member));
                            }
                            seen.insert(member);
                        }
                    }
                    stack.extend(items.iter());
                }
                Node::Str(_) | Node::Int(_) | Node::Bytes(_) => {}
            }
        }
        None
    }

    /// Unchecked substitution. On a collision the later entry wins.
    fn rewrite(&mut self, old: &str, new: &str) -> usize {
        let mut rewritten = 0;
        // Explicit work stack: template trees can be deeply nested and must not
        // blow the thread stack of a worker.
        let mut stack: Vec<&mut Node> = vec![self];

        while let Some(node) = stack.pop() {
            match node {
                Node::Str(s) => {
                    if s.contains(old) {
                        *s = s.replace(old, new);
                        rewritten += 1;
                    }
                }
                Node::Map(map) => {
                    // Keys are immutable inside the map, so rebuild it when any key matches.
                    if map.keys().any(|k| k.contains(old)) {
                        let entries = std::mem::take(map);
                        for (key, value) in entries {
                            let key = if key.contains(old) {
                                rewritten += 1;
                                key.replace(old, new)
                            } else {
                                key
                            };
                            map.insert(key, value);
                        }
                    }
                    stack.extend(map.values_mut());
                }
                Node::Seq(items) => stack.extend(items.iter_mut()),
                Node::Tuple(items) => stack.extend(items.iter_mut()),
                Node::Set(items) => {
                    // Membership (and ordering) changes under substitution.
                    let members = std::mem::take(items);
                    for mut member in members {
                        rewritten += member.rewrite(old, new);
                        items.insert(member);
                    }
                }
                Node::Int(_) | Node::Bytes(_) => {}
            }
        }

        rewritten
    }
}

/// By-value form of [`Node::substitute`].
pub fn substitute(mut node: Node, old: &str, new: &str) -> Result<Node, Collision> {
    node.substitute(old, new)?;
    Ok(node)
}
