//! Ordered Table
//!
//! An in-memory ordered mapping from byte-string keys to byte-string
//! values, implemented as an 8-level probabilistic skip list. Supports
//! point lookup, insertion/overwrite, and in-order traversal with reverse
//! links at the base level.
//!
//! ## Design overview
//!
//! Following the arena pattern: every node (including the per-level
//! sentinels) lives in a single `Vec<Node>` owned by the [`OrderedTable`]
//! and is referenced by [`NodeHandle`], a plain index. This sidesteps the
//! ownership cycles a pointer-based doubly-linked, multi-level structure
//! would otherwise require in safe Rust (see the crate's design notes) —
//! `prev`/`next`/`down` become index fields instead of references.
//!
//! A key's **tower** is a set of distinct node objects, one per level the
//! key was sampled to occupy, linked top-to-bottom via `down`. Level 0 is
//! the base list: every inserted key has exactly one node there, doubly
//! linked for forward and backward traversal.
//!
//! # Guarantees
//!
//! - At every level, real nodes are linked in strictly increasing key
//!   order between the level's head and tail sentinels.
//! - A key present at level `l` is also present at every level below it.
//! - Updating an existing key replaces its value on every node in its
//!   tower; no partial update is observable by a caller.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

/// Number of indexed strata: level 0 (base) through level 7.
pub const LEVELS: usize = 8;

/// Errors returned by Ordered Table operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MemtableError {
    /// Keys are opaque non-empty byte strings; an empty key was supplied.
    #[error("ordered table keys must be non-empty")]
    EmptyKey,
}

/// An opaque handle to a node in an [`OrderedTable`]'s arena.
///
/// Two handles compare equal iff they reference the same node. Handles
/// from one table are meaningless against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(usize);

#[derive(Debug, Clone)]
enum NodeKey {
    /// The level's head sentinel; compares less than every real key.
    NegInf,
    /// The level's tail sentinel; compares greater than every real key.
    PosInf,
    /// A real key. Shared via `Rc` across every node in its tower so a
    /// multi-level key is stored once, not once per level.
    Real(Rc<[u8]>),
}

impl NodeKey {
    fn compare_to(&self, target: &[u8]) -> Ordering {
        match self {
            NodeKey::NegInf => Ordering::Less,
            NodeKey::PosInf => Ordering::Greater,
            NodeKey::Real(k) => k.as_ref().cmp(target),
        }
    }
}

#[derive(Debug)]
struct Node {
    key: NodeKey,
    /// Shared across every node in the key's tower; updating a value
    /// replaces this handle on each tower node rather than copying bytes.
    value: Rc<[u8]>,
    next: Option<usize>,
    prev: Option<usize>,
    down: Option<usize>,
}

/// An 8-level probabilistic skip list mapping byte-string keys to
/// byte-string values.
///
/// Created empty; mutated only through [`OrderedTable::set`]; iterated in
/// key order via [`OrderedTable::first`]/[`OrderedTable::end`] and the
/// base-level [`OrderedTable::next`]/[`OrderedTable::prev`] walk. Never
/// serialized back in place — see [`crate::sstable`] for draining a table
/// to a file.
#[derive(Debug)]
pub struct OrderedTable {
    arena: Vec<Node>,
    head: [usize; LEVELS],
    tail: [usize; LEVELS],
}

impl Default for OrderedTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderedTable {
    /// Creates an empty table with freshly allocated sentinels at every
    /// level.
    pub fn new() -> Self {
        let mut arena = Vec::new();
        let mut head = [0usize; LEVELS];
        let mut tail = [0usize; LEVELS];

        for level in 0..LEVELS {
            let down_head = if level > 0 { Some(head[level - 1]) } else { None };
            let down_tail = if level > 0 { Some(tail[level - 1]) } else { None };

            let h = arena.len();
            arena.push(Node {
                key: NodeKey::NegInf,
                value: Rc::from(&b""[..]),
                next: None,
                prev: None,
                down: down_head,
            });
            let t = arena.len();
            arena.push(Node {
                key: NodeKey::PosInf,
                value: Rc::from(&b""[..]),
                next: None,
                prev: Some(h),
                down: down_tail,
            });
            arena[h].next = Some(t);

            head[level] = h;
            tail[level] = t;
        }

        Self { arena, head, tail }
    }

    /// The base-level head sentinel, the starting point for forward
    /// iteration (`first().next()` is the smallest real key, if any).
    pub fn first(&self) -> NodeHandle {
        NodeHandle(self.head[0])
    }

    /// The base-level tail sentinel, the end-of-iteration marker.
    pub fn end(&self) -> NodeHandle {
        NodeHandle(self.tail[0])
    }

    /// This node's key, or an empty slice for a sentinel.
    pub fn key(&self, node: NodeHandle) -> &[u8] {
        match &self.arena[node.0].key {
            NodeKey::Real(k) => k.as_ref(),
            _ => &[],
        }
    }

    /// This node's value, or an empty slice for a sentinel.
    pub fn value(&self, node: NodeHandle) -> &[u8] {
        self.arena[node.0].value.as_ref()
    }

    /// The next node at the base level (towards `end()`).
    pub fn next(&self, node: NodeHandle) -> NodeHandle {
        NodeHandle(self.arena[node.0].next.unwrap_or(self.tail[0]))
    }

    /// The previous node at the base level (towards `first()`).
    pub fn prev(&self, node: NodeHandle) -> NodeHandle {
        NodeHandle(self.arena[node.0].prev.unwrap_or(self.head[0]))
    }

    /// Finds, at every level, the node with the greatest key `<= key` (the
    /// level's head sentinel if none), plus whether `key` was matched
    /// exactly.
    ///
    /// When matched, entries for the levels at or below the key's tower
    /// top hold the matched node; entries above it hold the ordinary
    /// predecessor at that level (there is no node for `key` to return
    /// there). When not matched, every entry is the predecessor at that
    /// level.
    pub fn find(&self, key: &[u8]) -> Result<([NodeHandle; LEVELS], bool), MemtableError> {
        if key.is_empty() {
            return Err(MemtableError::EmptyKey);
        }

        let mut level = LEVELS - 1;
        let mut p = self.head[level];
        let mut result = [0usize; LEVELS];

        while let Some(next_idx) = self.arena[p].next {
            let cmp = if next_idx == self.tail[level] {
                Ordering::Greater
            } else {
                self.arena[next_idx].key.compare_to(key)
            };

            match cmp {
                Ordering::Equal => {
                    result[level] = next_idx;
                    p = next_idx;
                    while level > 0 {
                        level -= 1;
                        let down = self.arena[p]
                            .down
                            .expect("tower node is missing its down link");
                        result[level] = down;
                        p = down;
                    }
                    return Ok((result.map(NodeHandle), true));
                }
                Ordering::Less => {
                    p = next_idx;
                }
                Ordering::Greater => {
                    result[level] = p;
                    match self.arena[p].down {
                        Some(down) => {
                            level -= 1;
                            p = down;
                        }
                        None => return Ok((result.map(NodeHandle), false)),
                    }
                }
            }
        }

        Ok((result.map(NodeHandle), false))
    }

    /// Inserts `key` with `value`, or overwrites `value` on every node in
    /// an existing key's tower.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), MemtableError> {
        let (preds, found) = self.find(key)?;

        if found {
            let new_value: Rc<[u8]> = Rc::from(value);
            for handle in preds {
                let idx = handle.0;
                match &self.arena[idx].key {
                    NodeKey::Real(k) if k.as_ref() == key => {
                        self.arena[idx].value = Rc::clone(&new_value);
                    }
                    _ => break,
                }
            }
            trace!("ordered table key overwritten");
            return Ok(());
        }

        let level_count = random_level();
        let key_rc: Rc<[u8]> = Rc::from(key);
        let value_rc: Rc<[u8]> = Rc::from(value);
        let mut down_idx: Option<usize> = None;

        for level_preds in preds.iter().take(level_count) {
            let pred = level_preds.0;
            let succ = self.arena[pred].next.expect("predecessor has no next link");

            let node_idx = self.arena.len();
            self.arena.push(Node {
                key: NodeKey::Real(Rc::clone(&key_rc)),
                value: Rc::clone(&value_rc),
                next: Some(succ),
                prev: Some(pred),
                down: down_idx,
            });

            self.arena[succ].prev = Some(node_idx);
            self.arena[pred].next = Some(node_idx);
            down_idx = Some(node_idx);
        }

        trace!(level_count, "ordered table key inserted");
        Ok(())
    }
}

/// Samples a tower height via geometric-½ coin flips, capped at
/// [`LEVELS`].
fn random_level() -> usize {
    let mut level = 1;
    while level < LEVELS && rand::random::<f32>() < 0.5 {
        level += 1;
    }
    level
}
