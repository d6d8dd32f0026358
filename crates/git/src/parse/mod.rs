//! Parsers for git's line-oriented output grammars.
//!
//! Each parser consumes one immutable, fully-buffered string through a
//! [`Cursor`](crate::cursor::Cursor) and is discarded afterwards. The
//! hash-keyed caches are explicit values created per top-level parse and
//! passed in by the caller, so two parses can never share identity.

pub mod blame;
pub mod diff;
pub mod log;
pub mod refs;

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use thiserror::Error;

use crate::models::{BlameCommit, Revision};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Hash-keyed revision cache scoped to one top-level parse. Interning the
/// same hash twice yields the same `Arc`, so a commit referenced by several
/// records resolves to one object.
#[derive(Debug, Default)]
pub struct RevisionCache {
    map: HashMap<String, Arc<Revision>>,
}

impl RevisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &str) -> Option<Arc<Revision>> {
        self.map.get(hash).cloned()
    }

    pub fn intern(&mut self, revision: Revision) -> Arc<Revision> {
        match self.map.entry(revision.hash.clone()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => slot.insert(Arc::new(revision)).clone(),
        }
    }

    /// Attach parents recovered by the raw-format pass to an already-cached
    /// revision. Only possible while the cache holds the sole reference;
    /// callers therefore run this pass before handing records out.
    pub fn attach_parents(&mut self, hash: &str, parents: Vec<String>) -> bool {
        let Some(slot) = self.map.get_mut(hash) else {
            return false;
        };
        match Arc::get_mut(slot) {
            Some(revision) => {
                revision.parent_hashes = parents;
                true
            }
            None => {
                tracing::debug!(hash, "revision already shared, parent graph left as parsed");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Hash-keyed blame-commit cache scoped to one blame parse.
#[derive(Debug, Default)]
pub struct BlameCache {
    map: HashMap<String, Arc<BlameCommit>>,
}

impl BlameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &str) -> Option<Arc<BlameCommit>> {
        self.map.get(hash).cloned()
    }

    pub fn insert(&mut self, commit: BlameCommit) -> Arc<BlameCommit> {
        match self.map.entry(commit.hash.clone()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => slot.insert(Arc::new(commit)).clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub(crate) fn is_hex_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
