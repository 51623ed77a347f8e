//! The lexical environment (C3): an immutable chain of frames.
//!
//! Frames are reference-counted and only ever link to older frames, so
//! the chain is acyclic by construction. A closure keeps a strong reference
//! to the frame active at its definition site; nothing ever rebinds a
//! name an existing closure has already captured, since `bind` always
//! allocates a new child frame rather than mutating its parent.

use std::sync::Arc;

use crate::value::Value;

struct EnvNode {
    bindings: Vec<(String, Value)>,
    parent: Option<Env>,
}

/// A cheap-to-clone handle to one frame of the environment chain.
#[derive(Clone)]
pub struct Env(Arc<EnvNode>);

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("bindings", &self.0.bindings.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

impl Env {
    /// An empty root frame with no parent.
    pub fn empty() -> Self {
        Env(Arc::new(EnvNode {
            bindings: Vec::new(),
            parent: None,
        }))
    }

    /// A new child frame extending `self` with one binding.
    pub fn bind(&self, name: impl Into<String>, value: Value) -> Self {
        Env(Arc::new(EnvNode {
            bindings: vec![(name.into(), value)],
            parent: Some(self.clone()),
        }))
    }

    /// A new child frame extending `self` with several bindings at once.
    pub fn bind_many(&self, bindings: Vec<(String, Value)>) -> Self {
        if bindings.is_empty() {
            return self.clone();
        }
        Env(Arc::new(EnvNode {
            bindings,
            parent: Some(self.clone()),
        }))
    }

    /// Walks the chain from newest to oldest frame looking for `name`.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut cur = self;
        loop {
            if let Some((_, v)) = cur.0.bindings.iter().rev().find(|(n, _)| n == name) {
                return Some(v.clone());
            }
            cur = cur.0.parent.as_ref()?;
        }
    }
}
