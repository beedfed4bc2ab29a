// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Dependency resolution for task arguments.
//!
//! Before a task can be queued for scheduling, every argument object must
//! be available: small objects get inlined into the spec and plasma
//! objects stay as dependencies. After resolution the spec's dependency
//! list contains only plasma object ids.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use riptide_common::id::ObjectID;
use riptide_common::status::{RiptideError, RiptideResult};
use riptide_rpc::TaskSpec;

/// Resolves a task's arguments asynchronously.
#[async_trait::async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Wait until every dependency of `task_spec` is available, then
    /// return the spec with its dependency list rewritten to contain only
    /// plasma object ids.
    async fn resolve(&self, task_spec: TaskSpec) -> RiptideResult<TaskSpec>;
}

#[derive(Default)]
struct ResolverState {
    /// Object id -> whether the object lives in plasma (false = inlined).
    available: HashMap<ObjectID, bool>,
    /// Waiters per missing object.
    waiters: HashMap<ObjectID, Vec<oneshot::Sender<()>>>,
}

/// In-process resolver tracking object availability signals.
///
/// The embedding process calls [`object_available`] as objects land in the
/// local store; pending `resolve` calls wake once their whole dependency
/// set is covered.
///
/// [`object_available`]: LocalDependencyResolver::object_available
pub struct LocalDependencyResolver {
    state: Mutex<ResolverState>,
}

impl LocalDependencyResolver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ResolverState::default()),
        }
    }

    /// Signal that an object is available, waking all waiters. `in_plasma`
    /// objects remain task dependencies; inlined objects are dropped from
    /// resolved specs.
    pub fn object_available(&self, object_id: ObjectID, in_plasma: bool) {
        let mut state = self.state.lock();
        state.available.insert(object_id, in_plasma);
        if let Some(waiters) = state.waiters.remove(&object_id) {
            for tx in waiters {
                let _ = tx.send(());
            }
        }
    }

    /// Fail all waiters for an object (e.g. when it is lost). Returns the
    /// number of waiters cancelled.
    pub fn cancel_object(&self, object_id: &ObjectID) -> usize {
        let mut state = self.state.lock();
        state.waiters.remove(object_id).map_or(0, |w| w.len())
    }

    /// Number of objects with registered waiters.
    pub fn num_pending(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

impl Default for LocalDependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DependencyResolver for LocalDependencyResolver {
    async fn resolve(&self, mut task_spec: TaskSpec) -> RiptideResult<TaskSpec> {
        let receivers: Vec<oneshot::Receiver<()>> = {
            let mut state = self.state.lock();
            let pending: Vec<_> = task_spec
                .dependencies
                .iter()
                .filter(|oid| !state.available.contains_key(oid))
                .copied()
                .collect();
            pending
                .into_iter()
                .map(|oid| {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.entry(oid).or_default().push(tx);
                    rx
                })
                .collect()
        };

        for rx in receivers {
            rx.await.map_err(|_| {
                RiptideError::not_found("dependency was lost before it became available")
            })?;
        }

        let state = self.state.lock();
        task_spec
            .dependencies
            .retain(|oid| state.available.get(oid).copied().unwrap_or(false));
        Ok(task_spec)
    }
}

/// Resolver for specs whose dependencies are already plasma-resident;
/// completes immediately without rewriting.
pub struct NoopDependencyResolver;

#[async_trait::async_trait]
impl DependencyResolver for NoopDependencyResolver {
    async fn resolve(&self, task_spec: TaskSpec) -> RiptideResult<TaskSpec> {
        Ok(task_spec)
    }
}
