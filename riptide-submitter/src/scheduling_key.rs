// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Scheduling keys and the per-key / per-worker bookkeeping entries.
//!
//! Two tasks with the same scheduling key are interchangeable on the same
//! leased worker: they request the same resources, depend on the same
//! plasma objects, create the same actor (or none), and run in the same
//! runtime environment.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use riptide_common::id::{ActorID, ObjectID, TaskID};
use riptide_rpc::{
    Address, LeaseClient, ResourceMapEntry, SchedulingClass, TaskSpec, WorkerAddress,
};

/// Equivalence class under which tasks share queues, leases, and steals.
///
/// Equality and hash are structural; the dependency set is canonicalized
/// (sorted, deduplicated) so that incidental argument order does not split
/// the class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchedulingKey {
    scheduling_class: SchedulingClass,
    dependencies: Vec<ObjectID>,
    actor_creation_id: ActorID,
    runtime_env_hash: i32,
}

impl SchedulingKey {
    pub fn from_task_spec(spec: &TaskSpec) -> Self {
        let mut dependencies = spec.dependencies.clone();
        dependencies.sort_unstable();
        dependencies.dedup();
        Self {
            scheduling_class: spec.scheduling_class,
            dependencies,
            actor_creation_id: if spec.is_actor_creation_task() {
                spec.actor_creation_id
            } else {
                ActorID::nil()
            },
            runtime_env_hash: spec.runtime_env_hash,
        }
    }

    pub fn scheduling_class(&self) -> SchedulingClass {
        self.scheduling_class
    }
}

/// Bookkeeping for one leased worker.
pub struct LeaseEntry {
    /// Handle used to return this worker to its raylet.
    pub lease_client: Arc<dyn LeaseClient>,
    /// Wall-clock ms deadline after which the worker must be returned.
    pub lease_expiration_time: u64,
    /// Resources granted with the lease.
    pub assigned_resources: Vec<ResourceMapEntry>,
    /// The key this worker serves. A worker serves exactly one key.
    pub scheduling_key: SchedulingKey,
    /// Tasks pushed to this worker that have not yet replied.
    pub tasks_in_flight: u32,
    /// True while a steal RPC is outstanding with this worker as thief.
    is_stealing: bool,
}

impl LeaseEntry {
    pub fn new(
        lease_client: Arc<dyn LeaseClient>,
        lease_expiration_time: u64,
        assigned_resources: Vec<ResourceMapEntry>,
        scheduling_key: SchedulingKey,
    ) -> Self {
        Self {
            lease_client,
            lease_expiration_time,
            assigned_resources,
            scheduling_key,
            tasks_in_flight: 0,
            is_stealing: false,
        }
    }

    /// Whether another task can be pushed without exceeding the pipeline cap.
    pub fn pipeline_full(&self, max_tasks_in_flight_per_worker: u32) -> bool {
        self.tasks_in_flight >= max_tasks_in_flight_per_worker
    }

    pub fn is_stealing(&self) -> bool {
        self.is_stealing
    }

    /// Mark this worker as an active thief. The worker must be drained.
    pub fn set_stealing(&mut self) {
        debug_assert_eq!(self.tasks_in_flight, 0);
        debug_assert!(!self.is_stealing);
        self.is_stealing = true;
    }

    pub fn set_done_stealing(&mut self) {
        self.is_stealing = false;
    }
}

/// Bookkeeping for one scheduling key.
#[derive(Default)]
pub struct SchedulingKeyEntry {
    /// FIFO on submit; stolen tasks are prepended.
    pub task_queue: VecDeque<TaskSpec>,
    /// Representative spec used to shape lease requests and backlog reports.
    pub resource_spec: TaskSpec,
    /// Addresses of workers currently leased for this key.
    pub active_workers: HashSet<WorkerAddress>,
    /// Outstanding lease requests: placeholder task id -> target raylet.
    pub pending_lease_requests: HashMap<TaskID, Address>,
    /// Sum of `tasks_in_flight` over the active workers.
    pub total_tasks_in_flight: u32,
    /// Snapshot used to suppress redundant backlog reports.
    pub last_reported_backlog_size: i64,
}

impl SchedulingKeyEntry {
    /// The entry may be removed once nothing references the key anymore.
    pub fn can_delete(&self) -> bool {
        self.task_queue.is_empty()
            && self.active_workers.is_empty()
            && self.pending_lease_requests.is_empty()
            && self.total_tasks_in_flight == 0
    }

    /// By pigeonhole, more tasks in flight than workers means at least one
    /// worker holds two or more and can surrender some to a thief.
    pub fn stealable_tasks(&self) -> bool {
        self.total_tasks_in_flight as usize > self.active_workers.len()
    }

    /// Whether every active worker's pipeline is at capacity.
    pub fn all_pipelines_full(&self, max_tasks_in_flight_per_worker: u32) -> bool {
        self.total_tasks_in_flight as usize
            >= self.active_workers.len() * max_tasks_in_flight_per_worker as usize
    }

    /// Queued tasks not yet covered by an outstanding lease request.
    pub fn backlog_size(&self) -> i64 {
        if self.task_queue.len() < self.pending_lease_requests.len() {
            return 0;
        }
        (self.task_queue.len() - self.pending_lease_requests.len()) as i64
    }
}
