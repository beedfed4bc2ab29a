// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Message types for the lease, push, steal, cancel, and backlog RPCs.

use std::collections::HashMap;

use riptide_common::id::{ActorID, JobID, NodeID, ObjectID, TaskID, WorkerID};

/// Resource-shape equivalence class of a task.
///
/// Tasks with the same scheduling class request the same resources and are
/// interchangeable from the cluster scheduler's point of view.
pub type SchedulingClass = u64;

/// Network address of a raylet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub node_id: NodeID,
    pub ip_address: String,
    pub port: i32,
}

/// Network address of a leased worker, including its identity.
///
/// Used as a map key throughout the submitter; equality covers all fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WorkerAddress {
    pub node_id: NodeID,
    pub ip_address: String,
    pub port: i32,
    pub worker_id: WorkerID,
}

/// Specification of a submitted task.
///
/// After dependency resolution the `dependencies` list contains only
/// plasma object ids.
#[derive(Debug, Clone, Default)]
pub struct TaskSpec {
    pub task_id: TaskID,
    pub job_id: JobID,
    pub name: String,
    pub scheduling_class: SchedulingClass,
    pub dependencies: Vec<ObjectID>,
    /// Nil unless this is an actor-creation task.
    pub actor_creation_id: ActorID,
    pub is_actor_task: bool,
    pub runtime_env_hash: i32,
    pub required_resources: HashMap<String, f64>,
    /// Whether application-level errors in this task may be retried.
    pub retry_exceptions: bool,
}

impl TaskSpec {
    pub fn is_actor_creation_task(&self) -> bool {
        !self.actor_creation_id.is_nil()
    }
}

/// Error kinds the submitter raises to the task finisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    DependencyResolutionFailed,
    ActorCreationFailed,
    TaskCancelled,
    RuntimeEnvSetupFailed,
    ActorPlacementGroupRemoved,
    TaskPlacementGroupRemoved,
    LocalRayletDied,
    ActorDied,
    WorkerDied,
}

/// Why a lease request came back `canceled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulingFailureType {
    #[default]
    NotFailed,
    RuntimeEnvSetupFailed,
    PlacementGroupRemoved,
    /// Any other cancellation reason; the submitter simply retries.
    Other,
}

/// One granted resource on a leased worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMapEntry {
    pub name: String,
    pub quantity: f64,
}

/// Reply to `RequestWorkerLease`.
///
/// Exactly one of the outcomes is populated: `canceled`, `rejected`, a
/// granted `worker_address`, or a `retry_at_raylet_address` redirect.
#[derive(Debug, Clone, Default)]
pub struct RequestWorkerLeaseReply {
    pub canceled: bool,
    pub failure_type: SchedulingFailureType,
    pub rejected: bool,
    pub worker_address: Option<WorkerAddress>,
    pub resource_mapping: Vec<ResourceMapEntry>,
    pub retry_at_raylet_address: Option<Address>,
}

/// Reply to `CancelWorkerLease`.
#[derive(Debug, Clone, Default)]
pub struct CancelWorkerLeaseReply {
    /// False if the raylet did not have the lease request queued.
    pub success: bool,
}

/// Per-scheduling-class backlog snapshot sent to the local raylet.
#[derive(Debug, Clone, Default)]
pub struct WorkerBacklogReport {
    pub resource_spec: TaskSpec,
    pub backlog_size: i64,
}

/// Request to execute a task on a leased worker.
#[derive(Debug, Clone, Default)]
pub struct PushTaskRequest {
    pub intended_worker_id: WorkerID,
    pub task_spec: TaskSpec,
    pub resource_mapping: Vec<ResourceMapEntry>,
}

/// Reply to `PushNormalTask`.
#[derive(Debug, Clone, Default)]
pub struct PushTaskReply {
    /// The worker is draining and must not be returned to its raylet.
    pub worker_exiting: bool,
    /// The task was stolen by a thief before this worker executed it.
    pub task_stolen: bool,
    /// The task ran and raised an application-level error.
    pub is_application_error: bool,
    /// References borrowed by the executed task.
    pub borrowed_refs: Vec<ObjectID>,
}

/// Request asking a victim worker to surrender queued tasks to a thief.
#[derive(Debug, Clone, Default)]
pub struct StealTasksRequest {
    pub thief_addr: WorkerAddress,
}

/// Reply listing the task ids the victim surrendered.
#[derive(Debug, Clone, Default)]
pub struct StealTasksReply {
    pub stolen_task_ids: Vec<TaskID>,
}

/// Request to cancel a task on the worker currently executing it.
#[derive(Debug, Clone, Default)]
pub struct CancelTaskRequest {
    pub intended_task_id: TaskID,
    pub force_kill: bool,
    pub recursive: bool,
}

/// Reply to `CancelTask`.
#[derive(Debug, Clone, Default)]
pub struct CancelTaskReply {
    /// False if the cancellation attempt has not landed yet and should be
    /// retried.
    pub attempt_succeeded: bool,
}

/// Fire-and-forget cancellation relayed through the worker that owns the
/// object.
#[derive(Debug, Clone, Default)]
pub struct RemoteCancelTaskRequest {
    pub remote_object_id: ObjectID,
    pub force_kill: bool,
    pub recursive: bool,
}

/// Reply to `RemoteCancelTask`.
#[derive(Debug, Clone, Default)]
pub struct RemoteCancelTaskReply {}

/// Reply from the actor creation subsystem.
#[derive(Debug, Clone, Default)]
pub struct CreateActorReply {
    pub actor_address: Option<WorkerAddress>,
    pub borrowed_refs: Vec<ObjectID>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_spec_actor_creation() {
        let mut spec = TaskSpec::default();
        assert!(!spec.is_actor_creation_task());
        spec.actor_creation_id = ActorID::from_random();
        assert!(spec.is_actor_creation_task());
    }

    #[test]
    fn test_worker_address_as_map_key() {
        use std::collections::HashSet;
        let addr = WorkerAddress {
            node_id: NodeID::from_random(),
            ip_address: "10.0.0.1".to_string(),
            port: 5000,
            worker_id: WorkerID::from_random(),
        };
        let mut set = HashSet::new();
        set.insert(addr.clone());
        assert!(set.contains(&addr));
    }

    #[test]
    fn test_lease_reply_default_is_empty_outcome() {
        let reply = RequestWorkerLeaseReply::default();
        assert!(!reply.canceled);
        assert!(!reply.rejected);
        assert!(reply.worker_address.is_none());
        assert!(reply.retry_at_raylet_address.is_none());
        assert_eq!(reply.failure_type, SchedulingFailureType::NotFailed);
    }
}
