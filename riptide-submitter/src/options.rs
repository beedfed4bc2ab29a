// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Submitter configuration options.

use riptide_common::id::{JobID, NodeID};
use riptide_rpc::WorkerAddress;

/// The role of the submitting process.
///
/// Governs behavior when the local raylet dies: a worker terminates
/// immediately so its caller can retry elsewhere, a driver fails its
/// queued tasks and keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerType {
    Worker,
    Driver,
}

/// Options for constructing a `DirectTaskSubmitter`.
#[derive(Debug, Clone)]
pub struct SubmitterOptions {
    pub worker_type: WorkerType,
    pub job_id: JobID,
    /// Raylet on the same node as this process.
    pub local_raylet_id: NodeID,
    /// Address of this submitting process, used in backlog reports.
    pub rpc_address: WorkerAddress,
    /// Pipeline depth per leased worker. 1 disables work stealing.
    pub max_tasks_in_flight_per_worker: u32,
    /// Cap on concurrently outstanding lease requests per scheduling key.
    pub max_pending_lease_requests_per_scheduling_category: usize,
    /// How long a granted lease may be held before the worker must be
    /// returned, in milliseconds.
    pub lease_timeout_ms: u64,
    /// Cadence for retrying soft-failed task cancellations. `None`
    /// disables retries.
    pub cancellation_retry_ms: Option<u64>,
}

impl Default for SubmitterOptions {
    fn default() -> Self {
        Self {
            worker_type: WorkerType::Driver,
            job_id: JobID::nil(),
            local_raylet_id: NodeID::nil(),
            rpc_address: WorkerAddress::default(),
            max_tasks_in_flight_per_worker: 1,
            max_pending_lease_requests_per_scheduling_category: 10,
            lease_timeout_ms: 60_000,
            cancellation_retry_ms: Some(2_000),
        }
    }
}
