// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async trait for the per-raylet lease client.

use riptide_common::id::{TaskID, WorkerID};
use tonic::Status;

use crate::messages::{
    CancelWorkerLeaseReply, RequestWorkerLeaseReply, TaskSpec, WorkerBacklogReport,
};

/// Client for the worker-lease operations of a single raylet.
///
/// One instance exists per raylet the submitter talks to; instances are
/// shared between the client pool and the lease entries holding them.
#[async_trait::async_trait]
pub trait LeaseClient: Send + Sync {
    /// Request a short-lived worker lease shaped by `resource_spec`.
    ///
    /// `grant_or_reject` is set on spillback requests: the target raylet
    /// must either grant locally or reject, never redirect again.
    async fn request_worker_lease(
        &self,
        resource_spec: TaskSpec,
        grant_or_reject: bool,
        backlog_size: i64,
    ) -> Result<RequestWorkerLeaseReply, Status>;

    /// Cancel a pending lease request identified by its placeholder task id.
    async fn cancel_worker_lease(
        &self,
        lease_task_id: TaskID,
    ) -> Result<CancelWorkerLeaseReply, Status>;

    /// Return a leased worker to its raylet.
    async fn return_worker(
        &self,
        worker_port: i32,
        worker_id: WorkerID,
        was_error: bool,
    ) -> Result<(), Status>;

    /// Report per-scheduling-class backlog sizes to the raylet.
    async fn report_worker_backlog(
        &self,
        worker_id: WorkerID,
        reports: Vec<WorkerBacklogReport>,
    ) -> Result<(), Status>;
}
