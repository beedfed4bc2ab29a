// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async trait for the per-worker RPC client.

use tonic::Status;

use crate::messages::{
    CancelTaskReply, CancelTaskRequest, PushTaskReply, PushTaskRequest, RemoteCancelTaskReply,
    RemoteCancelTaskRequest, StealTasksReply, StealTasksRequest,
};

/// Client for a single leased worker.
#[async_trait::async_trait]
pub trait WorkerClient: Send + Sync {
    /// Push a task into the worker's pipeline.
    async fn push_normal_task(&self, req: PushTaskRequest) -> Result<PushTaskReply, Status>;

    /// Ask this worker (the victim) to surrender queued tasks to the thief
    /// named in the request.
    async fn steal_tasks(&self, req: StealTasksRequest) -> Result<StealTasksReply, Status>;

    /// Cancel a task this worker is executing.
    async fn cancel_task(&self, req: CancelTaskRequest) -> Result<CancelTaskReply, Status>;

    /// Relay a cancellation for a task owned by a different submitter.
    async fn remote_cancel_task(
        &self,
        req: RemoteCancelTaskRequest,
    ) -> Result<RemoteCancelTaskReply, Status>;
}
