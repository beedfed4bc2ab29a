// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Interface to the task-outcome finisher.

use riptide_common::id::TaskID;
use riptide_common::status::RiptideError;
use riptide_rpc::{ErrorType, PushTaskReply, TaskSpec, WorkerAddress};

/// Retry/complete/fail bookkeeping for submitted tasks.
///
/// The finisher owns the authoritative record of every pending task; the
/// submitter reports outcomes to it and consults it for task specs during
/// steals.
pub trait TaskFinisher: Send + Sync {
    /// Record a successful execution. `worker_addr` is the executing
    /// worker, or the created actor's address for actor-creation tasks.
    fn complete_pending_task(
        &self,
        task_id: TaskID,
        reply: &PushTaskReply,
        worker_addr: Option<&WorkerAddress>,
    );

    /// Fail a task, or schedule a retry if its spec allows one.
    fn fail_or_retry_pending_task(
        &self,
        task_id: TaskID,
        error_type: ErrorType,
        status: Option<&RiptideError>,
    );

    /// Fail a task unconditionally.
    fn fail_pending_task(
        &self,
        task_id: TaskID,
        error_type: ErrorType,
        status: Option<&RiptideError>,
    );

    /// Record that cancellation was requested. Returns false if the task
    /// already finished or was already marked, in which case cancellation
    /// is a no-op.
    fn mark_task_canceled(&self, task_id: TaskID) -> bool;

    /// Attempt to schedule a retry for a task that raised a retryable
    /// application error. Returns true if a retry was scheduled.
    fn retry_task_if_possible(&self, task_id: TaskID) -> bool;

    /// Look up the spec of a pending task, if the finisher still tracks it.
    fn get_task_spec(&self, task_id: TaskID) -> Option<TaskSpec>;
}
