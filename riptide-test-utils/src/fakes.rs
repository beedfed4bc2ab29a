// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Fake RPC clients and collaborators with test-controllable replies.
//!
//! Lease and push requests park on a oneshot responder so tests can
//! observe them mid-flight and reply in any order; recorded calls are
//! available for inspection afterwards.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tonic::Status;

use riptide_common::id::{TaskID, WorkerID};
use riptide_common::status::{RiptideError, RiptideResult};
use riptide_rpc::{
    CancelTaskReply, CancelTaskRequest, CancelWorkerLeaseReply, CreateActorReply, ErrorType,
    LeaseClient, PushTaskReply, PushTaskRequest, RemoteCancelTaskReply, RemoteCancelTaskRequest,
    RequestWorkerLeaseReply, SchedulingFailureType, StealTasksReply, StealTasksRequest, TaskSpec,
    WorkerAddress, WorkerBacklogReport, WorkerClient,
};
use riptide_submitter::client_cache::WorkerClientFactory;
use riptide_submitter::task_finisher::TaskFinisher;
use riptide_submitter::actor_creator::ActorCreator;

// ─── FakeLeaseClient ────────────────────────────────────────────────────

/// A lease request parked inside a [`FakeLeaseClient`], awaiting a reply.
pub struct PendingLease {
    pub resource_spec: TaskSpec,
    pub grant_or_reject: bool,
    pub backlog_size: i64,
    responder: oneshot::Sender<Result<RequestWorkerLeaseReply, Status>>,
}

impl PendingLease {
    pub fn respond(self, reply: Result<RequestWorkerLeaseReply, Status>) {
        let _ = self.responder.send(reply);
    }

    /// Grant a worker at `addr` with no assigned resources.
    pub fn grant(self, addr: WorkerAddress) {
        self.respond(Ok(RequestWorkerLeaseReply {
            worker_address: Some(addr),
            ..Default::default()
        }));
    }
}

/// Fake raylet lease client. Lease requests park until the test replies;
/// cancel/return/backlog calls answer immediately and are recorded.
pub struct FakeLeaseClient {
    pending: Mutex<VecDeque<PendingLease>>,
    num_lease_requests: AtomicUsize,
    cancel_success: AtomicBool,
    cancelled_leases: Mutex<Vec<TaskID>>,
    returned_workers: Mutex<Vec<(i32, WorkerID, bool)>>,
    backlog_reports: Mutex<Vec<(WorkerID, Vec<WorkerBacklogReport>)>>,
}

impl FakeLeaseClient {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(VecDeque::new()),
            num_lease_requests: AtomicUsize::new(0),
            cancel_success: AtomicBool::new(true),
            cancelled_leases: Mutex::new(Vec::new()),
            returned_workers: Mutex::new(Vec::new()),
            backlog_reports: Mutex::new(Vec::new()),
        })
    }

    /// Total lease requests seen, replied or not.
    pub fn num_lease_requests(&self) -> usize {
        self.num_lease_requests.load(Ordering::Relaxed)
    }

    pub fn num_pending_leases(&self) -> usize {
        self.pending.lock().len()
    }

    /// Take the oldest parked lease request.
    pub fn pop_pending_lease(&self) -> Option<PendingLease> {
        self.pending.lock().pop_front()
    }

    /// Grant the oldest parked lease request a worker at `addr`.
    /// Returns false if nothing was pending.
    pub fn grant_next(&self, addr: WorkerAddress) -> bool {
        match self.pop_pending_lease() {
            Some(lease) => {
                lease.grant(addr);
                true
            }
            None => false,
        }
    }

    /// Whether `cancel_worker_lease` replies success (default true).
    pub fn set_cancel_success(&self, success: bool) {
        self.cancel_success.store(success, Ordering::Relaxed);
    }

    pub fn cancelled_leases(&self) -> Vec<TaskID> {
        self.cancelled_leases.lock().clone()
    }

    pub fn returned_workers(&self) -> Vec<(i32, WorkerID, bool)> {
        self.returned_workers.lock().clone()
    }

    pub fn num_backlog_reports(&self) -> usize {
        self.backlog_reports.lock().len()
    }

    pub fn last_backlog_report(&self) -> Option<(WorkerID, Vec<WorkerBacklogReport>)> {
        self.backlog_reports.lock().last().cloned()
    }
}

#[async_trait::async_trait]
impl LeaseClient for FakeLeaseClient {
    async fn request_worker_lease(
        &self,
        resource_spec: TaskSpec,
        grant_or_reject: bool,
        backlog_size: i64,
    ) -> Result<RequestWorkerLeaseReply, Status> {
        self.num_lease_requests.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().push_back(PendingLease {
            resource_spec,
            grant_or_reject,
            backlog_size,
            responder: tx,
        });
        match rx.await {
            Ok(reply) => reply,
            Err(_) => Err(Status::cancelled("lease request dropped by test")),
        }
    }

    async fn cancel_worker_lease(
        &self,
        lease_task_id: TaskID,
    ) -> Result<CancelWorkerLeaseReply, Status> {
        self.cancelled_leases.lock().push(lease_task_id);
        let success = self.cancel_success.load(Ordering::Relaxed);
        if success {
            // A raylet that acks the cancellation also answers the original
            // lease request with a canceled reply.
            let parked = {
                let mut pending = self.pending.lock();
                pending
                    .iter()
                    .position(|p| p.resource_spec.task_id == lease_task_id)
                    .and_then(|pos| pending.remove(pos))
            };
            if let Some(lease) = parked {
                lease.respond(Ok(RequestWorkerLeaseReply {
                    canceled: true,
                    failure_type: SchedulingFailureType::Other,
                    ..Default::default()
                }));
            }
        }
        Ok(CancelWorkerLeaseReply { success })
    }

    async fn return_worker(
        &self,
        worker_port: i32,
        worker_id: WorkerID,
        was_error: bool,
    ) -> Result<(), Status> {
        self.returned_workers
            .lock()
            .push((worker_port, worker_id, was_error));
        Ok(())
    }

    async fn report_worker_backlog(
        &self,
        worker_id: WorkerID,
        reports: Vec<WorkerBacklogReport>,
    ) -> Result<(), Status> {
        self.backlog_reports.lock().push((worker_id, reports));
        Ok(())
    }
}

// ─── FakeWorkerClient ───────────────────────────────────────────────────

/// A push request parked inside a [`FakeWorkerClient`], awaiting a reply.
pub struct PendingPush {
    pub request: PushTaskRequest,
    responder: oneshot::Sender<Result<PushTaskReply, Status>>,
}

impl PendingPush {
    pub fn task_id(&self) -> TaskID {
        self.request.task_spec.task_id
    }

    pub fn respond(self, reply: Result<PushTaskReply, Status>) {
        let _ = self.responder.send(reply);
    }

    pub fn respond_ok(self) {
        self.respond(Ok(PushTaskReply::default()));
    }
}

/// A steal request parked inside a [`FakeWorkerClient`], awaiting a reply.
pub struct PendingSteal {
    pub request: StealTasksRequest,
    responder: oneshot::Sender<Result<StealTasksReply, Status>>,
}

impl PendingSteal {
    pub fn respond(self, reply: Result<StealTasksReply, Status>) {
        let _ = self.responder.send(reply);
    }

    /// Surrender the given task ids to the thief.
    pub fn surrender(self, stolen_task_ids: Vec<TaskID>) {
        self.respond(Ok(StealTasksReply { stolen_task_ids }));
    }
}

/// Fake leased-worker client. Pushes and steals park until the test
/// replies unless an auto-reply is configured; cancels answer immediately
/// from a configurable reply.
pub struct FakeWorkerClient {
    pushes: Mutex<VecDeque<PendingPush>>,
    num_pushes: AtomicUsize,
    auto_push_reply: Mutex<Option<Result<PushTaskReply, Status>>>,
    steals: Mutex<VecDeque<PendingSteal>>,
    num_steals: AtomicUsize,
    cancel_requests: Mutex<Vec<CancelTaskRequest>>,
    cancel_reply: Mutex<Result<CancelTaskReply, Status>>,
    remote_cancel_requests: Mutex<Vec<RemoteCancelTaskRequest>>,
}

impl FakeWorkerClient {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pushes: Mutex::new(VecDeque::new()),
            num_pushes: AtomicUsize::new(0),
            auto_push_reply: Mutex::new(None),
            steals: Mutex::new(VecDeque::new()),
            num_steals: AtomicUsize::new(0),
            cancel_requests: Mutex::new(Vec::new()),
            cancel_reply: Mutex::new(Ok(CancelTaskReply {
                attempt_succeeded: true,
            })),
            remote_cancel_requests: Mutex::new(Vec::new()),
        })
    }

    /// Total pushes seen, replied or not.
    pub fn num_pushes(&self) -> usize {
        self.num_pushes.load(Ordering::Relaxed)
    }

    pub fn num_pending_pushes(&self) -> usize {
        self.pushes.lock().len()
    }

    /// Take the oldest parked push.
    pub fn pop_pending_push(&self) -> Option<PendingPush> {
        self.pushes.lock().pop_front()
    }

    /// Reply to the oldest parked push. Returns false if none was pending.
    pub fn reply_next_push(&self, reply: Result<PushTaskReply, Status>) -> bool {
        match self.pop_pending_push() {
            Some(push) => {
                push.respond(reply);
                true
            }
            None => false,
        }
    }

    /// Answer every push (current and future) with `reply` immediately.
    pub fn set_auto_push_reply(&self, reply: Result<PushTaskReply, Status>) {
        let mut pending = self.pushes.lock();
        *self.auto_push_reply.lock() = Some(reply.clone());
        while let Some(push) = pending.pop_front() {
            push.respond(reply.clone());
        }
    }

    pub fn num_steals(&self) -> usize {
        self.num_steals.load(Ordering::Relaxed)
    }

    pub fn pop_pending_steal(&self) -> Option<PendingSteal> {
        self.steals.lock().pop_front()
    }

    pub fn set_cancel_reply(&self, reply: Result<CancelTaskReply, Status>) {
        *self.cancel_reply.lock() = reply;
    }

    pub fn cancel_requests(&self) -> Vec<CancelTaskRequest> {
        self.cancel_requests.lock().clone()
    }

    pub fn remote_cancel_requests(&self) -> Vec<RemoteCancelTaskRequest> {
        self.remote_cancel_requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl WorkerClient for FakeWorkerClient {
    async fn push_normal_task(&self, req: PushTaskRequest) -> Result<PushTaskReply, Status> {
        self.num_pushes.fetch_add(1, Ordering::Relaxed);
        if let Some(reply) = self.auto_push_reply.lock().clone() {
            return reply;
        }
        let (tx, rx) = oneshot::channel();
        self.pushes.lock().push_back(PendingPush {
            request: req,
            responder: tx,
        });
        match rx.await {
            Ok(reply) => reply,
            Err(_) => Err(Status::cancelled("push dropped by test")),
        }
    }

    async fn steal_tasks(&self, req: StealTasksRequest) -> Result<StealTasksReply, Status> {
        self.num_steals.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.steals.lock().push_back(PendingSteal {
            request: req,
            responder: tx,
        });
        match rx.await {
            Ok(reply) => reply,
            Err(_) => Err(Status::cancelled("steal dropped by test")),
        }
    }

    async fn cancel_task(&self, req: CancelTaskRequest) -> Result<CancelTaskReply, Status> {
        self.cancel_requests.lock().push(req);
        self.cancel_reply.lock().clone()
    }

    async fn remote_cancel_task(
        &self,
        req: RemoteCancelTaskRequest,
    ) -> Result<RemoteCancelTaskReply, Status> {
        self.remote_cancel_requests.lock().push(req);
        Ok(RemoteCancelTaskReply::default())
    }
}

/// Hands out one [`FakeWorkerClient`] per worker id; use [`factory`] to
/// plug it into a `WorkerClientCache`.
///
/// [`factory`]: FakeWorkerClientRegistry::factory
pub struct FakeWorkerClientRegistry {
    clients: Mutex<HashMap<WorkerID, Arc<FakeWorkerClient>>>,
}

impl FakeWorkerClientRegistry {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            clients: Mutex::new(HashMap::new()),
        })
    }

    pub fn get_or_create(&self, worker_id: WorkerID) -> Arc<FakeWorkerClient> {
        Arc::clone(
            self.clients
                .lock()
                .entry(worker_id)
                .or_insert_with(FakeWorkerClient::new),
        )
    }

    pub fn factory(self: &Arc<Self>) -> WorkerClientFactory {
        let registry = Arc::clone(self);
        Box::new(move |addr| registry.get_or_create(addr.worker_id) as Arc<dyn WorkerClient>)
    }
}

// ─── RecordingTaskFinisher ──────────────────────────────────────────────

/// Task finisher that records every outcome for inspection.
///
/// Specs must be registered up front for steal-reply lookups to succeed.
pub struct RecordingTaskFinisher {
    specs: Mutex<HashMap<TaskID, TaskSpec>>,
    completed: Mutex<Vec<TaskID>>,
    failed: Mutex<Vec<(TaskID, ErrorType)>>,
    cancel_marks: Mutex<Vec<TaskID>>,
    retry_possible: AtomicBool,
    num_retry_attempts: AtomicUsize,
}

impl RecordingTaskFinisher {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            specs: Mutex::new(HashMap::new()),
            completed: Mutex::new(Vec::new()),
            failed: Mutex::new(Vec::new()),
            cancel_marks: Mutex::new(Vec::new()),
            retry_possible: AtomicBool::new(false),
            num_retry_attempts: AtomicUsize::new(0),
        })
    }

    /// Make `get_task_spec` resolve this spec.
    pub fn register_spec(&self, spec: TaskSpec) {
        self.specs.lock().insert(spec.task_id, spec);
    }

    pub fn completed_tasks(&self) -> Vec<TaskID> {
        self.completed.lock().clone()
    }

    pub fn failed_tasks(&self) -> Vec<(TaskID, ErrorType)> {
        self.failed.lock().clone()
    }

    pub fn num_finished(&self) -> usize {
        self.completed.lock().len() + self.failed.lock().len()
    }

    /// Whether `retry_task_if_possible` reports success (default false).
    pub fn set_retry_possible(&self, possible: bool) {
        self.retry_possible.store(possible, Ordering::Relaxed);
    }

    pub fn num_retry_attempts(&self) -> usize {
        self.num_retry_attempts.load(Ordering::Relaxed)
    }
}

impl TaskFinisher for RecordingTaskFinisher {
    fn complete_pending_task(
        &self,
        task_id: TaskID,
        _reply: &PushTaskReply,
        _worker_addr: Option<&WorkerAddress>,
    ) {
        self.completed.lock().push(task_id);
    }

    fn fail_or_retry_pending_task(
        &self,
        task_id: TaskID,
        error_type: ErrorType,
        _status: Option<&RiptideError>,
    ) {
        self.failed.lock().push((task_id, error_type));
    }

    fn fail_pending_task(
        &self,
        task_id: TaskID,
        error_type: ErrorType,
        _status: Option<&RiptideError>,
    ) {
        self.failed.lock().push((task_id, error_type));
    }

    fn mark_task_canceled(&self, task_id: TaskID) -> bool {
        self.cancel_marks.lock().push(task_id);
        // Cancellation is possible while the task has not finished.
        !self.completed.lock().contains(&task_id)
            && !self.failed.lock().iter().any(|(id, _)| *id == task_id)
    }

    fn retry_task_if_possible(&self, _task_id: TaskID) -> bool {
        self.num_retry_attempts.fetch_add(1, Ordering::Relaxed);
        self.retry_possible.load(Ordering::Relaxed)
    }

    fn get_task_spec(&self, task_id: TaskID) -> Option<TaskSpec> {
        self.specs.lock().get(&task_id).cloned()
    }
}

// ─── FakeActorCreator ───────────────────────────────────────────────────

/// Actor creator answering from a configurable reply.
pub struct FakeActorCreator {
    reply: Mutex<RiptideResult<CreateActorReply>>,
    created: Mutex<Vec<TaskSpec>>,
}

impl FakeActorCreator {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Ok(CreateActorReply::default())),
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn set_reply(&self, reply: RiptideResult<CreateActorReply>) {
        *self.reply.lock() = reply;
    }

    pub fn created_specs(&self) -> Vec<TaskSpec> {
        self.created.lock().clone()
    }
}

#[async_trait::async_trait]
impl ActorCreator for FakeActorCreator {
    async fn create_actor(&self, task_spec: TaskSpec) -> RiptideResult<CreateActorReply> {
        self.created.lock().push(task_spec);
        self.reply.lock().clone()
    }
}
