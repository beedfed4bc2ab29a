// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Direct task submission with raylet lease integration.
//!
//! Submitted tasks are resolved asynchronously, queued under their
//! scheduling key, and dispatched to short-lived leased workers. Each
//! leased worker runs a pipeline of up to
//! `max_tasks_in_flight_per_worker` concurrent pushes; when a worker
//! drains and its key's queue is empty, it first tries to steal work from
//! the busiest peer worker of the same key before being returned to its
//! raylet.
//!
//! All bookkeeping lives behind one mutex. RPCs are issued as spawned
//! tasks whose continuations re-acquire the mutex, so state transitions
//! stay serialized while the submitter itself never blocks on the network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tonic::Status;

use riptide_common::id::{ObjectID, TaskID, WorkerID};
use riptide_common::status::{RiptideError, RiptideResult};
use riptide_rpc::{
    Address, CancelTaskReply, CancelTaskRequest, CancelWorkerLeaseReply, ErrorType,
    LeaseClient, PushTaskReply, PushTaskRequest, RemoteCancelTaskRequest,
    RequestWorkerLeaseReply, ResourceMapEntry, SchedulingClass, SchedulingFailureType,
    StealTasksReply, StealTasksRequest, TaskSpec, WorkerAddress, WorkerBacklogReport,
    WorkerClient,
};
use riptide_util::time::current_time_ms;

use crate::actor_creator::ActorCreator;
use crate::client_cache::{LeaseClientPool, WorkerClientCache};
use crate::dependency_resolver::DependencyResolver;
use crate::lease_policy::LeasePolicy;
use crate::options::{SubmitterOptions, WorkerType};
use crate::scheduling_key::{LeaseEntry, SchedulingKey, SchedulingKeyEntry};
use crate::task_finisher::TaskFinisher;

#[derive(Default)]
struct SubmitterState {
    scheduling_key_entries: HashMap<SchedulingKey, SchedulingKeyEntry>,
    worker_to_lease_entry: HashMap<WorkerAddress, LeaseEntry>,
    /// Tasks whose cancellation arrived before dependency resolution
    /// finished; consulted when resolution completes.
    cancelled_tasks: HashSet<TaskID>,
    /// Task id -> worker it was pushed to, cleared on push reply or steal.
    executing_tasks: HashMap<TaskID, WorkerAddress>,
}

/// The client-side scheduling core: batches tasks by scheduling key,
/// leases workers from raylets, pipelines pushes, steals between leased
/// workers, and coordinates cancellation.
pub struct DirectTaskSubmitter {
    self_ref: Weak<DirectTaskSubmitter>,
    options: SubmitterOptions,
    lease_clients: LeaseClientPool,
    worker_clients: WorkerClientCache,
    lease_policy: Arc<dyn LeasePolicy>,
    resolver: Arc<dyn DependencyResolver>,
    task_finisher: Arc<dyn TaskFinisher>,
    actor_creator: Arc<dyn ActorCreator>,
    /// Invoked when the local raylet dies under a worker-role submitter.
    process_exit: Mutex<Arc<dyn Fn() + Send + Sync>>,
    num_tasks_submitted: AtomicU64,
    num_leases_requested: AtomicU64,
    state: Mutex<SubmitterState>,
}

impl DirectTaskSubmitter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        options: SubmitterOptions,
        lease_clients: LeaseClientPool,
        worker_clients: WorkerClientCache,
        lease_policy: Arc<dyn LeasePolicy>,
        resolver: Arc<dyn DependencyResolver>,
        task_finisher: Arc<dyn TaskFinisher>,
        actor_creator: Arc<dyn ActorCreator>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            options,
            lease_clients,
            worker_clients,
            lease_policy,
            resolver,
            task_finisher,
            actor_creator,
            process_exit: Mutex::new(Arc::new(|| {
                riptide_util::process::quick_exit();
            }) as Arc<dyn Fn() + Send + Sync>),
            num_tasks_submitted: AtomicU64::new(0),
            num_leases_requested: AtomicU64::new(0),
            state: Mutex::new(SubmitterState::default()),
        })
    }

    /// Replace the process-exit hook invoked when the local raylet dies
    /// under a worker-role submitter. The hook must not call back into the
    /// submitter.
    pub fn set_process_exit_hook(&self, hook: Arc<dyn Fn() + Send + Sync>) {
        *self.process_exit.lock() = hook;
    }

    // ─── Submission path ────────────────────────────────────────────────

    /// Submit a task for execution on some leased worker. Non-blocking:
    /// dependency resolution, queueing, and dispatch all happen
    /// asynchronously.
    pub fn submit_task(&self, task_spec: TaskSpec) {
        tracing::debug!(task_id = %task_spec.task_id, "submitting task");
        self.num_tasks_submitted.fetch_add(1, Ordering::Relaxed);

        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let task_id = task_spec.task_id;
            let task_spec = match this.resolver.resolve(task_spec).await {
                Ok(spec) => spec,
                Err(error) => {
                    tracing::warn!(task_id = %task_id, error = %error,
                        "resolving task dependencies failed");
                    this.task_finisher.fail_or_retry_pending_task(
                        task_id,
                        ErrorType::DependencyResolutionFailed,
                        Some(&error),
                    );
                    return;
                }
            };
            tracing::debug!(task_id = %task_id, "task dependencies resolved");

            if task_spec.is_actor_creation_task() {
                // Actor creation goes through the cluster metadata service
                // once its arguments are in scope; it never takes a worker
                // lease here.
                let actor_id = task_spec.actor_creation_id;
                tracing::debug!(actor_id = %actor_id, "creating actor");
                match this.actor_creator.create_actor(task_spec).await {
                    Ok(reply) => {
                        tracing::debug!(actor_id = %actor_id, "created actor");
                        let push_reply = PushTaskReply {
                            borrowed_refs: reply.borrowed_refs.clone(),
                            ..Default::default()
                        };
                        this.task_finisher.complete_pending_task(
                            task_id,
                            &push_reply,
                            reply.actor_address.as_ref(),
                        );
                    }
                    Err(error) => {
                        tracing::error!(actor_id = %actor_id, error = %error,
                            "failed to create actor");
                        this.task_finisher.fail_or_retry_pending_task(
                            task_id,
                            ErrorType::ActorCreationFailed,
                            Some(&error),
                        );
                    }
                }
                return;
            }

            this.enqueue_resolved_task(task_spec);
        });
    }

    /// Continuation of `submit_task` once dependencies are plasma-only.
    fn enqueue_resolved_task(&self, task_spec: TaskSpec) {
        let task_id = task_spec.task_id;
        let mut keep_executing = true;
        {
            let mut state = self.state.lock();
            if state.cancelled_tasks.remove(&task_id) {
                keep_executing = false;
            }
            if keep_executing {
                let scheduling_key = SchedulingKey::from_task_spec(&task_spec);
                let cap = self.options.max_tasks_in_flight_per_worker;
                {
                    let entry = state
                        .scheduling_key_entries
                        .entry(scheduling_key.clone())
                        .or_default();
                    entry.resource_spec = task_spec.clone();
                    entry.task_queue.push_back(task_spec);
                }

                // If some active worker has pipeline room, hand it the new
                // task directly. The queue cannot hold anything else: a
                // non-full worker would already have drained it.
                let candidate = {
                    let entry = &state.scheduling_key_entries[&scheduling_key];
                    if entry.all_pipelines_full(cap) {
                        None
                    } else {
                        entry.active_workers.iter().find_map(|addr| {
                            state.worker_to_lease_entry.get(addr).and_then(|lease| {
                                (!lease.pipeline_full(cap)).then(|| {
                                    (addr.clone(), lease.assigned_resources.clone())
                                })
                            })
                        })
                    }
                };
                if let Some((addr, assigned_resources)) = candidate {
                    self.on_worker_idle(
                        &mut state,
                        &addr,
                        &scheduling_key,
                        false,
                        &assigned_resources,
                    );
                }
                self.request_new_worker_if_needed(&mut state, &scheduling_key, None);
            }
        }
        if !keep_executing {
            self.task_finisher.fail_or_retry_pending_task(
                task_id,
                ErrorType::TaskCancelled,
                None,
            );
        }
    }

    // ─── Pipelining engine ──────────────────────────────────────────────

    /// Drive a worker with pipeline room: push queued tasks until the
    /// queue empties or the pipeline fills, or hand the worker off to the
    /// steal/return path when there is nothing left for it.
    fn on_worker_idle(
        &self,
        state: &mut SubmitterState,
        addr: &WorkerAddress,
        scheduling_key: &SchedulingKey,
        was_error: bool,
        assigned_resources: &[ResourceMapEntry],
    ) {
        let cap = self.options.max_tasks_in_flight_per_worker;
        let Some(lease_entry) = state.worker_to_lease_entry.get(addr) else {
            return;
        };
        let lease_expired = current_time_ms() > lease_entry.lease_expiration_time;
        let is_stealing = lease_entry.is_stealing();
        let tasks_in_flight = lease_entry.tasks_in_flight;
        let queue_empty = state
            .scheduling_key_entries
            .get(scheduling_key)
            .map_or(true, |e| e.task_queue.is_empty());

        if was_error || lease_expired || (queue_empty && !is_stealing) {
            // The worker must drain before it can steal or be returned;
            // outstanding pushes re-enter here as their replies arrive.
            if tasks_in_flight == 0 {
                self.steal_tasks_or_return_worker(state, addr, was_error, scheduling_key);
            }
        } else {
            let client = self.worker_clients.get_or_connect(addr);
            let SubmitterState {
                scheduling_key_entries,
                worker_to_lease_entry,
                executing_tasks,
                ..
            } = &mut *state;
            if let (Some(entry), Some(lease_entry)) = (
                scheduling_key_entries.get_mut(scheduling_key),
                worker_to_lease_entry.get_mut(addr),
            ) {
                while !entry.task_queue.is_empty() && !lease_entry.pipeline_full(cap) {
                    let Some(task_spec) = entry.task_queue.pop_front() else {
                        break;
                    };
                    lease_entry.tasks_in_flight += 1;
                    entry.total_tasks_in_flight += 1;
                    executing_tasks.insert(task_spec.task_id, addr.clone());
                    self.push_normal_task(
                        addr,
                        Arc::clone(&client),
                        scheduling_key,
                        task_spec,
                        assigned_resources,
                    );
                }
            }
            if cap == 1 {
                // Stealing is impossible, so surplus lease requests have
                // nothing left to serve.
                self.cancel_worker_lease_if_needed(state, scheduling_key);
            }
        }
        self.request_new_worker_if_needed(state, scheduling_key, None);
    }

    // ─── Lease acquisition ──────────────────────────────────────────────

    fn request_new_worker_if_needed(
        &self,
        state: &mut SubmitterState,
        scheduling_key: &SchedulingKey,
        raylet_address: Option<&Address>,
    ) {
        let cap = self.options.max_tasks_in_flight_per_worker;
        let max_pending = self
            .options
            .max_pending_lease_requests_per_scheduling_category;
        {
            let Some(entry) = state.scheduling_key_entries.get(scheduling_key) else {
                return;
            };
            if entry.pending_lease_requests.len() >= max_pending {
                tracing::debug!(limit = max_pending, "pending lease request limit reached");
                return;
            }
            // With stealing disabled there is no reason to lease ahead
            // while current pipelines still have room.
            if !entry.all_pipelines_full(cap) && cap == 1 {
                return;
            }
            if entry.task_queue.is_empty() {
                // An empty queue only justifies a lease when a new worker
                // could steal from a loaded peer (eager worker requesting).
                if !entry.stealable_tasks() {
                    let can_delete = entry.can_delete();
                    if can_delete {
                        state.scheduling_key_entries.remove(scheduling_key);
                    }
                    return;
                }
            } else if entry.task_queue.len() <= entry.pending_lease_requests.len() {
                // Every queued task is already covered by a pending lease.
                return;
            }
        }

        self.num_leases_requested.fetch_add(1, Ordering::Relaxed);

        // Fresh placeholder id per request; reusing one across retries
        // would make lease replies ambiguous.
        let mut resource_spec = match state.scheduling_key_entries.get(scheduling_key) {
            Some(entry) => entry.resource_spec.clone(),
            None => return,
        };
        resource_spec.task_id = TaskID::from_random();
        resource_spec.job_id = self.options.job_id;
        let lease_task_id = resource_spec.task_id;

        let is_spillback = raylet_address.is_some();
        let raylet_address = match raylet_address {
            Some(address) => address.clone(),
            None => self.lease_policy.get_best_node_for_task(&resource_spec),
        };
        let lease_client = self.lease_clients.get_or_connect(&raylet_address);
        let backlog_size = state
            .scheduling_key_entries
            .get(scheduling_key)
            .map_or(0, |e| e.task_queue.len() as i64);

        tracing::debug!(raylet = %raylet_address.node_id, task_id = %lease_task_id,
            "requesting worker lease");

        if let Some(this) = self.self_ref.upgrade() {
            let scheduling_key = scheduling_key.clone();
            let reply_raylet_address = raylet_address.clone();
            tokio::spawn(async move {
                let result = lease_client
                    .request_worker_lease(resource_spec, is_spillback, backlog_size)
                    .await;
                this.handle_lease_reply(
                    &scheduling_key,
                    lease_task_id,
                    is_spillback,
                    reply_raylet_address,
                    result,
                );
            });
        }

        if let Some(entry) = state.scheduling_key_entries.get_mut(scheduling_key) {
            entry
                .pending_lease_requests
                .insert(lease_task_id, raylet_address);
        }
        self.report_worker_backlog_if_needed(state, scheduling_key);
    }

    fn handle_lease_reply(
        &self,
        scheduling_key: &SchedulingKey,
        lease_task_id: TaskID,
        is_spillback: bool,
        raylet_address: Address,
        result: Result<RequestWorkerLeaseReply, Status>,
    ) {
        let mut state = self.state.lock();
        let lease_client = self.lease_clients.get_or_connect(&raylet_address);
        state
            .scheduling_key_entries
            .entry(scheduling_key.clone())
            .or_default()
            .pending_lease_requests
            .remove(&lease_task_id);

        match result {
            Ok(reply) => {
                if reply.canceled {
                    tracing::debug!(task_id = %lease_task_id, failure = ?reply.failure_type,
                        "lease request canceled");
                    match reply.failure_type {
                        SchedulingFailureType::RuntimeEnvSetupFailed
                        | SchedulingFailureType::PlacementGroupRemoved => {
                            // Nothing queued under this key can ever be
                            // placed; fail the whole queue eagerly.
                            let failure_type = reply.failure_type;
                            let mut can_delete = false;
                            if let Some(entry) =
                                state.scheduling_key_entries.get_mut(scheduling_key)
                            {
                                while let Some(task_spec) = entry.task_queue.pop_front() {
                                    let error_type = match failure_type {
                                        SchedulingFailureType::RuntimeEnvSetupFailed => {
                                            ErrorType::RuntimeEnvSetupFailed
                                        }
                                        _ if task_spec.is_actor_creation_task() => {
                                            ErrorType::ActorPlacementGroupRemoved
                                        }
                                        _ => ErrorType::TaskPlacementGroupRemoved,
                                    };
                                    self.task_finisher.fail_pending_task(
                                        task_spec.task_id,
                                        error_type,
                                        None,
                                    );
                                }
                                can_delete = entry.can_delete();
                            }
                            if can_delete {
                                state.scheduling_key_entries.remove(scheduling_key);
                            }
                        }
                        _ => {
                            self.request_new_worker_if_needed(&mut state, scheduling_key, None);
                        }
                    }
                } else if reply.rejected {
                    tracing::debug!(task_id = %lease_task_id, "lease request rejected");
                    // Only spillback requests can be rejected; the origin
                    // raylet's resource view was stale, so ask the policy
                    // again from scratch.
                    debug_assert!(is_spillback);
                    self.request_new_worker_if_needed(&mut state, scheduling_key, None);
                } else if let Some(worker_address) = reply.worker_address {
                    tracing::debug!(task_id = %lease_task_id,
                        worker = %worker_address.worker_id,
                        raylet = %worker_address.node_id, "lease granted");
                    self.add_worker_lease_client(
                        &mut state,
                        &worker_address,
                        lease_client,
                        &reply.resource_mapping,
                        scheduling_key,
                    );
                    self.on_worker_idle(
                        &mut state,
                        &worker_address,
                        scheduling_key,
                        false,
                        &reply.resource_mapping,
                    );
                } else if let Some(retry_at) = reply.retry_at_raylet_address {
                    debug_assert!(!is_spillback);
                    tracing::debug!(task_id = %lease_task_id,
                        from = %raylet_address.node_id, to = %retry_at.node_id,
                        "lease redirected");
                    self.request_new_worker_if_needed(&mut state, scheduling_key, Some(&retry_at));
                } else {
                    // Empty grant; treat like a cancellation and try again.
                    self.request_new_worker_if_needed(&mut state, scheduling_key, None);
                }
            }
            Err(status) => {
                if raylet_address.node_id != self.options.local_raylet_id {
                    // A remote raylet became unreachable; retry at home
                    // while the lease is still needed.
                    tracing::info!(error = %status,
                        "lease request to remote raylet failed, retrying locally");
                    self.request_new_worker_if_needed(&mut state, scheduling_key, None);
                } else if status.code() == tonic::Code::Unavailable {
                    tracing::warn!(error = %status, "local raylet is unavailable (crashed)");
                    if self.options.worker_type == WorkerType::Worker {
                        // Exit so the caller can retry somewhere else.
                        tracing::warn!("terminating the worker due to local raylet death");
                        let exit = Arc::clone(&*self.process_exit.lock());
                        (*exit)();
                        return;
                    }
                    let error = RiptideError::unavailable(status.message().to_string());
                    let mut can_delete = false;
                    if let Some(entry) = state.scheduling_key_entries.get_mut(scheduling_key) {
                        while let Some(task_spec) = entry.task_queue.pop_front() {
                            self.task_finisher.fail_pending_task(
                                task_spec.task_id,
                                ErrorType::LocalRayletDied,
                                Some(&error),
                            );
                        }
                        can_delete = entry.can_delete();
                    }
                    if can_delete {
                        state.scheduling_key_entries.remove(scheduling_key);
                    }
                } else {
                    tracing::warn!(error = %status,
                        "lease request to local raylet failed but raylet is alive, retrying");
                    self.request_new_worker_if_needed(&mut state, scheduling_key, None);
                }
            }
        }
    }

    /// Register a freshly granted worker and open its RPC connection.
    fn add_worker_lease_client(
        &self,
        state: &mut SubmitterState,
        addr: &WorkerAddress,
        lease_client: Arc<dyn LeaseClient>,
        assigned_resources: &[ResourceMapEntry],
        scheduling_key: &SchedulingKey,
    ) {
        self.worker_clients.get_or_connect(addr);
        let expiration = current_time_ms() + self.options.lease_timeout_ms;
        state.worker_to_lease_entry.insert(
            addr.clone(),
            LeaseEntry::new(
                lease_client,
                expiration,
                assigned_resources.to_vec(),
                scheduling_key.clone(),
            ),
        );
        let entry = state
            .scheduling_key_entries
            .entry(scheduling_key.clone())
            .or_default();
        let inserted = entry.active_workers.insert(addr.clone());
        debug_assert!(inserted);
    }

    /// Hand a drained worker back to its raylet.
    fn return_worker(
        &self,
        state: &mut SubmitterState,
        addr: &WorkerAddress,
        was_error: bool,
        scheduling_key: &SchedulingKey,
    ) {
        tracing::debug!(worker = %addr.worker_id, raylet = %addr.node_id,
            "returning worker to raylet");
        let Some(lease_entry) = state.worker_to_lease_entry.remove(addr) else {
            return;
        };
        debug_assert_eq!(lease_entry.tasks_in_flight, 0);
        debug_assert!(!lease_entry.is_stealing());

        let mut can_delete = false;
        if let Some(entry) = state.scheduling_key_entries.get_mut(scheduling_key) {
            entry.active_workers.remove(addr);
            can_delete = entry.can_delete();
        }
        if can_delete {
            state.scheduling_key_entries.remove(scheduling_key);
        }

        let lease_client = lease_entry.lease_client;
        let worker_port = addr.port;
        let worker_id = addr.worker_id;
        tokio::spawn(async move {
            if let Err(status) = lease_client
                .return_worker(worker_port, worker_id, was_error)
                .await
            {
                tracing::error!(error = %status, "error returning worker to raylet");
            }
        });
    }

    // ─── Pushing ────────────────────────────────────────────────────────

    fn push_normal_task(
        &self,
        addr: &WorkerAddress,
        client: Arc<dyn WorkerClient>,
        scheduling_key: &SchedulingKey,
        task_spec: TaskSpec,
        assigned_resources: &[ResourceMapEntry],
    ) {
        tracing::debug!(task_id = %task_spec.task_id, worker = %addr.worker_id,
            raylet = %addr.node_id, "pushing task to worker");
        let task_id = task_spec.task_id;
        let is_actor = task_spec.is_actor_task;
        let is_actor_creation = task_spec.is_actor_creation_task();
        let retry_exceptions = task_spec.retry_exceptions;
        let request = PushTaskRequest {
            intended_worker_id: addr.worker_id,
            task_spec,
            resource_mapping: assigned_resources.to_vec(),
        };
        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        let addr = addr.clone();
        let scheduling_key = scheduling_key.clone();
        let assigned_resources = assigned_resources.to_vec();
        tokio::spawn(async move {
            let result = client.push_normal_task(request).await;
            this.handle_push_reply(
                &addr,
                &scheduling_key,
                task_id,
                retry_exceptions,
                is_actor,
                is_actor_creation,
                &assigned_resources,
                result,
            );
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_push_reply(
        &self,
        addr: &WorkerAddress,
        scheduling_key: &SchedulingKey,
        task_id: TaskID,
        retry_exceptions: bool,
        is_actor: bool,
        is_actor_creation: bool,
        assigned_resources: &[ResourceMapEntry],
        result: Result<PushTaskReply, Status>,
    ) {
        {
            let mut state = self.state.lock();
            tracing::debug!(task_id = %task_id, worker = %addr.worker_id,
                "task push finished");
            state.executing_tasks.remove(&task_id);

            if let Some(lease_entry) = state.worker_to_lease_entry.get_mut(addr) {
                debug_assert!(lease_entry.tasks_in_flight >= 1);
                lease_entry.tasks_in_flight = lease_entry.tasks_in_flight.saturating_sub(1);
            }
            if let Some(entry) = state.scheduling_key_entries.get_mut(scheduling_key) {
                debug_assert!(entry.total_tasks_in_flight >= 1);
                entry.total_tasks_in_flight = entry.total_tasks_in_flight.saturating_sub(1);
            }

            let worker_exiting = matches!(&result, Ok(reply) if reply.worker_exiting);
            let task_stolen = matches!(&result, Ok(reply) if reply.task_stolen);

            if worker_exiting {
                // The worker is draining and will shut down on its own;
                // returning it to the raylet would kill it early.
                tracing::debug!(worker = %addr.worker_id, "worker replied that it is exiting");
                state.worker_to_lease_entry.remove(addr);
                let mut can_delete = false;
                if let Some(entry) = state.scheduling_key_entries.get_mut(scheduling_key) {
                    entry.active_workers.remove(addr);
                    can_delete = entry.can_delete();
                }
                if can_delete {
                    state.scheduling_key_entries.remove(scheduling_key);
                }
            } else if task_stolen {
                // The steal reply re-queues the task and drives the thief;
                // nothing to finish here.
                return;
            } else if result.is_err() || !is_actor_creation {
                // Successful actor creation leases the worker indefinitely,
                // so it is not driven idle.
                self.on_worker_idle(
                    &mut state,
                    addr,
                    scheduling_key,
                    result.is_err(),
                    assigned_resources,
                );
            }
        }

        match result {
            Err(status) => {
                let error = RiptideError::rpc_error(status.message().to_string());
                let error_type = if is_actor {
                    ErrorType::ActorDied
                } else {
                    ErrorType::WorkerDied
                };
                self.task_finisher
                    .fail_or_retry_pending_task(task_id, error_type, Some(&error));
            }
            Ok(reply) => {
                if !retry_exceptions
                    || !reply.is_application_error
                    || !self.task_finisher.retry_task_if_possible(task_id)
                {
                    self.task_finisher
                        .complete_pending_task(task_id, &reply, Some(addr));
                }
            }
        }
    }

    // ─── Stealing ───────────────────────────────────────────────────────

    /// Pick the busiest active worker of the key, other than the thief,
    /// that has at least two tasks in flight.
    fn find_optimal_victim_for_stealing(
        &self,
        state: &SubmitterState,
        scheduling_key: &SchedulingKey,
        thief_addr: &WorkerAddress,
    ) -> Option<WorkerAddress> {
        let entry = state.scheduling_key_entries.get(scheduling_key)?;
        // Need at least one worker besides the thief, and something worth
        // stealing.
        if entry.active_workers.len() <= 1 || !entry.stealable_tasks() {
            return None;
        }

        let tasks_in_flight = |addr: &WorkerAddress| {
            state
                .worker_to_lease_entry
                .get(addr)
                .map_or(0, |e| e.tasks_in_flight)
        };

        // Start from an arbitrary incumbent; replace it whenever it is the
        // thief itself, or a non-thief candidate has more in flight.
        let mut victim = entry.active_workers.iter().next()?.clone();
        for candidate in &entry.active_workers {
            if victim.worker_id == thief_addr.worker_id
                || (tasks_in_flight(candidate) > tasks_in_flight(&victim)
                    && candidate.worker_id != thief_addr.worker_id)
            {
                victim = candidate.clone();
            }
        }

        if victim == *thief_addr || victim.worker_id == thief_addr.worker_id {
            tracing::debug!(thief = %thief_addr.worker_id,
                "no victim available distinct from the thief");
            return None;
        }
        debug_assert_eq!(
            state
                .worker_to_lease_entry
                .get(&victim)
                .map(|e| &e.scheduling_key),
            Some(scheduling_key)
        );
        if tasks_in_flight(&victim) / 2 < 1 {
            tracing::debug!(victim = %victim.worker_id,
                "victim does not have enough tasks to steal");
            return None;
        }
        Some(victim)
    }

    /// A drained worker either becomes a thief or goes back to its raylet.
    fn steal_tasks_or_return_worker(
        &self,
        state: &mut SubmitterState,
        thief_addr: &WorkerAddress,
        was_error: bool,
        scheduling_key: &SchedulingKey,
    ) {
        let Some(thief_entry) = state.worker_to_lease_entry.get(thief_addr) else {
            return;
        };
        debug_assert_eq!(thief_entry.tasks_in_flight, 0);
        debug_assert!(!thief_entry.is_stealing());

        if was_error || current_time_ms() > thief_entry.lease_expiration_time {
            tracing::debug!(worker = %thief_addr.worker_id,
                "returning worker due to error or lease expiration");
            self.return_worker(state, thief_addr, was_error, scheduling_key);
            return;
        }

        let Some(victim_addr) =
            self.find_optimal_victim_for_stealing(state, scheduling_key, thief_addr)
        else {
            if self.options.max_tasks_in_flight_per_worker > 1 {
                // Stealing was an option but nothing is stealable anymore;
                // pending lease requests have nothing left to serve.
                self.cancel_worker_lease_if_needed(state, scheduling_key);
            }
            self.return_worker(state, thief_addr, was_error, scheduling_key);
            return;
        };
        debug_assert!(self.options.max_tasks_in_flight_per_worker > 1);

        if let Some(thief_entry) = state.worker_to_lease_entry.get_mut(thief_addr) {
            thief_entry.set_stealing();
        }

        tracing::debug!(thief = %thief_addr.worker_id, victim = %victim_addr.worker_id,
            "issuing steal request");
        let victim_client = self.worker_clients.get_or_connect(&victim_addr);
        let request = StealTasksRequest {
            thief_addr: thief_addr.clone(),
        };
        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        let thief_addr = thief_addr.clone();
        let scheduling_key = scheduling_key.clone();
        let victim_worker_id = victim_addr.worker_id;
        tokio::spawn(async move {
            let result = victim_client.steal_tasks(request).await;
            this.handle_steal_reply(&thief_addr, &scheduling_key, victim_worker_id, result);
        });
    }

    fn handle_steal_reply(
        &self,
        thief_addr: &WorkerAddress,
        scheduling_key: &SchedulingKey,
        victim_worker_id: WorkerID,
        result: Result<StealTasksReply, Status>,
    ) {
        let mut state = self.state.lock();

        let assigned_resources = {
            let Some(thief_entry) = state.worker_to_lease_entry.get_mut(thief_addr) else {
                tracing::warn!(thief = %thief_addr.worker_id,
                    "thief lease disappeared while stealing");
                return;
            };
            debug_assert!(thief_entry.is_stealing());
            thief_entry.set_done_stealing();
            thief_entry.assigned_resources.clone()
        };

        let (was_error, stolen_task_ids) = match &result {
            Ok(reply) => (false, reply.stolen_task_ids.clone()),
            Err(status) => {
                tracing::warn!(error = %status, victim = %victim_worker_id,
                    "steal request failed");
                (true, Vec::new())
            }
        };
        tracing::debug!(num_stolen = stolen_task_ids.len(), victim = %victim_worker_id,
            "steal reply received");

        // Prepend in reverse so the stolen tasks keep their relative order
        // at the front of the queue.
        for stolen_task_id in stolen_task_ids.iter().rev() {
            let Some(stolen_spec) = self.task_finisher.get_task_spec(*stolen_task_id) else {
                tracing::warn!(task_id = %stolen_task_id,
                    "stolen task unknown to the task finisher, skipping");
                continue;
            };
            state.executing_tasks.remove(stolen_task_id);
            let entry = state
                .scheduling_key_entries
                .entry(scheduling_key.clone())
                .or_default();
            tracing::debug!(task_id = %stolen_task_id, queue_size = entry.task_queue.len(),
                "re-queueing stolen task");
            entry.task_queue.push_front(stolen_spec);
        }

        self.on_worker_idle(
            &mut state,
            thief_addr,
            scheduling_key,
            was_error,
            &assigned_resources,
        );
    }

    // ─── Cancellation ───────────────────────────────────────────────────

    /// Cancel a submitted task. Cooperative and racy by design: the task
    /// may be queued, executing, or still resolving dependencies.
    pub fn cancel_task(
        &self,
        task_spec: TaskSpec,
        force_kill: bool,
        recursive: bool,
    ) -> RiptideResult<()> {
        tracing::info!(task_id = %task_spec.task_id, force_kill, recursive, "canceling task");
        let scheduling_key = SchedulingKey::from_task_spec(&task_spec);
        let client = {
            let mut state = self.state.lock();
            if state.cancelled_tasks.contains(&task_spec.task_id)
                || !self.task_finisher.mark_task_canceled(task_spec.task_id)
            {
                return Ok(());
            }

            // Still queued: remove and fail immediately.
            let mut found_in_queue = false;
            let mut queue_drained = false;
            if let Some(entry) = state.scheduling_key_entries.get_mut(&scheduling_key) {
                if let Some(pos) = entry
                    .task_queue
                    .iter()
                    .position(|spec| spec.task_id == task_spec.task_id)
                {
                    entry.task_queue.remove(pos);
                    found_in_queue = true;
                    queue_drained = entry.task_queue.is_empty();
                }
            }
            if found_in_queue {
                if queue_drained {
                    self.cancel_worker_lease_if_needed(&mut state, &scheduling_key);
                }
                let can_delete = state
                    .scheduling_key_entries
                    .get(&scheduling_key)
                    .is_some_and(|e| e.can_delete());
                if can_delete {
                    state.scheduling_key_entries.remove(&scheduling_key);
                }
                self.task_finisher.fail_or_retry_pending_task(
                    task_spec.task_id,
                    ErrorType::TaskCancelled,
                    None,
                );
                return Ok(());
            }

            // Removed either on the cancel reply or when dependency
            // resolution completes.
            state.cancelled_tasks.insert(task_spec.task_id);
            let Some(executing_addr) = state.executing_tasks.get(&task_spec.task_id).cloned()
            else {
                // Dependencies still resolving; the resolve continuation
                // honors the cancellation.
                let can_delete = state
                    .scheduling_key_entries
                    .get(&scheduling_key)
                    .is_some_and(|e| e.can_delete());
                if can_delete {
                    state.scheduling_key_entries.remove(&scheduling_key);
                }
                return Ok(());
            };
            match self.worker_clients.get_by_id(&executing_addr.worker_id) {
                Some(client) => client,
                // No connection to the executing worker; best effort only.
                None => return Ok(()),
            }
        };

        let request = CancelTaskRequest {
            intended_task_id: task_spec.task_id,
            force_kill,
            recursive,
        };
        let Some(this) = self.self_ref.upgrade() else {
            return Ok(());
        };
        tokio::spawn(async move {
            let result = client.cancel_task(request).await;
            this.handle_cancel_task_reply(task_spec, force_kill, recursive, result);
        });
        Ok(())
    }

    fn handle_cancel_task_reply(
        &self,
        task_spec: TaskSpec,
        force_kill: bool,
        recursive: bool,
        result: Result<CancelTaskReply, Status>,
    ) {
        {
            let mut state = self.state.lock();
            state.cancelled_tasks.remove(&task_spec.task_id);
        }
        match result {
            Ok(reply) if !reply.attempt_succeeded => {
                if let Some(retry_ms) = self.options.cancellation_retry_ms {
                    let Some(this) = self.self_ref.upgrade() else {
                        return;
                    };
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(retry_ms)).await;
                        let _ = this.cancel_task(task_spec, force_kill, recursive);
                    });
                }
            }
            // No retry on transport failure: a force-kill may have
            // destroyed the worker before it could reply.
            _ => {}
        }
    }

    /// Relay a cancellation to the worker that owns `object_id`'s task.
    pub fn cancel_remote_task(
        &self,
        object_id: ObjectID,
        worker_addr: &WorkerAddress,
        force_kill: bool,
        recursive: bool,
    ) -> RiptideResult<()> {
        let Some(client) = self.worker_clients.get_by_id(&worker_addr.worker_id) else {
            return Err(RiptideError::invalid("no remote worker found"));
        };
        let request = RemoteCancelTaskRequest {
            remote_object_id: object_id,
            force_kill,
            recursive,
        };
        tokio::spawn(async move {
            // Fire and forget.
            let _ = client.remote_cancel_task(request).await;
        });
        Ok(())
    }

    /// Cancel every pending lease request of the key, unless its worker
    /// would still have work to do on arrival.
    fn cancel_worker_lease_if_needed(
        &self,
        state: &mut SubmitterState,
        scheduling_key: &SchedulingKey,
    ) {
        let Some(entry) = state.scheduling_key_entries.get(scheduling_key) else {
            return;
        };
        if !entry.task_queue.is_empty() || entry.stealable_tasks() {
            // Let the pending lease requests succeed; their workers will
            // have queued or stealable tasks waiting.
            return;
        }

        tracing::debug!("queue empty and nothing stealable; canceling pending lease requests");
        for (&lease_task_id, raylet_address) in &entry.pending_lease_requests {
            let lease_client = self.lease_clients.get_or_connect(raylet_address);
            tracing::debug!(task_id = %lease_task_id, "canceling lease request");
            let Some(this) = self.self_ref.upgrade() else {
                return;
            };
            let scheduling_key = scheduling_key.clone();
            tokio::spawn(async move {
                let result = lease_client.cancel_worker_lease(lease_task_id).await;
                this.handle_cancel_lease_reply(&scheduling_key, result);
            });
        }
    }

    fn handle_cancel_lease_reply(
        &self,
        scheduling_key: &SchedulingKey,
        result: Result<CancelWorkerLeaseReply, Status>,
    ) {
        let mut state = self.state.lock();
        if let Ok(reply) = result {
            if !reply.success {
                // The raylet may not have seen the lease request yet due to
                // message reordering; if it is still pending on our side,
                // ask again. If it already resolved, the pending entry is
                // gone and this is a no-op.
                self.cancel_worker_lease_if_needed(&mut state, scheduling_key);
            }
        }
    }

    // ─── Backlog reporting ──────────────────────────────────────────────

    /// Report queued-but-unleased task counts to the local raylet,
    /// aggregated per scheduling class.
    pub fn report_worker_backlog(&self) {
        let mut state = self.state.lock();
        self.report_worker_backlog_internal(&mut state);
    }

    fn report_worker_backlog_internal(&self, state: &mut SubmitterState) {
        let mut backlogs: HashMap<SchedulingClass, (TaskSpec, i64)> = HashMap::new();
        for (scheduling_key, entry) in state.scheduling_key_entries.iter_mut() {
            // Backlog is aggregated per scheduling class; sibling keys of
            // the class share the first key's resource spec as the
            // representative.
            let backlog = backlogs
                .entry(scheduling_key.scheduling_class())
                .or_insert_with(|| (entry.resource_spec.clone(), 0));
            backlog.1 += entry.backlog_size();
            entry.last_reported_backlog_size = entry.backlog_size();
        }

        let reports: Vec<WorkerBacklogReport> = backlogs
            .into_values()
            .map(|(resource_spec, backlog_size)| WorkerBacklogReport {
                resource_spec,
                backlog_size,
            })
            .collect();
        let client = self.lease_clients.local();
        let worker_id = self.options.rpc_address.worker_id;
        tokio::spawn(async move {
            if let Err(status) = client.report_worker_backlog(worker_id, reports).await {
                tracing::debug!(error = %status, "failed to report worker backlog");
            }
        });
    }

    fn report_worker_backlog_if_needed(
        &self,
        state: &mut SubmitterState,
        scheduling_key: &SchedulingKey,
    ) {
        let changed = state
            .scheduling_key_entries
            .get(scheduling_key)
            .is_some_and(|e| e.last_reported_backlog_size != e.backlog_size());
        if changed {
            self.report_worker_backlog_internal(state);
        }
    }

    // ─── Introspection ──────────────────────────────────────────────────

    pub fn num_tasks_submitted(&self) -> u64 {
        self.num_tasks_submitted.load(Ordering::Relaxed)
    }

    pub fn num_leases_requested(&self) -> u64 {
        self.num_leases_requested.load(Ordering::Relaxed)
    }

    /// True when no scheduling key entry remains: all queues drained,
    /// workers returned, leases settled.
    pub fn has_no_scheduling_key_entries(&self) -> bool {
        self.state.lock().scheduling_key_entries.is_empty()
    }

    /// Queued (not yet dispatched) task ids for a key, in queue order.
    pub fn queued_task_ids(&self, scheduling_key: &SchedulingKey) -> Vec<TaskID> {
        self.state
            .lock()
            .scheduling_key_entries
            .get(scheduling_key)
            .map_or_else(Vec::new, |e| {
                e.task_queue.iter().map(|spec| spec.task_id).collect()
            })
    }

    pub fn num_pending_lease_requests(&self, scheduling_key: &SchedulingKey) -> usize {
        self.state
            .lock()
            .scheduling_key_entries
            .get(scheduling_key)
            .map_or(0, |e| e.pending_lease_requests.len())
    }

    pub fn num_active_workers(&self, scheduling_key: &SchedulingKey) -> usize {
        self.state
            .lock()
            .scheduling_key_entries
            .get(scheduling_key)
            .map_or(0, |e| e.active_workers.len())
    }

    pub fn total_tasks_in_flight(&self, scheduling_key: &SchedulingKey) -> u32 {
        self.state
            .lock()
            .scheduling_key_entries
            .get(scheduling_key)
            .map_or(0, |e| e.total_tasks_in_flight)
    }

    /// Pipeline depth of one leased worker, or None if it holds no lease.
    pub fn tasks_in_flight_to(&self, addr: &WorkerAddress) -> Option<u32> {
        self.state
            .lock()
            .worker_to_lease_entry
            .get(addr)
            .map(|e| e.tasks_in_flight)
    }

    pub fn num_executing_tasks(&self) -> usize {
        self.state.lock().executing_tasks.len()
    }

    /// Validate the cross-map bookkeeping. Panics on violation; intended
    /// for tests and debugging at quiescent points.
    pub fn check_consistency(&self) {
        let state = self.state.lock();
        let cap = self.options.max_tasks_in_flight_per_worker;
        let max_pending = self
            .options
            .max_pending_lease_requests_per_scheduling_category;

        for (addr, lease_entry) in &state.worker_to_lease_entry {
            let entry = state.scheduling_key_entries.get(&lease_entry.scheduling_key);
            assert!(
                entry.is_some_and(|e| e.active_workers.contains(addr)),
                "leased worker {} is not an active worker of its scheduling key",
                addr.worker_id
            );
            assert!(
                lease_entry.tasks_in_flight <= cap,
                "pipeline overflow on worker {}",
                addr.worker_id
            );
            if lease_entry.is_stealing() {
                assert_eq!(
                    lease_entry.tasks_in_flight, 0,
                    "stealing worker {} has tasks in flight",
                    addr.worker_id
                );
            }
        }

        for (scheduling_key, entry) in &state.scheduling_key_entries {
            let mut total = 0;
            for addr in &entry.active_workers {
                let lease_entry = state
                    .worker_to_lease_entry
                    .get(addr)
                    .unwrap_or_else(|| panic!("active worker {} has no lease entry", addr.worker_id));
                assert_eq!(&lease_entry.scheduling_key, scheduling_key);
                total += lease_entry.tasks_in_flight;
            }
            assert_eq!(
                entry.total_tasks_in_flight, total,
                "total in-flight count out of sync"
            );
            assert!(entry.pending_lease_requests.len() <= max_pending);
            assert!(
                !entry.can_delete(),
                "deletable scheduling key entry was retained"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use crate::actor_creator::ActorCreator;
    use crate::dependency_resolver::NoopDependencyResolver;
    use crate::lease_policy::LocalLeasePolicy;
    use riptide_common::id::NodeID;
    use riptide_rpc::{CreateActorReply, RemoteCancelTaskReply};

    // ── In-file mocks: scripted replies, no manual control ─────────────

    struct MockLeaseClient {
        replies: Mutex<VecDeque<Result<RequestWorkerLeaseReply, Status>>>,
        request_count: AtomicUsize,
        returned: Mutex<Vec<WorkerID>>,
    }

    impl MockLeaseClient {
        fn new(replies: Vec<Result<RequestWorkerLeaseReply, Status>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                request_count: AtomicUsize::new(0),
                returned: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LeaseClient for MockLeaseClient {
        async fn request_worker_lease(
            &self,
            _resource_spec: TaskSpec,
            _grant_or_reject: bool,
            _backlog_size: i64,
        ) -> Result<RequestWorkerLeaseReply, Status> {
            self.request_count.fetch_add(1, Ordering::Relaxed);
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(RequestWorkerLeaseReply::default()))
        }

        async fn cancel_worker_lease(
            &self,
            _lease_task_id: TaskID,
        ) -> Result<CancelWorkerLeaseReply, Status> {
            Ok(CancelWorkerLeaseReply { success: true })
        }

        async fn return_worker(
            &self,
            _worker_port: i32,
            worker_id: WorkerID,
            _was_error: bool,
        ) -> Result<(), Status> {
            self.returned.lock().push(worker_id);
            Ok(())
        }

        async fn report_worker_backlog(
            &self,
            _worker_id: WorkerID,
            _reports: Vec<WorkerBacklogReport>,
        ) -> Result<(), Status> {
            Ok(())
        }
    }

    struct MockWorkerClient {
        push_count: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl WorkerClient for MockWorkerClient {
        async fn push_normal_task(
            &self,
            _req: PushTaskRequest,
        ) -> Result<PushTaskReply, Status> {
            self.push_count.fetch_add(1, Ordering::Relaxed);
            Ok(PushTaskReply::default())
        }

        async fn steal_tasks(
            &self,
            _req: StealTasksRequest,
        ) -> Result<StealTasksReply, Status> {
            Ok(StealTasksReply::default())
        }

        async fn cancel_task(
            &self,
            _req: CancelTaskRequest,
        ) -> Result<CancelTaskReply, Status> {
            Ok(CancelTaskReply {
                attempt_succeeded: true,
            })
        }

        async fn remote_cancel_task(
            &self,
            _req: RemoteCancelTaskRequest,
        ) -> Result<RemoteCancelTaskReply, Status> {
            Ok(RemoteCancelTaskReply::default())
        }
    }

    #[derive(Default)]
    struct NullFinisher {
        completed: Mutex<Vec<TaskID>>,
        failed: Mutex<Vec<(TaskID, ErrorType)>>,
    }

    impl TaskFinisher for NullFinisher {
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

        fn mark_task_canceled(&self, _task_id: TaskID) -> bool {
            true
        }

        fn retry_task_if_possible(&self, _task_id: TaskID) -> bool {
            false
        }

        fn get_task_spec(&self, _task_id: TaskID) -> Option<TaskSpec> {
            None
        }
    }

    struct NullActorCreator;

    #[async_trait::async_trait]
    impl ActorCreator for NullActorCreator {
        async fn create_actor(&self, _task_spec: TaskSpec) -> RiptideResult<CreateActorReply> {
            Ok(CreateActorReply::default())
        }
    }

    fn local_raylet_id() -> NodeID {
        NodeID::from_binary(&[1; 16])
    }

    fn local_raylet_address() -> Address {
        Address {
            node_id: local_raylet_id(),
            ip_address: "127.0.0.1".to_string(),
            port: 7000,
        }
    }

    fn make_submitter(
        lease_client: Arc<MockLeaseClient>,
        options: SubmitterOptions,
    ) -> (Arc<DirectTaskSubmitter>, Arc<NullFinisher>) {
        let finisher = Arc::new(NullFinisher::default());
        let submitter = DirectTaskSubmitter::new(
            options,
            LeaseClientPool::new(
                local_raylet_id(),
                lease_client,
                Box::new(|_addr| MockLeaseClient::new(vec![]) as Arc<dyn LeaseClient>),
            ),
            WorkerClientCache::new(Box::new(|_addr| {
                Arc::new(MockWorkerClient {
                    push_count: AtomicUsize::new(0),
                }) as Arc<dyn WorkerClient>
            })),
            Arc::new(LocalLeasePolicy::new(local_raylet_address())),
            Arc::new(NoopDependencyResolver),
            Arc::clone(&finisher) as Arc<dyn TaskFinisher>,
            Arc::new(NullActorCreator),
        );
        (submitter, finisher)
    }

    fn default_options() -> SubmitterOptions {
        SubmitterOptions {
            local_raylet_id: local_raylet_id(),
            ..Default::default()
        }
    }

    fn granted_worker(seed: u8) -> RequestWorkerLeaseReply {
        RequestWorkerLeaseReply {
            worker_address: Some(WorkerAddress {
                node_id: local_raylet_id(),
                ip_address: format!("10.0.0.{seed}"),
                port: 5000 + seed as i32,
                worker_id: WorkerID::from_binary(&[seed; 16]),
            }),
            ..Default::default()
        }
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_submit_requests_lease_and_completes_task() {
        let lease_client = MockLeaseClient::new(vec![Ok(granted_worker(9))]);
        let (submitter, finisher) = make_submitter(Arc::clone(&lease_client), default_options());

        let spec = TaskSpec {
            task_id: TaskID::from_random(),
            ..Default::default()
        };
        submitter.submit_task(spec.clone());
        settle().await;

        assert_eq!(submitter.num_tasks_submitted(), 1);
        assert_eq!(submitter.num_leases_requested(), 1);
        assert_eq!(finisher.completed.lock().clone(), vec![spec.task_id]);
        // Worker drained and returned, so nothing remains under the key.
        assert!(submitter.has_no_scheduling_key_entries());
        assert_eq!(lease_client.returned.lock().len(), 1);
        submitter.check_consistency();
    }

    #[tokio::test]
    async fn test_cancelled_before_resolution_never_enqueues() {
        let lease_client = MockLeaseClient::new(vec![]);
        let (submitter, finisher) = make_submitter(Arc::clone(&lease_client), default_options());

        // Seed the cancelled set the way a pre-resolution cancel would.
        let spec = TaskSpec {
            task_id: TaskID::from_random(),
            ..Default::default()
        };
        submitter.state.lock().cancelled_tasks.insert(spec.task_id);

        submitter.enqueue_resolved_task(spec.clone());
        settle().await;

        assert_eq!(
            finisher.failed.lock().clone(),
            vec![(spec.task_id, ErrorType::TaskCancelled)]
        );
        assert_eq!(lease_client.request_count.load(Ordering::Relaxed), 0);
        assert!(submitter.has_no_scheduling_key_entries());
    }

    #[tokio::test]
    async fn test_remote_cancel_without_connection_is_invalid() {
        let lease_client = MockLeaseClient::new(vec![]);
        let (submitter, _finisher) = make_submitter(lease_client, default_options());

        let addr = WorkerAddress {
            worker_id: WorkerID::from_random(),
            ..Default::default()
        };
        let result = submitter.cancel_remote_task(
            ObjectID::from_index(&TaskID::from_random(), 0),
            &addr,
            false,
            false,
        );
        assert!(result.unwrap_err().is_invalid());
    }
}
