// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Client-side task submission for the riptide runtime.
//!
//! A driver or worker process submits tasks through the
//! [`DirectTaskSubmitter`], which batches them by scheduling key, leases
//! short-lived workers from raylets, pipelines pushes to each leased
//! worker, balances load by stealing tasks between leased workers of the
//! same key, and coordinates cancellation.

pub mod actor_creator;
pub mod client_cache;
pub mod dependency_resolver;
pub mod direct_task_submitter;
pub mod lease_policy;
pub mod options;
pub mod scheduling_key;
pub mod task_finisher;

pub use direct_task_submitter::DirectTaskSubmitter;
pub use options::{SubmitterOptions, WorkerType};
pub use scheduling_key::SchedulingKey;
