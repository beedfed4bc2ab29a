// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Interface to the actor creation subsystem.

use riptide_common::status::RiptideResult;
use riptide_rpc::{CreateActorReply, TaskSpec};

/// Routes actor-creation tasks through the cluster metadata service.
///
/// Actor creation bypasses the lease/push machinery entirely: once the
/// creation task's dependencies are resolved, the submitter hands it off
/// here and reports the outcome to the task finisher.
#[async_trait::async_trait]
pub trait ActorCreator: Send + Sync {
    async fn create_actor(&self, task_spec: TaskSpec) -> RiptideResult<CreateActorReply>;
}
