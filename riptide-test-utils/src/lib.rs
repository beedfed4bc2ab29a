// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities for riptide: fake RPC clients with test-controllable
//! replies, a recording task finisher, and async wait helpers.

pub mod fakes;
pub mod wait;

pub use fakes::{
    FakeActorCreator, FakeLeaseClient, FakeWorkerClient, FakeWorkerClientRegistry,
    RecordingTaskFinisher,
};
pub use wait::wait_for_condition;
