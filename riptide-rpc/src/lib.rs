// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! RPC surface of the task submitter.
//!
//! Message types exchanged with raylets and leased workers, plus the two
//! async client traits the submitter drives: [`LeaseClient`] (one per
//! raylet) and [`WorkerClient`] (one per leased worker). Transport
//! implementations live with the embedding process; the traits use
//! `tonic::Status` as the transport error type.

pub mod lease;
pub mod messages;
pub mod worker;

pub use lease::LeaseClient;
pub use messages::*;
pub use worker::WorkerClient;
