// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Node selection for new lease requests.

use riptide_rpc::{Address, TaskSpec};

/// Picks the raylet to ask for the next worker lease.
pub trait LeasePolicy: Send + Sync {
    fn get_best_node_for_task(&self, resource_spec: &TaskSpec) -> Address;
}

/// Always leases from the local raylet, deferring placement decisions to
/// the cluster-side scheduler via spillback.
pub struct LocalLeasePolicy {
    local_raylet_address: Address,
}

impl LocalLeasePolicy {
    pub fn new(local_raylet_address: Address) -> Self {
        Self {
            local_raylet_address,
        }
    }
}

impl LeasePolicy for LocalLeasePolicy {
    fn get_best_node_for_task(&self, _resource_spec: &TaskSpec) -> Address {
        self.local_raylet_address.clone()
    }
}
