// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Connection caches for raylet lease clients and leased-worker clients.
//!
//! Entries are shared `Arc` handles and are never evicted by the
//! submitter; lease entries hold clones for the lifetime of their lease.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use riptide_common::id::{NodeID, WorkerID};
use riptide_rpc::{Address, LeaseClient, WorkerAddress, WorkerClient};

/// Creates a lease client for a remote raylet on first contact.
pub type LeaseClientFactory = Box<dyn Fn(&Address) -> Arc<dyn LeaseClient> + Send + Sync>;

/// Creates an RPC client for a leased worker on first contact.
pub type WorkerClientFactory = Box<dyn Fn(&WorkerAddress) -> Arc<dyn WorkerClient> + Send + Sync>;

/// Caches lease clients per raylet, reusing one client for the local raylet.
pub struct LeaseClientPool {
    local_raylet_id: NodeID,
    local_client: Arc<dyn LeaseClient>,
    remote_clients: Mutex<HashMap<NodeID, Arc<dyn LeaseClient>>>,
    factory: LeaseClientFactory,
}

impl LeaseClientPool {
    pub fn new(
        local_raylet_id: NodeID,
        local_client: Arc<dyn LeaseClient>,
        factory: LeaseClientFactory,
    ) -> Self {
        Self {
            local_raylet_id,
            local_client,
            remote_clients: Mutex::new(HashMap::new()),
            factory,
        }
    }

    /// The client for the raylet on this node.
    pub fn local(&self) -> Arc<dyn LeaseClient> {
        Arc::clone(&self.local_client)
    }

    /// Get the lease client for `raylet_address`, connecting if needed.
    pub fn get_or_connect(&self, raylet_address: &Address) -> Arc<dyn LeaseClient> {
        if raylet_address.node_id == self.local_raylet_id {
            return self.local();
        }
        let mut remote_clients = self.remote_clients.lock();
        if let Some(client) = remote_clients.get(&raylet_address.node_id) {
            return Arc::clone(client);
        }
        tracing::info!(raylet = %raylet_address.node_id, "connecting to raylet");
        let client = (self.factory)(raylet_address);
        remote_clients.insert(raylet_address.node_id, Arc::clone(&client));
        client
    }

    /// Number of cached remote raylet connections.
    pub fn num_remote_clients(&self) -> usize {
        self.remote_clients.lock().len()
    }
}

/// Caches RPC clients to leased workers, keyed by worker id.
pub struct WorkerClientCache {
    clients: Mutex<HashMap<WorkerID, Arc<dyn WorkerClient>>>,
    factory: WorkerClientFactory,
}

impl WorkerClientCache {
    pub fn new(factory: WorkerClientFactory) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            factory,
        }
    }

    /// Get the client for `addr`, connecting if needed.
    pub fn get_or_connect(&self, addr: &WorkerAddress) -> Arc<dyn WorkerClient> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&addr.worker_id) {
            return Arc::clone(client);
        }
        let client = (self.factory)(addr);
        clients.insert(addr.worker_id, Arc::clone(&client));
        client
    }

    /// Look up an already-connected client. Never creates a connection.
    pub fn get_by_id(&self, worker_id: &WorkerID) -> Option<Arc<dyn WorkerClient>> {
        self.clients.lock().get(worker_id).cloned()
    }

    /// Number of cached worker connections.
    pub fn num_clients(&self) -> usize {
        self.clients.lock().len()
    }
}
