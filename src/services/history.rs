//! Recent activity ring buffer
//!
//! One bounded deque per tenant, each behind its own lock so that appends in
//! different tenants never contend. When a tenant's deque is full the oldest
//! entry is evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::HistoryEntry;

type TenantBuffer = Arc<Mutex<VecDeque<HistoryEntry>>>;

#[derive(Debug)]
pub struct HistoryBuffer {
    capacity: usize,
    tenants: Mutex<HashMap<String, TenantBuffer>>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tenants: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn buffer(&self, tenant_id: &str) -> TenantBuffer {
        self.tenants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::with_capacity(self.capacity))))
            .clone()
    }

    /// Append an entry, evicting the oldest one once the tenant is at capacity
    pub fn record(&self, entry: HistoryEntry) {
        let buffer = self.buffer(&entry.tenant_id);
        let mut deque = buffer.lock().unwrap_or_else(PoisonError::into_inner);
        while deque.len() >= self.capacity {
            deque.pop_front();
        }
        deque.push_back(entry);
    }

    /// Up to `limit` entries of a tenant, newest first
    pub fn recent(&self, tenant_id: &str, limit: usize) -> Vec<HistoryEntry> {
        let buffer = match self
            .tenants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant_id)
        {
            Some(buffer) => buffer.clone(),
            None => return Vec::new(),
        };
        let deque = buffer.lock().unwrap_or_else(PoisonError::into_inner);
        deque.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self, tenant_id: &str) -> usize {
        self.tenants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant_id)
            .map(|buffer| buffer.lock().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }
}
