//! In-memory backend for cache and session tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::Backend;
use crate::error::{Error, Result};
use crate::types::{Host, HostId, Label, LabelId, NewHost};

pub fn host(id: u64, hostname: &str) -> Host {
    Host {
        id: HostId(id),
        hostname: hostname.to_string(),
        ttl: 300,
        resolved_at: None,
        error_message: None,
    }
}

pub fn label(id: u64, name: &str, host: Option<u64>) -> Label {
    Label {
        id: LabelId(id),
        name: name.to_string(),
        hostname_id: host.map(HostId),
    }
}

pub struct MockBackend {
    hosts: Mutex<Vec<Host>>,
    children: Mutex<HashMap<LabelId, Vec<Label>>>,
    children_calls: Mutex<HashMap<LabelId, usize>>,
    next_host_id: AtomicU64,
    create_calls: AtomicU64,
    failing: AtomicBool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            hosts: Mutex::new(Vec::new()),
            children: Mutex::new(HashMap::new()),
            children_calls: Mutex::new(HashMap::new()),
            next_host_id: AtomicU64::new(1),
            create_calls: AtomicU64::new(0),
            failing: AtomicBool::new(false),
        }
    }
}

impl MockBackend {
    pub fn with_hosts(self, hosts: Vec<Host>) -> Self {
        *self.hosts.lock().unwrap() = hosts;
        self
    }

    pub fn with_children(self, parent: u64, labels: Vec<Label>) -> Self {
        self.children
            .lock()
            .unwrap()
            .insert(LabelId(parent), labels);
        self
    }

    pub fn with_next_host_id(self, id: u64) -> Self {
        self.next_host_id.store(id, Ordering::SeqCst);
        self
    }

    /// Make every subsequent request fail with a 503.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn children_calls(&self, parent: u64) -> usize {
        self.children_calls
            .lock()
            .unwrap()
            .get(&LabelId(parent))
            .copied()
            .unwrap_or(0)
    }

    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn create_host(&self, new_host: &NewHost) -> Result<Host> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check()?;
        let id = self.next_host_id.fetch_add(1, Ordering::SeqCst);
        let record = Host {
            ttl: new_host.ttl,
            ..host(id, &new_host.hostname)
        };
        self.hosts.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn delete_host(&self, id: HostId) -> Result<()> {
        tokio::task::yield_now().await;
        self.check()?;
        self.hosts.lock().unwrap().retain(|h| h.id != id);
        Ok(())
    }

    async fn list_hosts(&self) -> Result<Vec<Host>> {
        tokio::task::yield_now().await;
        self.check()?;
        Ok(self.hosts.lock().unwrap().clone())
    }

    async fn label_children(&self, id: LabelId) -> Result<Vec<Label>> {
        *self.children_calls.lock().unwrap().entry(id).or_insert(0) += 1;
        // Suspend once so concurrent callers interleave at the fetch.
        tokio::task::yield_now().await;
        self.check()?;
        Ok(self
            .children
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}
