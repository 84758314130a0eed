//! Host cache.
//!
//! Holds the flat, hostname-sorted collection of monitored hosts and the
//! position index used to deduplicate ingestion and to look hosts up by id.  The backend is only
//! consulted by [`HostCache::create`], [`HostCache::remove`] and
//! [`HostCache::refresh`]; the table itself is mutated after the backend
//! call has succeeded, so a failed call leaves the cache untouched.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::backend::Backend;
use crate::error::Result;
use crate::render::HostLookup;
use crate::types::{Host, HostId, NewHost};

/// The ordered host collection together with its position index.
///
/// A host is in `hosts` iff its id is in `index`, exactly once, and
/// `index[id]` is its position in `hosts`.
#[derive(Debug, Default)]
pub struct HostTable {
    hosts: Vec<Host>,
    index: HashMap<HostId, usize>,
}

impl HostTable {
    /// Add the records whose identity has not been seen yet and re-sort by
    /// hostname.  The first record seen for an identity wins, including
    /// duplicates within the same batch.  Returns the number added.
    pub fn ingest<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = Host>,
    {
        let before = self.hosts.len();
        for host in records {
            if let Entry::Vacant(slot) = self.index.entry(host.id) {
                slot.insert(self.hosts.len());
                self.hosts.push(host);
            }
        }
        let added = self.hosts.len() - before;
        if added > 0 {
            self.hosts.sort_by(|a, b| a.hostname.cmp(&b.hostname));
            self.reindex();
        }
        added
    }

    /// Drop a record and its index entry.
    pub fn remove(&mut self, id: HostId) -> Option<Host> {
        let pos = self.index.remove(&id)?;
        let host = self.hosts.remove(pos);
        self.reindex();
        Some(host)
    }

    fn reindex(&mut self) {
        for (pos, host) in self.hosts.iter().enumerate() {
            self.index.insert(host.id, pos);
        }
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn get(&self, id: HostId) -> Option<&Host> {
        self.index.get(&id).map(|&pos| &self.hosts[pos])
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }
}

impl HostLookup for HostTable {
    fn lookup_host(&self, id: HostId) -> Option<&Host> {
        self.get(id)
    }
}

pub struct HostCache {
    backend: Arc<dyn Backend>,
    table: RwLock<HostTable>,
}

impl HostCache {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            table: RwLock::new(HostTable::default()),
        }
    }

    pub async fn ingest(&self, records: Vec<Host>) -> usize {
        let offered = records.len();
        let mut table = self.table.write().await;
        let added = table.ingest(records);
        debug!(
            "Ingested {} of {} host records, {} cached",
            added,
            offered,
            table.len()
        );
        added
    }

    /// Create a host on the backend and ingest the returned record.
    pub async fn create(&self, new_host: &NewHost) -> Result<Host> {
        let host = self.backend.create_host(new_host).await?;
        self.ingest(vec![host.clone()]).await;
        Ok(host)
    }

    /// Delete a host on the backend, then purge it from the cache.
    pub async fn remove(&self, id: HostId) -> Result<()> {
        self.backend.delete_host(id).await?;
        if self.table.write().await.remove(id).is_none() {
            debug!("Deleted host {} was not cached", id);
        }
        Ok(())
    }

    /// Fetch the full host list and ingest it.
    pub async fn refresh(&self) -> Result<usize> {
        let hosts = self.backend.list_hosts().await?;
        Ok(self.ingest(hosts).await)
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, HostTable> {
        self.table.read().await
    }
}
