use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Host, HostId, Label, LabelId, NewHost};

pub mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpBackend;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Create a monitored host and return the stored record.
    async fn create_host(&self, host: &NewHost) -> Result<Host>;

    /// Delete a monitored host.  Only success or failure is relied upon.
    async fn delete_host(&self, id: HostId) -> Result<()>;

    /// List the full current set of monitored hosts.
    async fn list_hosts(&self) -> Result<Vec<Host>>;

    /// List the direct children of a label. [`LabelId::ROOT`] lists the
    /// top level of the tree.
    async fn label_children(&self, id: LabelId) -> Result<Vec<Label>>;
}
