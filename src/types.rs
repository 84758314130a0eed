//! Data structures shared by the caches, the backend and the view.
//!
//! Records are deserialised from the backend's JSON with
//! [`serde`](https://serde.rs/).  Identities are opaque to the client:
//! they are only compared, hashed and echoed back to the backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowest TTL the backend accepts for a monitored host.
pub const MIN_TTL: u32 = 60;

/// Server-assigned identity of a monitored host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(pub u64);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Server-assigned identity of a label node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub u64);

impl LabelId {
    /// Sentinel identity of the tree root, which is not itself a label.
    pub const ROOT: LabelId = LabelId(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A monitored hostname as reported by the backend.
///
/// `resolved_at` stays in the backend's textual form; the client only
/// displays it.  `error_message` is set when the latest resolution attempt
/// failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub hostname: String,
    pub ttl: u32,
    #[serde(default)]
    pub resolved_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Body of a create-host request, validated before it leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewHost {
    pub hostname: String,
    pub ttl: u32,
}

impl NewHost {
    pub fn new(hostname: &str, ttl: u32) -> Result<Self> {
        if ttl < MIN_TTL {
            return Err(Error::InvalidHost(format!("ttl must be at least {MIN_TTL}")));
        }

        // A trailing dot leaves an empty final label and is rejected.
        if !is_valid_hostname(hostname) {
            return Err(Error::InvalidHost(format!("invalid hostname {hostname:?}")));
        }

        Ok(Self {
            hostname: hostname.to_string(),
            ttl,
        })
    }
}

fn is_valid_hostname(hostname: &str) -> bool {
    !hostname.is_empty()
        && hostname.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

/// A label as returned by the children endpoint.
///
/// `hostname_id` is set when the label is the leaf for a monitored host;
/// pure category labels (domain suffixes) carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    #[serde(default)]
    pub hostname_id: Option<HostId>,
}
