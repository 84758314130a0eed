//! User interactions delivered to the session.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::{HostId, LabelId};
use crate::view::ViewKind;

/// One user interaction.
///
/// The binary reads these as one command per line:
///
/// ```text
/// create <hostname> <ttl>
/// delete <host-id>
/// open <label-id>
/// close <label-id>
/// view <table|tree>
/// refresh
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Submit the new-host form.
    CreateHost { hostname: String, ttl: u32 },
    /// Delete affordance on a table row.
    DeleteHost(HostId),
    /// Open a tree node, expanding it on first open.
    Open(LabelId),
    /// Collapse a tree node.  Cached children are kept.
    Close(LabelId),
    /// Re-fetch the host list.
    Refresh,
    /// Select the visible view container.
    SwitchView(ViewKind),
}

impl FromStr for UiEvent {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let command = words
            .next()
            .ok_or_else(|| Error::InvalidCommand("empty command".into()))?;
        let args: Vec<&str> = words.collect();

        let event = match (command, args.as_slice()) {
            ("create", [hostname, ttl]) => UiEvent::CreateHost {
                hostname: hostname.to_string(),
                ttl: parse_number(ttl)?,
            },
            ("delete", [id]) => UiEvent::DeleteHost(HostId(parse_number(id)?)),
            ("open", [id]) => UiEvent::Open(LabelId(parse_number(id)?)),
            ("close", [id]) => UiEvent::Close(LabelId(parse_number(id)?)),
            ("view", [kind]) => UiEvent::SwitchView(kind.parse()?),
            ("refresh", []) => UiEvent::Refresh,
            _ => return Err(Error::InvalidCommand(line.trim().to_string())),
        };
        Ok(event)
    }
}

fn parse_number<T: FromStr>(word: &str) -> Result<T> {
    word.parse()
        .map_err(|_| Error::InvalidCommand(format!("expected a number, got {word:?}")))
}
