//! Markup for the host table and the label tree.
//!
//! Rendering is pure: it reads a snapshot of the caches and returns HTML
//! fragments for the view to place into its containers.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::Write;

use crate::hierarchy::{LabelNode, LabelTree};
use crate::types::{Host, HostId, LabelId};

/// Container holding the host table rows.
pub const TABLE_CONTAINER: &str = "data_table";
/// Container holding the top level of the label tree.
pub const TREE_CONTAINER: &str = "data_list";

/// Read-only access to host records, used by tree nodes that show the
/// status of their associated host.
pub trait HostLookup {
    fn lookup_host(&self, id: HostId) -> Option<&Host>;
}

/// Name of the placeholder container that receives a node's children.
pub fn children_container(id: LabelId) -> String {
    if id.is_root() {
        TREE_CONTAINER.to_string()
    } else {
        format!("label_{id}_children")
    }
}

pub fn host_table(hosts: &[Host]) -> String {
    hosts.iter().map(host_row).collect()
}

fn host_row(host: &Host) -> String {
    format!(
        concat!(
            "<tr data-host-id=\"{id}\">",
            "<td>{hostname}</td>",
            "<td>{ttl}</td>",
            "<td>{resolved}</td>",
            "<td>{error}</td>",
            "<td class=\"delete-icon\">",
            "<button type=\"button\" data-action=\"delete\" data-host-id=\"{id}\">delete</button>",
            "</td>",
            "</tr>\n",
        ),
        id = host.id,
        hostname = escape(&host.hostname),
        ttl = host.ttl,
        resolved = escape(host.resolved_at.as_deref().unwrap_or_default()),
        error = escape(host.error_message.as_deref().unwrap_or_default()),
    )
}

fn status_panel(host: &Host) -> String {
    format!(
        concat!(
            "<div class=\"host-status\">",
            "<strong>TTL: </strong>{ttl}<br />",
            "<strong>Last Resolved At: </strong>{resolved}<br />",
            "<strong>Error: </strong>{error}<br />",
            "</div>",
        ),
        ttl = host.ttl,
        resolved = escape(host.resolved_at.as_deref().unwrap_or_default()),
        error = escape(host.error_message.as_deref().unwrap_or_default()),
    )
}

/// One collapsible entry per child of `parent`.
///
/// Children listed in `open` that are already expanded are rendered open,
/// with their own children nested, so re-rendering a container does not
/// collapse branches the user has open.  Returns an empty string when
/// `parent` has not been expanded.
pub fn label_entries(
    tree: &LabelTree,
    parent: LabelId,
    hosts: &dyn HostLookup,
    open: &HashSet<LabelId>,
) -> String {
    let mut out = String::new();
    if let Some(children) = tree.children(parent) {
        for child in children {
            label_entry(&mut out, tree, child, hosts, open);
        }
    }
    out
}

fn label_entry(
    out: &mut String,
    tree: &LabelTree,
    node: &LabelNode,
    hosts: &dyn HostLookup,
    open: &HashSet<LabelId>,
) {
    let id = node.id();
    let is_open = open.contains(&id) && node.is_expanded();
    let status = node
        .label
        .hostname_id
        .and_then(|host_id| hosts.lookup_host(host_id))
        .map(status_panel)
        .unwrap_or_default();
    let nested = if is_open {
        label_entries(tree, id, hosts, open)
    } else {
        String::new()
    };

    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        concat!(
            "<li><details data-label-id=\"{id}\"{open}>",
            "<summary data-action=\"open\" data-label-id=\"{id}\">{name}</summary>",
            "{status}",
            "<ul id=\"{container}\">{nested}</ul>",
            "</details></li>",
        ),
        id = id,
        open = if is_open { " open" } else { "" },
        name = escape(&node.label.name),
        status = status,
        container = children_container(id),
        nested = nested,
    );
}

fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
