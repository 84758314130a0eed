//! Output side of the session: named containers whose contents are
//! replaced wholesale with rendered markup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Container shown until bootstrap has finished.
pub const LOADING_CONTAINER: &str = "view_loading";

#[async_trait]
pub trait View: Send + Sync {
    /// Replace the contents of `container` with `markup`.
    async fn replace(&self, container: &str, markup: &str) -> Result<()>;

    async fn set_hidden(&self, container: &str, hidden: bool) -> Result<()>;
}

/// The selectable top-level views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Table,
    Tree,
}

impl ViewKind {
    pub const ALL: [ViewKind; 2] = [ViewKind::Table, ViewKind::Tree];

    pub fn container(self) -> &'static str {
        match self {
            ViewKind::Table => "view_table",
            ViewKind::Tree => "view_tree",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::Table => f.write_str("table"),
            ViewKind::Tree => f.write_str("tree"),
        }
    }
}

impl FromStr for ViewKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(ViewKind::Table),
            "tree" => Ok(ViewKind::Tree),
            other => Err(Error::InvalidCommand(format!("unknown view {other:?}"))),
        }
    }
}

/// Writes every container to `<dir>/<container>.html` and the hidden flags
/// to `<dir>/visibility.json`.
pub struct HtmlDirView {
    dir: PathBuf,
    hidden: Mutex<BTreeMap<String, bool>>,
}

impl HtmlDirView {
    pub async fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            hidden: Mutex::new(BTreeMap::new()),
        })
    }
}

#[async_trait]
impl View for HtmlDirView {
    async fn replace(&self, container: &str, markup: &str) -> Result<()> {
        let path = self.dir.join(format!("{container}.html"));
        debug!("Writing {} bytes to {}", markup.len(), path.display());
        fs::write(path, markup).await?;
        Ok(())
    }

    async fn set_hidden(&self, container: &str, hidden: bool) -> Result<()> {
        let mut flags = self.hidden.lock().await;
        flags.insert(container.to_string(), hidden);
        let json = serde_json::to_vec_pretty(&*flags).map_err(std::io::Error::from)?;
        fs::write(self.dir.join("visibility.json"), json).await?;
        Ok(())
    }
}
