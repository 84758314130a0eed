use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::view::ViewKind;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the backend API.
    pub api_url: String,
    /// Directory receiving the rendered view containers.
    pub output_dir: PathBuf,
    pub initial_view: ViewKind,
    /// Capacity of the UI event channel.
    pub event_queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000/".into(),
            output_dir: PathBuf::from("prens-view"),
            initial_view: ViewKind::Table,
            event_queue: 64,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("prens.toml"))
            .merge(Json::file("prens.json"))
            .merge(Env::prefixed("PRENS_"))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config: Config = Self::figment()
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        if config.event_queue == 0 {
            anyhow::bail!("event_queue must be greater than zero");
        }

        Ok(config)
    }
}
