//! JSON-over-HTTP backend client.

use async_trait::async_trait;
use log::debug;
use reqwest::Url;
use serde::de::DeserializeOwned;

use super::Backend;
use crate::error::{Error, Result};
use crate::types::{Host, HostId, Label, LabelId, NewHost};

#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(&self, req: reqwest::RequestBuilder) -> Result<()> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_host(&self, host: &NewHost) -> Result<Host> {
        let url = self.url("api/host")?;
        debug!("POST {} {:?}", url, host);
        self.send_json(self.http.post(url).json(host)).await
    }

    async fn delete_host(&self, id: HostId) -> Result<()> {
        let url = self.url(&format!("api/host/{id}"))?;
        debug!("DELETE {}", url);
        self.send_empty(self.http.delete(url)).await
    }

    async fn list_hosts(&self) -> Result<Vec<Host>> {
        let url = self.url("api/hosts")?;
        debug!("GET {}", url);
        self.send_json(self.http.get(url)).await
    }

    async fn label_children(&self, id: LabelId) -> Result<Vec<Label>> {
        let url = self.url(&format!("api/label/{id}/children"))?;
        debug!("GET {}", url);
        self.send_json(self.http.get(url)).await
    }
}
