use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::Config;
use crate::error::FetchError;
use crate::models::{Device, DeviceList, LogEntry, LogList};

/// Where the poller gets its two collections from.
pub trait FleetSource: Send + Sync + 'static {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>, FetchError>> + Send;

    fn list_logs(&self, limit: usize) -> impl Future<Output = Result<Vec<LogEntry>, FetchError>> + Send;
}

/// Read-only HTTP client for the device monitoring service
#[derive(Clone, Debug)]
pub struct DataClient {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl DataClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_get(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        let resp = self.client.get(url).query(query).send().await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status()));
        }

        Ok(resp.text().await?)
    }

    // GET a body, bounded by the request timeout as a whole
    async fn get_body(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        match timeout(self.request_timeout, self.send_get(url, query)).await {
            Ok(res) => res,
            Err(_) => Err(FetchError::Timeout(self.request_timeout)),
        }
    }

    async fn fetch_devices(&self) -> Result<Vec<Device>, FetchError> {
        let url = format!("{}/api/devices/list", self.base_url);
        let body = self.get_body(&url, &[]).await?;
        let parsed: DeviceList = serde_json::from_str(&body)?;
        Ok(parsed.devices.unwrap_or_default())
    }

    async fn fetch_logs(&self, limit: usize) -> Result<Vec<LogEntry>, FetchError> {
        let url = format!("{}/api/devices/logs", self.base_url);
        let body = self.get_body(&url, &[("limit", limit.to_string())]).await?;
        let parsed: LogList = serde_json::from_str(&body)?;
        Ok(parsed.logs.unwrap_or_default())
    }
}

impl FleetSource for DataClient {
    async fn list_devices(&self) -> Result<Vec<Device>, FetchError> {
        let res = self.fetch_devices().await;
        match &res {
            Ok(devices) => log::debug!("Fetched {} devices", devices.len()),
            Err(e) => log::warn!("Error fetching devices: {}", e),
        }
        res
    }

    async fn list_logs(&self, limit: usize) -> Result<Vec<LogEntry>, FetchError> {
        let res = self.fetch_logs(limit).await;
        match &res {
            Ok(logs) => log::debug!("Fetched {} log entries (limit {})", logs.len(), limit),
            Err(e) => log::warn!("Error fetching logs: {}", e),
        }
        res
    }
}
