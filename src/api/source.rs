use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use isahc::{config::Configurable, AsyncReadResponseExt, Request, RequestExt};
use log::{log, Level};
use serde_json::Value;

use crate::schema::{model::Incident, source::IncidentRecord};

/// Where incidents come from. The HTTP implementation talks to the upstream
/// reports API; tests substitute their own.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    async fn fetch_incidents(&self) -> Result<Vec<Incident>, anyhow::Error>;

    /// Single-record lookup. `Ok(None)` means the upstream answered without data.
    async fn fetch_incident_direct(&self, id: u64) -> Result<Option<Incident>, anyhow::Error>;
}

pub struct HttpIncidentSource {
    base_url: String,
    timeout: Duration,
}

impl HttpIncidentSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    async fn get_json(&self, path: &str) -> Result<Option<Value>, anyhow::Error> {
        let url = format!("{}{path}", self.base_url);
        log!(Level::Debug, "GET {url}");
        let mut response = Request::get(url.as_str())
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .body(())?
            .send_async()
            .await?;

        if response.status() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!("GET {url} returned {}", response.status()));
        }
        let body: Value = response.json().await?;
        Ok(Some(body).filter(|value| !value.is_null()))
    }
}

#[async_trait]
impl IncidentSource for HttpIncidentSource {
    async fn fetch_incidents(&self) -> Result<Vec<Incident>, anyhow::Error> {
        let body = self
            .get_json("/reports")
            .await?
            .ok_or_else(|| anyhow!("Upstream returned no reports"))?;
        let records: Vec<IncidentRecord> = serde_json::from_value(body)?;
        let now = Utc::now();
        Ok(records
            .into_iter()
            .map(|record| record.into_incident(now))
            .collect())
    }

    async fn fetch_incident_direct(&self, id: u64) -> Result<Option<Incident>, anyhow::Error> {
        match self.get_json(&format!("/reports/{id}")).await? {
            Some(body) => {
                let record: IncidentRecord = serde_json::from_value(body)?;
                Ok(Some(record.into_incident(Utc::now())))
            }
            None => Ok(None),
        }
    }
}

/// Looks an incident up by id, falling back to scanning the full list when the
/// single-record endpoint fails or has nothing. Errors only if the fallback
/// fails too.
pub async fn fetch_incident(
    source: &dyn IncidentSource,
    id: u64,
) -> Result<Option<Incident>, anyhow::Error> {
    match source.fetch_incident_direct(id).await {
        Ok(Some(incident)) => return Ok(Some(incident)),
        Ok(None) => log!(Level::Debug, "No direct record for incident {id}"),
        Err(e) => log!(Level::Warn, "Error fetching incident {id}: {e}"),
    }

    match source.fetch_incidents().await {
        Ok(incidents) => Ok(incidents.into_iter().find(|incident| incident.id == id)),
        Err(e) => {
            log!(Level::Error, "Fallback fetch for incident {id} failed: {e}");
            Err(e)
        }
    }
}
