use std::time::Duration;

use async_trait::async_trait;

use super::Lookup;
use crate::error::LookupError;
use crate::identifier::WaybillKey;
use crate::model::ShipmentRecord;

/// Looks waybills up through a JSON tracking gateway.
///
/// Issues `GET {endpoint}?prefix=..&number=..` and expects a JSON object with
/// the [`ShipmentRecord`] fields; missing fields stay `None`.
pub struct HttpLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLookup {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Lookup for HttpLookup {
    async fn lookup(&self, key: &WaybillKey) -> Result<ShipmentRecord, LookupError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("prefix", key.prefix.as_str()), ("number", key.number.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| LookupError::Decode(e.to_string()))
    }
}
