//! Resolving a waybill key to shipment fields.

mod http;

pub use http::HttpLookup;

use async_trait::async_trait;

use crate::error::LookupError;
use crate::identifier::WaybillKey;
use crate::model::ShipmentRecord;

/// One tracking lookup. Calls for the same job are never issued in parallel.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(&self, key: &WaybillKey) -> Result<ShipmentRecord, LookupError>;
}
