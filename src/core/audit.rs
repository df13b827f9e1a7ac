//! Audit record captured at request intake.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Who asked for what, and when. Created once per request, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub client_address: String,
    /// RFC 3339, UTC, millisecond precision, `Z` suffix
    pub request_timestamp: String,
    pub resource_locator: Option<String>,
}

impl AuditRecord {
    /// Captures a record for the current instant and logs it.
    pub fn capture(client_address: impl Into<String>, resource_locator: Option<String>) -> Self {
        Self::at(Utc::now(), client_address, resource_locator)
    }

    pub fn at(timestamp: DateTime<Utc>, client_address: impl Into<String>, resource_locator: Option<String>) -> Self {
        let record = Self {
            client_address: client_address.into(),
            request_timestamp: format_timestamp(timestamp),
            resource_locator,
        };
        log::info!(
            "[AUDIT] client={} time={} url={}",
            record.client_address,
            record.request_timestamp,
            record.resource_locator.as_deref().unwrap_or("<none>")
        );
        record
    }
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
