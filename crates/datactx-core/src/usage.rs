//! Anonymised usage statistics
//!
//! Events are recorded in memory and logged at debug level. Names that could
//! identify a project are hashed with the context id as salt.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageEvent {
    pub event: String,
    pub event_time: DateTime<Utc>,
    pub data_context_id: String,
    pub data_context_instance_id: String,
    pub event_payload: Value,
    pub success: bool,
}

/// Hashes names with a per-context salt.
#[derive(Debug, Clone)]
pub struct Anonymizer {
    salt: String,
}

impl Anonymizer {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    pub fn anonymize(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(value.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

#[derive(Debug)]
pub struct UsageStatisticsHandler {
    data_context_id: String,
    instance_id: String,
    usage_statistics_url: Option<String>,
    anonymizer: Anonymizer,
    events: RefCell<Vec<UsageEvent>>,
}

impl UsageStatisticsHandler {
    pub fn new(data_context_id: impl Into<String>, instance_id: impl Into<String>, usage_statistics_url: Option<String>) -> Self {
        let data_context_id = data_context_id.into();
        Self {
            anonymizer: Anonymizer::new(data_context_id.clone()),
            data_context_id,
            instance_id: instance_id.into(),
            usage_statistics_url,
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn data_context_id(&self) -> &str {
        &self.data_context_id
    }

    pub fn usage_statistics_url(&self) -> Option<&str> {
        self.usage_statistics_url.as_deref()
    }

    pub fn anonymize(&self, value: &str) -> String {
        self.anonymizer.anonymize(value)
    }

    pub fn record(&self, event: &str, event_payload: Value, success: bool) {
        let event = UsageEvent {
            event: event.to_string(),
            event_time: Utc::now(),
            data_context_id: self.data_context_id.clone(),
            data_context_instance_id: self.instance_id.clone(),
            event_payload,
            success,
        };
        tracing::debug!(event = %event.event, success, payload = %event.event_payload, "Usage statistics event");
        self.events.borrow_mut().push(event);
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<UsageEvent> {
        self.events.borrow().clone()
    }
}
