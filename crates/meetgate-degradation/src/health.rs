//! Component health tracking.

use meetgate_core::unix_millis;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Health of one component, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The last call succeeded against upstream.
    Healthy,
    /// Upstream failed but a cached or fallback value was served.
    PartiallyDegraded,
    /// Upstream failed and a critical fallback failed too.
    SeverelyDegraded,
    /// Nothing could be served.
    Unavailable,
}

impl HealthStatus {
    /// Whether callers still get data in this state.
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            HealthStatus::Healthy | HealthStatus::PartiallyDegraded
        )
    }

    /// Whether this is [`HealthStatus::Healthy`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// A stable lowercase name for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::PartiallyDegraded => "partially_degraded",
            HealthStatus::SeverelyDegraded => "severely_degraded",
            HealthStatus::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health record of one operation or component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradationRecord {
    /// Component (operation) name.
    pub name: String,
    /// Current status.
    pub status: HealthStatus,
    /// When the record was last updated, in milliseconds since the Unix epoch.
    pub last_check: u64,
    /// Consecutive failed upstream attempts.
    pub error_count: u32,
    /// Description of the last degradation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DegradationRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Healthy,
            last_check: unix_millis(),
            error_count: 0,
            message: None,
        }
    }
}

/// Health of the whole system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// The worst status of any component; healthy when nothing is tracked.
    pub overall: HealthStatus,
    /// Every tracked component, sorted by name.
    pub components: Vec<DegradationRecord>,
}

impl HealthReport {
    /// HTTP status for a health endpoint: 503 when unavailable, otherwise 200.
    pub fn http_status(&self) -> u16 {
        match self.overall {
            HealthStatus::Unavailable => 503,
            _ => 200,
        }
    }
}

/// Per-component health records.
#[derive(Debug, Default)]
pub(crate) struct HealthRegistry {
    records: Mutex<HashMap<String, DegradationRecord>>,
}

impl HealthRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, DegradationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts one failed upstream attempt.
    pub(crate) fn record_error(&self, name: &str, message: String) {
        let mut records = self.lock();
        let record = records
            .entry(name.to_string())
            .or_insert_with(|| DegradationRecord::new(name));
        record.error_count = record.error_count.saturating_add(1);
        record.last_check = unix_millis();
        record.message = Some(message);
    }

    /// Sets the status of `name`, returning the previous one.
    pub(crate) fn set_status(
        &self,
        name: &str,
        status: HealthStatus,
        message: Option<String>,
    ) -> HealthStatus {
        let mut records = self.lock();
        let record = records
            .entry(name.to_string())
            .or_insert_with(|| DegradationRecord::new(name));
        let previous = record.status;
        record.status = status;
        record.last_check = unix_millis();
        if status == HealthStatus::Healthy {
            record.error_count = 0;
            record.message = None;
        } else if message.is_some() {
            record.message = message;
        }
        previous
    }

    pub(crate) fn get(&self, name: &str) -> Option<DegradationRecord> {
        self.lock().get(name).cloned()
    }

    pub(crate) fn report(&self) -> HealthReport {
        let mut components: Vec<DegradationRecord> = self.lock().values().cloned().collect();
        components.sort_by(|a, b| a.name.cmp(&b.name));
        let overall = components
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        HealthReport {
            overall,
            components,
        }
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }
}
