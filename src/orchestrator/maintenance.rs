//! Maintenance window state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator-declared maintenance, attached to composite reports while enabled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub enabled: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl MaintenanceWindow {
    pub fn new(
        enabled: bool,
        message: impl Into<String>,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            enabled,
            message: message.into(),
            start_time,
            end_time,
        }
    }

    /// The window as it should appear in a report, if at all
    pub fn active(&self) -> Option<&Self> {
        self.enabled.then_some(self)
    }
}
