use crate::errors::ValidationError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;

// ============================================================================
// Schedule Models
// ============================================================================

/// When the scheduler should run an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleTiming {
    /// Runs whenever the current hour and minute are both in the sets
    Recurring {
        hours: BTreeSet<u8>,
        minutes: BTreeSet<u8>,
    },
    /// One-shot marker; older scheduler builds reject it
    Immediate,
}

impl ScheduleTiming {
    /// Once a day at `hour:minute`
    pub fn daily(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        Self::recurring([hour], [minute])
    }

    pub fn recurring(
        hours: impl IntoIterator<Item = u8>,
        minutes: impl IntoIterator<Item = u8>,
    ) -> Result<Self, ValidationError> {
        let hours: BTreeSet<u8> = hours.into_iter().collect();
        let minutes: BTreeSet<u8> = minutes.into_iter().collect();

        if hours.is_empty() {
            return Err(ValidationError::MissingField("hours".to_string()));
        }
        if minutes.is_empty() {
            return Err(ValidationError::MissingField("minutes".to_string()));
        }
        if let Some(h) = hours.iter().find(|h| **h > 23) {
            return Err(ValidationError::InvalidFieldValue {
                field: "hour".to_string(),
                reason: format!("{} is outside 0-23", h),
            });
        }
        if let Some(m) = minutes.iter().find(|m| **m > 59) {
            return Err(ValidationError::InvalidFieldValue {
                field: "minute".to_string(),
                reason: format!("{} is outside 0-59", m),
            });
        }

        Ok(ScheduleTiming::Recurring { hours, minutes })
    }

    /// Human readable summary, e.g. `09:00 daily`
    pub fn describe(&self) -> String {
        match self {
            ScheduleTiming::Immediate => "now".to_string(),
            ScheduleTiming::Recurring { hours, minutes } => {
                if hours.len() == 1 && minutes.len() == 1 {
                    let h = hours.iter().next().copied().unwrap_or_default();
                    let m = minutes.iter().next().copied().unwrap_or_default();
                    format!("{:02}:{:02} daily", h, m)
                } else {
                    format!("hours {:?}, minutes {:?}", hours, minutes)
                }
            }
        }
    }
}

// The scheduler rejects scalar timing fields, so hours and minutes are
// always written as lists even when they hold a single value.
impl Serialize for ScheduleTiming {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScheduleTiming::Immediate => serializer.serialize_str("now"),
            ScheduleTiming::Recurring { hours, minutes } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("hours", &hours.iter().collect::<Vec<_>>())?;
                map.serialize_entry("minutes", &minutes.iter().collect::<Vec<_>>())?;
                map.end()
            }
        }
    }
}

// ============================================================================
// Event Models
// ============================================================================

/// Wrap a composed command into the script body run by the shell plugin
pub fn script_body(command: &str) -> String {
    format!("#!/bin/sh\nset -e\n{}\n", command)
}

/// Parameters passed to the scheduler's inline shell plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventParams {
    pub script: String,
}

/// Request body for the scheduler's create-event endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRequest {
    pub title: String,
    #[serde(serialize_with = "serialize_flag")]
    pub enabled: bool,
    pub category: String,
    #[serde(rename = "plugin")]
    pub plugin_id: String,
    #[serde(rename = "target")]
    pub target_host: String,
    pub timezone: String,
    pub timing: ScheduleTiming,
    pub params: EventParams,
}

// The scheduler stores flags as 1/0
fn serialize_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// Scheduler-wide defaults applied to every event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefaults {
    pub category: String,
    pub plugin_id: String,
    pub target_host: String,
    pub timezone: String,
}

impl EventRequest {
    pub fn new(
        defaults: &EventDefaults,
        title: impl Into<String>,
        command: &str,
        timing: ScheduleTiming,
    ) -> Self {
        Self {
            title: title.into(),
            enabled: true,
            category: defaults.category.clone(),
            plugin_id: defaults.plugin_id.clone(),
            target_host: defaults.target_host.clone(),
            timezone: defaults.timezone.clone(),
            timing,
            params: EventParams {
                script: script_body(command),
            },
        }
    }

    pub fn script_body(&self) -> &str {
        &self.params.script
    }
}

/// Raw JSON object returned by the scheduler
///
/// Only the status code field is dependable across scheduler versions; the
/// event identifier is found with [`crate::normalizer::extract_event_id`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventResponse(pub serde_json::Map<String, serde_json::Value>);

impl EventResponse {
    /// Numeric application status code; only `0` means success
    pub fn code(&self) -> Option<i64> {
        self.0.get("code")?.as_i64()
    }

    pub fn is_success(&self) -> bool {
        self.code() == Some(0)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        serde_json::Value::Object(self.0)
    }
}

impl TryFrom<serde_json::Value> for EventResponse {
    type Error = serde_json::Value;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Object(map) => Ok(EventResponse(map)),
            other => Err(other),
        }
    }
}

/// Outcome of a scheduler health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub reachable: bool,
    pub message: String,
}

impl HealthStatus {
    pub fn reachable(message: impl Into<String>) -> Self {
        Self {
            reachable: true,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            reachable: false,
            message: message.into(),
        }
    }
}

// ============================================================================
// User Models
// ============================================================================

/// An authenticated portal user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub first: String,
    pub last: String,
}

impl Identity {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

/// Credentials submitted on the login form
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub first: String,
    pub last: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("first", &self.first)
            .field("last", &self.last)
            .field("password", &"***")
            .finish()
    }
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub first: String,
    pub last: String,
    pub exp: i64,
    pub iat: i64,
}
