//! Notification type and urgency enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a notification is about. Stored in the `type` column as the
/// `notification_type` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// A new or escalated emergency case.
    Emergency,
    /// Appointment booking or change.
    Appointment,
    /// System maintenance or account messages.
    System,
    /// Operational alerts (bed capacity, ambulance availability).
    Alert,
}

impl NotificationType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Appointment => "appointment",
            Self::System => "system",
            Self::Alert => "alert",
        }
    }

    /// How prominently a notification of this type should be shown.
    pub fn urgency(&self) -> Urgency {
        match self {
            Self::Emergency => Urgency::Critical,
            Self::Alert => Urgency::High,
            Self::Appointment => Urgency::Normal,
            Self::System => Urgency::Low,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = carehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "emergency" => Ok(Self::Emergency),
            "appointment" => Ok(Self::Appointment),
            "system" => Ok(Self::System),
            "alert" => Ok(Self::Alert),
            _ => Err(carehub_core::AppError::validation(format!(
                "Invalid notification type: '{s}'. Expected one of: emergency, appointment, system, alert"
            ))),
        }
    }
}

/// Display urgency derived from the notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Background information.
    Low,
    /// Standard events.
    Normal,
    /// Needs attention soon.
    High,
    /// Needs attention immediately.
    Critical,
}

impl Urgency {
    /// Return the urgency as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Whether a toast of this urgency should stay until dismissed.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
