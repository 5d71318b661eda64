//! Webhook event entity.

use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum stored length of `last_delivery_status`.
pub const LAST_DELIVERY_STATUS_MAX_LEN: usize = 255;

/// Webhook event types.
///
/// The string values are both the database representation and the `type`
/// field of the outbound payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(64))")]
pub enum EventType {
    #[sea_orm(string_value = "form.submitted")]
    #[serde(rename = "form.submitted")]
    FormSubmitted,
    #[sea_orm(string_value = "team.plan_changed")]
    #[serde(rename = "team.plan_changed")]
    TeamPlanChanged,
    #[sea_orm(string_value = "form.deleted")]
    #[serde(rename = "form.deleted")]
    FormDeleted,
    #[sea_orm(string_value = "visitor.session")]
    #[serde(rename = "visitor.session")]
    VisitorSession,
}

impl EventType {
    /// Wire name of the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FormSubmitted => "form.submitted",
            Self::TeamPlanChanged => "team.plan_changed",
            Self::FormDeleted => "form.deleted",
            Self::VisitorSession => "visitor.session",
        }
    }

    /// All event types.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [
            Self::FormSubmitted,
            Self::TeamPlanChanged,
            Self::FormDeleted,
            Self::VisitorSession,
        ]
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown event type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// Webhook event model.
///
/// An immutable record of a business fact relayed to a tenant endpoint. Only
/// `delivered`, `delivery_attempts` and `last_delivery_status` change after
/// creation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_event")]
pub struct Model {
    /// Unique identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// What happened.
    pub event_type: EventType,

    /// When the event was created (UTC, microsecond precision).
    pub created_at: DateTimeUtc,

    /// Team the event belongs to.
    pub team_id: String,

    /// Site the event belongs to, if any.
    #[sea_orm(nullable)]
    pub site_id: Option<String>,

    /// Event-specific payload.
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,

    /// Whether any attempt got a response with status < 400.
    #[sea_orm(default_value = false)]
    pub delivered: bool,

    /// Number of delivery attempts made.
    #[sea_orm(default_value = 0)]
    pub delivery_attempts: i32,

    /// Summary of the most recent attempt.
    #[sea_orm(nullable)]
    pub last_delivery_status: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_parse_round_trip() {
        for event_type in EventType::all() {
            assert_eq!(event_type.as_str().parse::<EventType>(), Ok(event_type));
        }
    }

    #[test]
    fn test_event_type_rejects_unknown() {
        assert_eq!(
            "form.exploded".parse::<EventType>(),
            Err(UnknownEventType("form.exploded".to_string()))
        );
        // Variant names are not wire names
        assert!("FormSubmitted".parse::<EventType>().is_err());
    }

    #[test]
    fn test_event_type_serializes_to_wire_name() {
        let json = serde_json::to_string(&EventType::TeamPlanChanged).unwrap();
        assert_eq!(json, "\"team.plan_changed\"");
    }
}
