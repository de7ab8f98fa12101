//! The audit entry data model.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Geographic/ISP enrichment attached to a [`NetworkDetails`] by the GeoIP
/// resolver. All fields default to empty/zero when unresolved; each is
/// populated independently by whichever database handler resolves it
/// first, per the "first non-empty write wins" merge discipline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GeoIpRecord {
    pub continent_code: String,
    pub continent_name: String,
    pub country_code: String,
    pub country_name: String,
    pub city_code: String,
    pub city_name: String,
    pub subdivision_code: String,
    pub subdivision_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub as_name: String,
    pub as_number: String,
    pub as_domain: String,
    pub as_route: String,
    pub as_type: String,
}

/// Request-scoped network context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NetworkDetails {
    pub remote_ip: String,
    pub geo: Option<GeoIpRecord>,
}

/// Request-scoped HTTP context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpDetails {
    pub method: String,
    pub path: String,
    pub user_agent: String,
    pub status_code: Option<u16>,
}

/// A single audit-trail record.
///
/// `actor`, `action`, and `module` are required; `correlation_id`,
/// `causation_id`, and `auth_method` are optional and omitted from the
/// wire format when empty. Decorators append to `details` under
/// well-known keys (`"http"`, `"client"`) before the entry reaches a
/// terminal sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Entry {
    /// Opaque identifier used by downstream systems for deduplication:
    /// the document id for index-backed sinks, the dedup key for
    /// stream-backed ones.
    pub idempotency_id: uuid::Uuid,
    pub actor: String,
    pub action: String,
    pub module: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub causation_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_method: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

impl Entry {
    /// Start building a new entry with the given actor, action, and module.
    pub fn builder(
        actor: impl Into<String>,
        action: impl Into<String>,
        module: impl Into<String>,
    ) -> EntryBuilder {
        EntryBuilder::new(actor, action, module)
    }

    /// Merge a detail field into this entry, without overwriting a key
    /// that is already present (first write wins, matching the decorator
    /// merge discipline used for GeoIP/network/http fields).
    pub fn set_detail_if_absent(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.details.entry(key.into()).or_insert(value);
    }
}

/// Fluent builder for [`Entry`], mirroring the crate's other `XxxBuilder`
/// types: required fields are constructor arguments, optional fields are
/// setters, and `build()` validates.
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    actor: String,
    action: String,
    module: String,
    correlation_id: String,
    causation_id: String,
    auth_method: String,
    occurred_at: Option<DateTime<Utc>>,
    details: BTreeMap<String, serde_json::Value>,
}

impl EntryBuilder {
    fn new(actor: impl Into<String>, action: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            module: module.into(),
            correlation_id: String::new(),
            causation_id: String::new(),
            auth_method: String::new(),
            occurred_at: None,
            details: BTreeMap::new(),
        }
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn causation_id(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = causation_id.into();
        self
    }

    pub fn auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = auth_method.into();
        self
    }

    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Result<Entry, ConfigError> {
        if self.actor.is_empty() {
            return Err(ConfigError("entry actor must not be empty".to_string()));
        }
        if self.action.is_empty() {
            return Err(ConfigError("entry action must not be empty".to_string()));
        }
        if self.module.is_empty() {
            return Err(ConfigError("entry module must not be empty".to_string()));
        }
        Ok(Entry {
            idempotency_id: uuid::Uuid::new_v4(),
            actor: self.actor,
            action: self.action,
            module: self.module,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            auth_method: self.auth_method,
            details: self.details,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_non_empty_actor_action_and_module() {
        assert!(Entry::builder("", "login", "auth").build().is_err());
        assert!(Entry::builder("user-1", "", "auth").build().is_err());
        assert!(Entry::builder("user-1", "login", "").build().is_err());
    }

    #[test]
    fn builder_produces_expected_entry() {
        let entry = Entry::builder("user-1", "login", "auth")
            .correlation_id("req-1")
            .detail("ip", serde_json::json!("10.0.0.1"))
            .build()
            .unwrap();
        assert_eq!(entry.actor, "user-1");
        assert_eq!(entry.action, "login");
        assert_eq!(entry.module, "auth");
        assert_eq!(entry.correlation_id, "req-1");
        assert_eq!(entry.details.get("ip").unwrap(), "10.0.0.1");
    }

    #[test]
    fn set_detail_if_absent_does_not_overwrite() {
        let mut entry = Entry::builder("user-1", "login", "auth").build().unwrap();
        entry.set_detail_if_absent("country", serde_json::json!("US"));
        entry.set_detail_if_absent("country", serde_json::json!("CA"));
        assert_eq!(entry.details.get("country").unwrap(), "US");
    }

    #[test]
    fn serializes_to_snake_case_wire_format_and_elides_empty_optionals() {
        let entry = Entry::builder("user-1", "login", "auth").build().unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("idempotency_id").is_some());
        assert!(json.get("actor").is_some());
        assert!(json.get("action").is_some());
        assert!(json.get("module").is_some());
        assert!(json.get("occurred_at").is_some());
        assert!(json.get("correlation_id").is_none());
        assert!(json.get("causation_id").is_none());
        assert!(json.get("auth_method").is_none());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn serializes_optional_fields_when_present() {
        let entry = Entry::builder("user-1", "login", "auth")
            .correlation_id("req-1")
            .causation_id("evt-9")
            .auth_method("oidc")
            .build()
            .unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["correlation_id"], "req-1");
        assert_eq!(json["causation_id"], "evt-9");
        assert_eq!(json["auth_method"], "oidc");
    }
}
