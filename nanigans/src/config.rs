use serde::Deserialize;

use crate::error::ConfigError;

/// Destination settings as delivered by the control plane. Immutable once
/// loaded; validated a single time when the destination is constructed.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Server-side account identity, sent as `app_id`.
    pub app_id: Option<String>,
    /// Route every call through the mobile endpoint.
    pub is_mobile: bool,
    /// Mobile account credential, sent as `fb_app_id` on mobile calls.
    pub fb_app_id: Option<String>,
    /// The destination expects revenue as integer cents in this mode.
    pub revenue_in_cents: bool,
    /// Logical event name -> destination event mappings.
    pub events: Vec<EventMapping>,
}

/// One configured mapping. Several mappings may share a `key`: a single
/// logical event then fans out into one request per mapping.
#[derive(Clone, Debug, Deserialize)]
pub struct EventMapping {
    pub key: String,
    pub value: Descriptor,
}

/// A destination-event definition a logical event expands into.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub r#type: EventType,
    /// Destination event name; may contain `{{ path }}` placeholders.
    pub name: String,
    #[serde(default)]
    pub custom_parameters: Vec<CustomParameter>,
}

/// Destination-side event classes, as they appear in the wire `type`
/// parameter. The set is closed: an unknown type in the settings document
/// fails deserialization, so it can never reach dispatch.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    User,
    Purchase,
    Visit,
    Install,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::User => "user",
            EventType::Purchase => "purchase",
            EventType::Visit => "visit",
            EventType::Install => "install",
        }
    }
}

/// Copies a value out of the event payload into a destination parameter.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomParameter {
    /// Dotted path into the event payload.
    pub source_path: String,
    /// Parameter name to emit when the path resolves to a non-empty scalar.
    pub destination_key: String,
}

impl Settings {
    /// Check required fields and mobile identity consistency.
    ///
    /// Policy: `events` non-empty, `appId` always required, `fbAppId`
    /// additionally required when `isMobile` is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.events.is_empty() {
            return Err(ConfigError::NoEventMappings);
        }
        if self.app_id.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingAppId);
        }
        if self.is_mobile && self.fb_app_id.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingMobileCredential);
        }
        Ok(())
    }

    /// All descriptors configured for a logical event name. Exact,
    /// case-sensitive match; an unmatched name yields an empty iterator,
    /// which is a normal outcome and not an error.
    pub fn descriptors_for<'a>(
        &'a self,
        event_name: &'a str,
    ) -> impl Iterator<Item = &'a Descriptor> + 'a {
        self.events
            .iter()
            .filter(move |mapping| mapping.key == event_name)
            .map(|mapping| &mapping.value)
    }
}
