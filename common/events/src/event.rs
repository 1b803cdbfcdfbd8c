use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized customer event as produced by the upstream pipeline.
///
/// Everything beyond the envelope fields lives in loose property bags:
/// downstream destinations pick out what they understand and ignore the
/// rest, so none of the bag contents are typed here.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    /// Logical event name. Required for track calls, absent for page views.
    pub event: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub properties: HashMap<String, Value>,
    pub context: HashMap<String, Value>,
    /// Per-destination options, keyed by destination name.
    pub integrations: HashMap<String, Value>,
}

/// One product entry within a purchase or cart event.
#[derive(Clone, Debug, PartialEq)]
pub struct LineItem {
    pub sku: String,
    pub quantity: f64,
    pub price: f64,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            sku: String::new(),
            quantity: 1.0,
            price: 0.0,
        }
    }
}

impl LineItem {
    /// Build a line item from one element of `properties.products`, coercing
    /// loosely typed fields. Anything unusable falls back to the default so
    /// the extracted product arrays stay index-aligned with the input.
    fn from_value(value: &Value) -> Self {
        Self {
            sku: value
                .get("sku")
                .and_then(scalar_number_or_string)
                .unwrap_or_default(),
            quantity: value
                .get("quantity")
                .and_then(loose_number)
                .unwrap_or(1.0),
            price: value.get("price").and_then(loose_number).unwrap_or(0.0),
        }
    }
}

impl Event {
    /// Email attached to the event, from `context.traits` with a fallback to
    /// the property bag.
    pub fn email(&self) -> Option<&str> {
        self.context
            .get("traits")
            .and_then(|traits| traits.get("email"))
            .or_else(|| self.properties.get("email"))
            .and_then(Value::as_str)
    }

    /// Order id for transaction events. Both spellings are seen in the wild.
    pub fn order_id(&self) -> Option<String> {
        self.properties
            .get("orderId")
            .or_else(|| self.properties.get("order_id"))
            .and_then(scalar_number_or_string)
    }

    /// Device advertising identifier (IDFA/AAID), when the client captured one.
    pub fn advertising_id(&self) -> Option<&str> {
        self.context
            .get("device")
            .and_then(|device| device.get("advertisingId"))
            .and_then(Value::as_str)
    }

    /// Device platform as reported by the client library, e.g. `ios`.
    pub fn device_type(&self) -> Option<&str> {
        self.context
            .get("device")
            .and_then(|device| device.get("type"))
            .and_then(Value::as_str)
    }

    /// The ordered product list from `properties.products`. Missing or
    /// non-array values yield an empty list, never an error.
    pub fn products(&self) -> Vec<LineItem> {
        match self.properties.get("products").and_then(Value::as_array) {
            Some(items) => items.iter().map(LineItem::from_value).collect(),
            None => Vec::new(),
        }
    }

    /// The destination-specific options object from `integrations.<name>`.
    pub fn options(&self, destination: &str) -> Option<&serde_json::Map<String, Value>> {
        self.integrations.get(destination).and_then(Value::as_object)
    }

    /// Resolve a dotted path against the message.
    ///
    /// The first segment selects a section of the message (`properties`,
    /// `context`, `integrations`); `traits.` is aliased into `context.traits`
    /// so configs written against identify-style traits keep working, and
    /// `userId`/`event` resolve as top-level scalars. Unresolvable paths
    /// return `None`, never an error.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let head = segments.next()?;
        let rest: Vec<&str> = segments.collect();

        match head {
            "properties" => dig_bag(&self.properties, &rest),
            "context" => dig_bag(&self.context, &rest),
            "integrations" => dig_bag(&self.integrations, &rest),
            "traits" => {
                let traits = self.context.get("traits")?;
                dig(traits, &rest).cloned()
            }
            "userId" if rest.is_empty() => self.user_id.clone().map(Value::String),
            "event" if rest.is_empty() => self.event.clone().map(Value::String),
            _ => None,
        }
    }
}

/// Walk `segments` down a JSON value, one object key at a time.
fn dig<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |value, segment| value.get(segment))
}

fn dig_bag(bag: &HashMap<String, Value>, segments: &[&str]) -> Option<Value> {
    let (first, rest) = segments.split_first()?;
    dig(bag.get(*first)?, rest).cloned()
}

/// Coerce a JSON value into a query-parameter string.
///
/// Missing and falsy values (null, empty string, `false`, zero) coerce to
/// `None` so callers can skip the parameter entirely; arrays and objects
/// never flatten into a single parameter.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Like `scalar_string` but without the falsy filter, for identifier fields
/// where `"0"` is a legitimate value.
fn scalar_number_or_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn loose_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
