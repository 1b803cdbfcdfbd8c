use common_events::{scalar_string, Event};
use once_cell::sync::Lazy;
use regex::Regex;

/// `{{ path }}` with a dotted identifier; surrounding whitespace tolerated.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").expect("placeholder pattern is valid"));

/// Render a destination event-name template against an event.
///
/// Each placeholder resolves through the event's dotted-path lookup; paths
/// that resolve to nothing render as the empty string. The output is not
/// re-scanned, so rendered values can never introduce new placeholders.
pub fn render(template: &str, event: &Event) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            event
                .lookup(&caps[1])
                .as_ref()
                .and_then(scalar_string)
                .unwrap_or_default()
        })
        .into_owned()
}
