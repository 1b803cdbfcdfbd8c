use std::sync::Arc;

use common_events::{scalar_string, Event};
use tokio::task::JoinSet;
use tracing::debug;

use crate::client::{DeliveryResponse, Endpoint, NanigansClient, BASE_URL};
use crate::config::Settings;
use crate::error::{ConfigError, DeliveryError};
use crate::params;

/// Destination name as it appears in the event's per-destination options bag.
const DESTINATION_NAME: &str = "Nanigans";

/// A configured, validated Nanigans destination.
///
/// Construction is the validation gate: settings are checked exactly once
/// here, so a value of this type can always dispatch. `track` fans one
/// logical event out into one request per matched mapping; `page` always
/// sends exactly one landing visit.
pub struct NanigansDestination {
    settings: Arc<Settings>,
    client: Arc<NanigansClient>,
}

impl NanigansDestination {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        Self::with_base_url(settings, BASE_URL)
    }

    /// Like `new`, with the API base overridden. Tests point this at a local
    /// mock server.
    pub fn with_base_url(settings: Settings, base_url: &str) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings: Arc::new(settings),
            client: Arc::new(NanigansClient::new(base_url)?),
        })
    }

    /// Deliver a track event.
    ///
    /// The event name is matched against the configured mappings; every
    /// match becomes one outbound request, and all of them are issued
    /// concurrently. The join waits for every request to finish: a failing
    /// request never cancels its siblings, and the first error observed (in
    /// completion order) becomes the overall result. An unmatched event name
    /// resolves to an empty response list without any network call.
    pub async fn track(&self, event: &Event) -> Result<Vec<DeliveryResponse>, DeliveryError> {
        let event_name = event.event.as_deref().unwrap_or_default();
        let endpoint = self.endpoint_for(event);
        let identifying = self.identifying_params(event, endpoint);

        let queries: Vec<Vec<(String, String)>> = self
            .settings
            .descriptors_for(event_name)
            .map(|descriptor| {
                let mut query = params::event_params(descriptor, event, &self.settings);
                query.extend(identifying.iter().cloned());
                query
            })
            .collect();

        if queries.is_empty() {
            debug!(event = event_name, "no nanigans mapping for event");
            return Ok(Vec::new());
        }

        let mut tasks = JoinSet::new();
        for query in queries {
            let client = Arc::clone(&self.client);
            tasks.spawn(async move { client.get(endpoint, &query).await });
        }

        let mut responses = Vec::with_capacity(tasks.len());
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.expect("nanigans dispatch task panicked") {
                Ok(response) => responses.push(response),
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        match first_error {
            None => Ok(responses),
            Some(error) => Err(error),
        }
    }

    /// Deliver a page view as a `visit`/`landing` event, with the page's
    /// `nan_pid` option when one is set.
    pub async fn page(&self, event: &Event) -> Result<DeliveryResponse, DeliveryError> {
        let endpoint = self.endpoint_for(event);

        let mut query: Vec<(String, String)> = vec![
            ("type".into(), "visit".into()),
            ("name".into(), "landing".into()),
        ];
        if let Some(nan_pid) = event
            .options(DESTINATION_NAME)
            .and_then(|options| options.get("nan_pid"))
            .and_then(scalar_string)
        {
            query.push(("nan_pid".into(), nan_pid));
        }
        query.extend(self.identifying_params(event, endpoint));

        self.client.get(endpoint, &query).await
    }

    /// Pick the endpoint for one call. An event tagged with a mobile device
    /// type is routed to the mobile endpoint even on a server-configured
    /// destination, so individually-tagged mobile events still land on the
    /// right side.
    fn endpoint_for(&self, event: &Event) -> Endpoint {
        let device_is_mobile = event
            .device_type()
            .is_some_and(|device| device.eq_ignore_ascii_case("ios") || device.eq_ignore_ascii_case("android"));

        if device_is_mobile || self.settings.is_mobile {
            Endpoint::Mobile
        } else {
            Endpoint::Server
        }
    }

    /// Account identity and call-level attribution fields, appended uniformly
    /// to every request regardless of event type.
    ///
    /// The mobile credential is only guaranteed configured when `isMobile` is
    /// set; an event routed to mobile purely by its device tag may lack one,
    /// and then the credential is simply omitted rather than invented.
    fn identifying_params(&self, event: &Event, endpoint: Endpoint) -> Vec<(String, String)> {
        let mut params = Vec::new();

        match endpoint {
            Endpoint::Mobile => {
                if let Some(fb_app_id) = self.settings.fb_app_id.as_deref() {
                    if !fb_app_id.is_empty() {
                        params.push(("fb_app_id".into(), fb_app_id.into()));
                    }
                }
            }
            Endpoint::Server => {
                if let Some(app_id) = self.settings.app_id.as_deref() {
                    params.push(("app_id".into(), app_id.into()));
                }
            }
        }

        // advertising_id associates anonymous users with server-side events.
        if let Some(advertising_id) = event.advertising_id() {
            params.push(("advertising_id".into(), advertising_id.into()));
        }
        if let Some(device_type) = event.device_type() {
            params.push(("device_type".into(), device_type.into()));
        }
        if let Some(timestamp) = event.timestamp {
            params.push(("ts".into(), timestamp.timestamp().to_string()));
        }

        params
    }
}
