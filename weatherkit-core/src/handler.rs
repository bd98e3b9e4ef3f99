//! The event boundary between the dashboard front-end and WeatherKit.
//!
//! [`handle_request`] is the pure request path. [`WeatherKitHelper`] wraps it
//! in the notification protocol: every inbound request runs as its own task
//! and produces exactly one outbound event, either a response or an error.

use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, error};

use crate::{
    error::{ErrorKind, WeatherKitError},
    model::{WeatherKitRequest, WeatherReport},
    provider::WeatherProvider,
};

pub const MODULE_TAG: &str = "MMM-AppleWeatherKit";

pub const REQUEST_NOTIFICATION: &str = "APPLE_WEATHERKIT_REQUEST";
pub const RESPONSE_NOTIFICATION: &str = "APPLE_WEATHERKIT_RESPONSE";
pub const ERROR_NOTIFICATION: &str = "APPLE_WEATHERKIT_ERROR";

/// A named notification with a JSON payload, as exchanged with the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub notification: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(notification: impl Into<String>, payload: Value) -> Self {
        Self { notification: notification.into(), payload }
    }
}

/// Payload of an `APPLE_WEATHERKIT_ERROR` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<Value>,
    pub kind: ErrorKind,
    pub message: String,
}

/// Fetch a report and tag it with the caller's `instanceId`.
pub async fn handle_request<P>(
    provider: &P,
    request: &WeatherKitRequest,
) -> Result<WeatherReport, WeatherKitError>
where
    P: WeatherProvider + ?Sized,
{
    let mut report = provider.fetch(request).await?;

    match &request.instance_id {
        Some(id) => report.insert("instanceId".to_string(), id.clone()),
        None => report.remove("instanceId"),
    };

    Ok(report)
}

/// `[MMM-AppleWeatherKit] 5-Mar-24 09:41 ** ERROR ** <error>`
pub fn error_log_line<Tz>(error: &impl Display, at: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("[{MODULE_TAG}] {} ** ERROR ** {error}", at.format("%-d-%b-%y %H:%M"))
}

/// Dispatches inbound notifications and emits outbound ones on a channel.
#[derive(Debug)]
pub struct WeatherKitHelper<P: ?Sized> {
    provider: Arc<P>,
    events: UnboundedSender<Envelope>,
}

impl<P> WeatherKitHelper<P>
where
    P: WeatherProvider + ?Sized + 'static,
{
    /// Returns the helper and the stream of outbound events it produces.
    pub fn new(provider: Arc<P>) -> (Self, UnboundedReceiver<Envelope>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { provider, events }, rx)
    }

    /// Handle one inbound notification.
    ///
    /// Returns the spawned task for a request, `None` for anything else.
    /// Must be called from within a Tokio runtime.
    pub fn notification_received(&self, envelope: Envelope) -> Option<JoinHandle<()>> {
        if envelope.notification != REQUEST_NOTIFICATION {
            debug!(notification = %envelope.notification, "ignoring notification");
            return None;
        }

        let provider = Arc::clone(&self.provider);
        let events = self.events.clone();

        Some(tokio::spawn(async move {
            // Taken before parsing so a rejected payload can still be correlated.
            let raw_instance_id = envelope.payload.get("instanceId").cloned();

            let outcome = match serde_json::from_value::<WeatherKitRequest>(envelope.payload) {
                Ok(request) => {
                    debug!(instance_id = ?request.instance_id, "handling WeatherKit request");
                    let result = handle_request(&*provider, &request).await;
                    (request.instance_id, result)
                }
                Err(e) => (raw_instance_id, Err(WeatherKitError::InvalidPayload(e))),
            };

            let event = match outcome {
                (_, Ok(report)) => Envelope::new(RESPONSE_NOTIFICATION, Value::Object(report)),
                (instance_id, Err(e)) => {
                    error!("{}", error_log_line(&e, Local::now()));
                    error_event(instance_id, &e)
                }
            };

            if events.send(event).is_err() {
                debug!("event receiver dropped; discarding WeatherKit event");
            }
        }))
    }
}

fn error_event(instance_id: Option<Value>, error: &WeatherKitError) -> Envelope {
    let payload = ErrorEvent { instance_id, kind: error.kind(), message: error.to_string() };
    // ErrorEvent only holds strings and JSON values
    let payload = serde_json::to_value(payload).unwrap_or(Value::Null);
    Envelope::new(ERROR_NOTIFICATION, payload)
}
