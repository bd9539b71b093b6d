//! # Event Model and Handler Contract
//!
//! The [`Event`] envelope, the closed [`EventType`] enumeration, the typed
//! [`EventPayload`] union and the [`EventHandler`] trait every subscriber
//! implements (directly or through the closure adapters below).
//!
//! ## Key Types
//!
//! - [`EventType`] - Closed set of event kinds shared by all collaborators
//! - [`EventPayload`] - One variant per event type, each with its own data struct
//! - [`Event`] - Envelope carrying payload, source, id, timestamp and correlation id
//! - [`EventHandler`] - Async handler contract returning explicit results
//! - [`AsyncFnHandler`] / [`BlockingFnHandler`] - Closure adapters
//!
//! ## Error Types
//!
//! - [`EventError`] - Bus-level failures surfaced to callers
//! - [`HandlerError`] - Failures returned by (or captured from) a handler

use crate::payloads::*;
use crate::types::EventId;
use crate::utils::current_timestamp_millis;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Event types
// ============================================================================

/// Closed enumeration of event kinds.
///
/// Serialized with the wire names shared by every collaborator
/// (`text_input_event`, `nlp_response_event`, ...). New kinds are appended,
/// never renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "text_input_event")]
    TextInput,
    #[serde(rename = "voice_input_event")]
    VoiceInput,
    #[serde(rename = "image_input_event")]
    ImageInput,
    #[serde(rename = "nlp_response_event")]
    NlpResponse,
    #[serde(rename = "vision_response_event")]
    VisionResponse,
    #[serde(rename = "context_update_event")]
    ContextUpdate,
    #[serde(rename = "context_response_event")]
    ContextResponse,
    #[serde(rename = "speak_event")]
    Speak,
    #[serde(rename = "display_text_event")]
    DisplayText,
    #[serde(rename = "ui_update_event")]
    UiUpdate,
    #[serde(rename = "execute_action_event")]
    ExecuteAction,
    #[serde(rename = "action_result_event")]
    ActionResult,
    #[serde(rename = "system_status_event")]
    SystemStatus,
    #[serde(rename = "error_event")]
    Error,
    #[serde(rename = "memory_update_event")]
    MemoryUpdate,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [EventType; 15] = [
        EventType::TextInput,
        EventType::VoiceInput,
        EventType::ImageInput,
        EventType::NlpResponse,
        EventType::VisionResponse,
        EventType::ContextUpdate,
        EventType::ContextResponse,
        EventType::Speak,
        EventType::DisplayText,
        EventType::UiUpdate,
        EventType::ExecuteAction,
        EventType::ActionResult,
        EventType::SystemStatus,
        EventType::Error,
        EventType::MemoryUpdate,
    ];

    /// Wire name of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TextInput => "text_input_event",
            EventType::VoiceInput => "voice_input_event",
            EventType::ImageInput => "image_input_event",
            EventType::NlpResponse => "nlp_response_event",
            EventType::VisionResponse => "vision_response_event",
            EventType::ContextUpdate => "context_update_event",
            EventType::ContextResponse => "context_response_event",
            EventType::Speak => "speak_event",
            EventType::DisplayText => "display_text_event",
            EventType::UiUpdate => "ui_update_event",
            EventType::ExecuteAction => "execute_action_event",
            EventType::ActionResult => "action_result_event",
            EventType::SystemStatus => "system_status_event",
            EventType::Error => "error_event",
            EventType::MemoryUpdate => "memory_update_event",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EventError::UnknownEventType(s.to_string()))
    }
}

// ============================================================================
// Payload union
// ============================================================================

/// Typed payload, discriminated by event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data")]
pub enum EventPayload {
    #[serde(rename = "text_input_event")]
    TextInput(TextInputData),
    #[serde(rename = "voice_input_event")]
    VoiceInput(VoiceInputData),
    #[serde(rename = "image_input_event")]
    ImageInput(ImageInputData),
    #[serde(rename = "nlp_response_event")]
    NlpResponse(NlpResponseData),
    #[serde(rename = "vision_response_event")]
    VisionResponse(VisionResponseData),
    #[serde(rename = "context_update_event")]
    ContextUpdate(ContextData),
    #[serde(rename = "context_response_event")]
    ContextResponse(ContextData),
    #[serde(rename = "speak_event")]
    Speak(SpeakData),
    #[serde(rename = "display_text_event")]
    DisplayText(DisplayTextData),
    #[serde(rename = "ui_update_event")]
    UiUpdate(UiUpdateData),
    #[serde(rename = "execute_action_event")]
    ExecuteAction(ExecuteActionData),
    #[serde(rename = "action_result_event")]
    ActionResult(ActionResultData),
    #[serde(rename = "system_status_event")]
    SystemStatus(SystemStatusData),
    #[serde(rename = "error_event")]
    Error(ErrorData),
    #[serde(rename = "memory_update_event")]
    MemoryUpdate(MemoryUpdateData),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::TextInput(_) => EventType::TextInput,
            EventPayload::VoiceInput(_) => EventType::VoiceInput,
            EventPayload::ImageInput(_) => EventType::ImageInput,
            EventPayload::NlpResponse(_) => EventType::NlpResponse,
            EventPayload::VisionResponse(_) => EventType::VisionResponse,
            EventPayload::ContextUpdate(_) => EventType::ContextUpdate,
            EventPayload::ContextResponse(_) => EventType::ContextResponse,
            EventPayload::Speak(_) => EventType::Speak,
            EventPayload::DisplayText(_) => EventType::DisplayText,
            EventPayload::UiUpdate(_) => EventType::UiUpdate,
            EventPayload::ExecuteAction(_) => EventType::ExecuteAction,
            EventPayload::ActionResult(_) => EventType::ActionResult,
            EventPayload::SystemStatus(_) => EventType::SystemStatus,
            EventPayload::Error(_) => EventType::Error,
            EventPayload::MemoryUpdate(_) => EventType::MemoryUpdate,
        }
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Message envelope passed through the bus.
///
/// Producers build an event with [`Event::new`]; the bus fills in `event_id`
/// and `timestamp` on publish when they are absent. Handlers only ever see a
/// shared reference, so an event is read-only once published.
///
/// # Examples
///
/// ```rust
/// use smartsense_bus::{Event, EventPayload, EventType, TextInputData};
///
/// let event = Event::new("keyboard", EventPayload::TextInput(TextInputData::new("hi")))
///     .with_correlation_id("session-1");
/// assert_eq!(event.event_type(), EventType::TextInput);
/// assert!(event.event_id.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub payload: EventPayload,
    /// Milliseconds since the Unix epoch.
    pub timestamp: Option<u64>,
    /// Name of the producing component.
    pub source: String,
    pub event_id: Option<EventId>,
    pub correlation_id: Option<String>,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: None,
            source: source.into(),
            event_id: None,
            correlation_id: None,
        }
    }

    /// The event type, derived from the payload variant.
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_event_id(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Assigns an id and timestamp where missing and returns the id.
    pub(crate) fn stamp(&mut self) -> EventId {
        if self.timestamp.is_none() {
            self.timestamp = Some(current_timestamp_millis());
        }
        *self.event_id.get_or_insert_with(EventId::new)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by bus operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    #[error("Event bus is not running")]
    NotRunning,
    #[error("Invalid bus configuration: {0}")]
    InvalidConfig(String),
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Event error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for EventError {
    fn from(e: serde_json::Error) -> Self {
        EventError::Serialization(e.to_string())
    }
}

/// Failure of a single handler invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::Failed(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::Failed(message.to_string())
    }
}

impl From<EventError> for HandlerError {
    fn from(e: EventError) -> Self {
        HandlerError::Failed(e.to_string())
    }
}

/// Extracts a readable message from a captured panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler trait for processing events asynchronously.
///
/// Returning `Err` (or panicking) counts as a failed attempt; the dispatcher
/// retries with exponential backoff and never propagates the failure to the
/// publisher or to other subscribers.
///
/// Most callers use [`EventBus::on`](crate::EventBus::on) or
/// [`EventBus::on_blocking`](crate::EventBus::on_blocking) instead of
/// implementing this trait directly.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static + Debug {
    /// Handles one delivery of `event`.
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;

    /// Returns a human-readable name for this handler for debugging.
    fn handler_name(&self) -> &str;
}

/// Filter predicate evaluated before a handler is invoked.
///
/// A predicate that panics is treated as a pass.
pub type EventFilter = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Adapter for async closures.
///
/// The closure receives an owned clone of the event so the returned future
/// can be `'static`.
pub struct AsyncFnHandler<F> {
    handler: F,
    name: String,
}

impl<F, Fut> AsyncFnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            handler,
            name: name.into(),
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for AsyncFnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        (self.handler)(event.clone()).await
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

impl<F> Debug for AsyncFnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnHandler")
            .field("name", &self.name)
            .finish()
    }
}

/// Adapter for synchronous closures.
///
/// Each invocation runs on tokio's blocking pool so a slow closure cannot
/// stall a dispatch worker.
pub struct BlockingFnHandler<F> {
    handler: Arc<F>,
    name: String,
}

impl<F> BlockingFnHandler<F>
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            handler: Arc::new(handler),
            name: name.into(),
        }
    }
}

#[async_trait]
impl<F> EventHandler for BlockingFnHandler<F>
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        let handler = Arc::clone(&self.handler);
        let event = event.clone();
        match tokio::task::spawn_blocking(move || handler(&event)).await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                Err(HandlerError::Panicked(panic_message(&*join_error.into_panic())))
            }
            Err(join_error) => Err(HandlerError::Failed(join_error.to_string())),
        }
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

impl<F> Debug for BlockingFnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingFnHandler")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests;
