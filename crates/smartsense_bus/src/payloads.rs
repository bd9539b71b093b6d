//! # Event Payloads
//!
//! One strongly typed data structure per event type. Collaborators build these
//! and wrap them in [`EventPayload`](crate::EventPayload); handlers match on the
//! payload variant instead of probing an untyped map.
//!
//! Open-ended fields (metadata, parameters, metrics) use [`Metadata`], an
//! ordered string-keyed map of JSON values, so serialized output is stable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered mapping used for free-form payload fields.
pub type Metadata = BTreeMap<String, serde_json::Value>;

fn default_text_source() -> String {
    "user".to_string()
}

fn default_unit() -> f64 {
    1.0
}

fn default_destination() -> String {
    "main".to_string()
}

fn default_format_type() -> String {
    "plain".to_string()
}

fn default_permission_level() -> String {
    "user".to_string()
}

fn default_severity() -> String {
    "error".to_string()
}

// ============================================================================
// Input payloads
// ============================================================================

/// Raw text entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInputData {
    pub text: String,
    #[serde(default = "default_text_source")]
    pub source: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TextInputData {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: default_text_source(),
            metadata: Metadata::new(),
        }
    }
}

/// Speech that has already been transcribed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceInputData {
    pub transcribed_text: String,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub audio_metadata: Metadata,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// An image supplied inline (base64) or by path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInputData {
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub dimensions: Option<(u32, u32)>,
    #[serde(default)]
    pub metadata: Metadata,
}

// ============================================================================
// Analysis payloads
// ============================================================================

/// Result of language analysis over a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NlpResponseData {
    pub original_text: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub entities: Vec<Metadata>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub processed_text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Result of image analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionResponseData {
    #[serde(default)]
    pub objects_detected: Vec<Metadata>,
    #[serde(default)]
    pub text_found: Option<String>,
    #[serde(default)]
    pub scene_classification: Option<String>,
    #[serde(default)]
    pub confidence_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub processing_metadata: Metadata,
}

/// Conversation context, shared by context update and context response events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextData {
    pub context_type: String,
    #[serde(default)]
    pub content: Metadata,
    #[serde(default)]
    pub relevance_score: f64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub expires_at: Option<u64>,
}

// ============================================================================
// Output payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakData {
    pub text: String,
    #[serde(default)]
    pub voice_type: Option<String>,
    #[serde(default = "default_unit")]
    pub rate: f64,
    #[serde(default = "default_unit")]
    pub volume: f64,
    #[serde(default)]
    pub priority: i32,
}

impl SpeakData {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_type: None,
            rate: default_unit(),
            volume: default_unit(),
            priority: 0,
        }
    }
}

/// Text to render on one of the output surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayTextData {
    pub text: String,
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default = "default_format_type")]
    pub format_type: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub style: Metadata,
}

impl DisplayTextData {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            destination: default_destination(),
            format_type: default_format_type(),
            color: None,
            style: Metadata::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiUpdateData {
    pub component: String,
    pub action: String,
    #[serde(default)]
    pub data: Metadata,
    #[serde(default)]
    pub parameters: Metadata,
}

// ============================================================================
// Action payloads
// ============================================================================

/// Request to run a system command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteActionData {
    pub command: String,
    #[serde(default)]
    pub parameters: Metadata,
    #[serde(default = "default_permission_level")]
    pub permission_level: String,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
}

impl ExecuteActionData {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameters: Metadata::new(),
            permission_level: default_permission_level(),
            requires_confirmation: false,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResultData {
    pub command: String,
    pub success: bool,
    #[serde(default)]
    pub result_data: Option<serde_json::Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub execution_time_seconds: Option<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

// ============================================================================
// System payloads
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatusData {
    pub component: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub metrics: Metadata,
    #[serde(default)]
    pub timestamp: u64,
}

/// A failure reported by a component for display or diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub component: String,
    pub error_type: String,
    pub error_message: String,
    #[serde(default)]
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub context: Metadata,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default)]
    pub timestamp: u64,
}

impl ErrorData {
    pub fn new(
        component: impl Into<String>,
        error_type: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            error_type: error_type.into(),
            error_message: error_message.into(),
            stack_trace: None,
            context: Metadata::new(),
            severity: default_severity(),
            timestamp: crate::utils::current_timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUpdateData {
    pub memory_type: String,
    pub operation: String,
    #[serde(default)]
    pub data: Metadata,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<u64>,
}
