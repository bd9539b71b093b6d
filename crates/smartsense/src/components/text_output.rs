//! Renders `display_text_event`s through the logger.

use async_trait::async_trait;
use component_system::{Component, ComponentError, ComponentState, ComponentStatus, HealthRecord};
use smartsense_bus::{Event, EventBus, EventPayload, EventType, HandlerError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

pub const TEXT_OUTPUT: &str = "text_output";

const TRANSCRIPT_LINES: usize = 100;

/// Most recent rendered lines plus a running total.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<VecDeque<String>>>,
    rendered: Arc<AtomicU64>,
}

impl Transcript {
    fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        if lines.len() == TRANSCRIPT_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
        self.rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Total lines rendered, including ones no longer retained.
    pub fn rendered(&self) -> u64 {
        self.rendered.load(Ordering::Relaxed)
    }
}

pub struct TextOutputHandler {
    state: ComponentState,
    transcript: Transcript,
}

impl Default for TextOutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl TextOutputHandler {
    pub fn new() -> Self {
        Self {
            state: ComponentState::new(TEXT_OUTPUT),
            transcript: Transcript::default(),
        }
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

#[async_trait]
impl Component for TextOutputHandler {
    fn name(&self) -> &str {
        self.state.name()
    }

    async fn initialize(&mut self) -> Result<bool, ComponentError> {
        self.state.mark_ready();
        Ok(true)
    }

    async fn register_handlers(&mut self, bus: Arc<EventBus>) -> Result<(), ComponentError> {
        let transcript = self.transcript.clone();
        let id = bus.on(EventType::DisplayText, TEXT_OUTPUT, move |event: Event| {
            let transcript = transcript.clone();
            async move {
                let EventPayload::DisplayText(data) = &event.payload else {
                    return Ok::<(), HandlerError>(());
                };
                if data.text.is_empty() {
                    return Ok(());
                }
                match &data.color {
                    Some(color) => info!("💬 [{}:{}] {}", data.destination, color, data.text),
                    None => info!("💬 [{}] {}", data.destination, data.text),
                }
                transcript.push(data.text.clone());
                Ok(())
            }
        });
        self.state.track_subscription(id);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        info!("🖥️ Text output stopped after {} lines", self.transcript.rendered());
        self.state.mark_offline();
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthRecord, ComponentError> {
        Ok(self.state.health_record())
    }

    fn status(&self) -> ComponentStatus {
        self.state.status()
    }
}
