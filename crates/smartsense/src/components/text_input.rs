//! Text input component.
//!
//! Accepts raw lines through a [`TextInputHandle`], buffers them in a bounded
//! queue and publishes each one as a `text_input_event` from a background
//! task.

use async_trait::async_trait;
use component_system::{Component, ComponentError, ComponentState, ComponentStatus, HealthRecord};
use smartsense_bus::{Event, EventBus, EventPayload, TextInputData};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const TEXT_INPUT: &str = "text_input";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("input is empty")]
    Empty,
    #[error("text input is not accepting input")]
    NotAccepting,
    #[error("input queue is full")]
    QueueFull,
}

type SenderSlot = Arc<RwLock<Option<mpsc::Sender<String>>>>;

/// Cloneable producer side of the text input queue.
///
/// Stays valid across restarts of the component; while the component is
/// stopped, submissions are rejected.
#[derive(Debug, Clone)]
pub struct TextInputHandle {
    sender: SenderSlot,
    max_length: usize,
}

impl TextInputHandle {
    /// Queues one line of text. Surrounding whitespace is trimmed and
    /// over-long input is truncated.
    pub fn submit(&self, text: &str) -> Result<(), InputError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(InputError::Empty);
        }

        let line = if trimmed.chars().count() > self.max_length {
            warn!("⚠️ Text input truncated to {} characters", self.max_length);
            trimmed.chars().take(self.max_length).collect()
        } else {
            trimmed.to_string()
        };

        let slot = self.sender.read().unwrap_or_else(|p| p.into_inner());
        let sender = slot.as_ref().ok_or(InputError::NotAccepting)?;
        sender.try_send(line).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => InputError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => InputError::NotAccepting,
        })
    }

    pub fn is_accepting(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }
}

pub struct TextInputHandler {
    state: ComponentState,
    queue_size: usize,
    sender: SenderSlot,
    max_length: usize,
    receiver: Option<mpsc::Receiver<String>>,
    worker: Option<JoinHandle<()>>,
}

impl TextInputHandler {
    pub fn new(queue_size: usize, max_length: usize) -> Self {
        Self {
            state: ComponentState::new(TEXT_INPUT),
            queue_size: queue_size.max(1),
            sender: Arc::new(RwLock::new(None)),
            max_length: max_length.max(1),
            receiver: None,
            worker: None,
        }
    }

    pub fn handle(&self) -> TextInputHandle {
        TextInputHandle {
            sender: Arc::clone(&self.sender),
            max_length: self.max_length,
        }
    }

    fn close_input(&self) {
        self.sender
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .take();
    }
}

async fn publish_lines(bus: Arc<EventBus>, mut receiver: mpsc::Receiver<String>) {
    while let Some(line) = receiver.recv().await {
        let mut data = TextInputData::new(line.as_str());
        data.source = "cli".to_string();
        data.metadata
            .insert("length".to_string(), serde_json::json!(line.chars().count()));

        match bus.publish(Event::new(TEXT_INPUT, EventPayload::TextInput(data)), 0) {
            Ok(id) => debug!("⌨️ Published text input {}", id),
            Err(e) => warn!("⚠️ Dropped text input: {}", e),
        }
    }
    debug!("⌨️ Text input queue drained");
}

#[async_trait]
impl Component for TextInputHandler {
    fn name(&self) -> &str {
        self.state.name()
    }

    async fn initialize(&mut self) -> Result<bool, ComponentError> {
        let (sender, receiver) = mpsc::channel(self.queue_size);
        *self.sender.write().unwrap_or_else(|p| p.into_inner()) = Some(sender);
        self.receiver = Some(receiver);
        self.state.mark_ready();
        info!("⌨️ Text input ready (queue size {})", self.queue_size);
        Ok(true)
    }

    async fn register_handlers(&mut self, bus: Arc<EventBus>) -> Result<(), ComponentError> {
        let receiver = self.receiver.take().ok_or_else(|| {
            ComponentError::Registration("input queue was not initialized".to_string())
        })?;
        self.worker = Some(tokio::spawn(publish_lines(bus, receiver)));
        Ok(())
    }

    async fn stop_processing(&mut self) -> Result<(), ComponentError> {
        self.close_input();
        if let Some(worker) = self.worker.take() {
            worker
                .await
                .map_err(|e| ComponentError::Shutdown(format!("input task failed: {}", e)))?;
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        self.close_input();
        self.receiver = None;
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        self.state.mark_offline();
        info!("⌨️ Text input stopped");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthRecord, ComponentError> {
        Ok(self.state.health_record())
    }

    fn status(&self) -> ComponentStatus {
        self.state.status()
    }
}
