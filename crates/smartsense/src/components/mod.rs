//! The assistant's collaborator components.
//!
//! Data flows `text_input -> nlp_processor -> text_output`; each component
//! only talks to the others through the event bus.

pub mod nlp;
pub mod text_input;
pub mod text_output;

pub use nlp::{IntentClassifier, NlpProcessor, NLP_PROCESSOR};
pub use text_input::{InputError, TextInputHandle, TextInputHandler, TEXT_INPUT};
pub use text_output::{TextOutputHandler, Transcript, TEXT_OUTPUT};

#[cfg(test)]
mod tests;
