//! Rule-based text analysis.
//!
//! [`IntentClassifier`] does the analysis; [`NlpProcessor`] wires it to the
//! bus. Every analysed input produces an `nlp_response_event` correlated to
//! the input's event id, followed by a `display_text_event` carrying the reply.

use crate::config::{IntentRule, NlpSettings};
use async_trait::async_trait;
use component_system::{Component, ComponentError, ComponentState, ComponentStatus, HealthRecord};
use regex::Regex;
use smartsense_bus::{
    DisplayTextData, Event, EventBus, EventError, EventId, EventPayload, EventType, HandlerError,
    Metadata, NlpResponseData,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

pub const NLP_PROCESSOR: &str = "nlp_processor";

const UNKNOWN_INTENT: &str = "unknown";

const POSITIVE_WORDS: &[&str] = &["good", "great", "excellent", "happy", "love", "wonderful", "amazing"];
const NEGATIVE_WORDS: &[&str] = &["bad", "terrible", "hate", "awful", "horrible", "sad", "angry"];

const NUMBER_CONFIDENCE: f64 = 0.9;
const TIME_CONFIDENCE: f64 = 0.8;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\w']+").unwrap());
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").unwrap());
static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}\b").unwrap());

/// An intent with its keywords compiled to case-insensitive whole-word patterns.
#[derive(Debug, Clone)]
struct CompiledIntent {
    name: String,
    keyword_count: usize,
    patterns: Vec<Regex>,
}

impl CompiledIntent {
    fn compile(rule: &IntentRule) -> Self {
        let patterns = rule
            .keywords
            .iter()
            .filter_map(|keyword| {
                let pattern = keyword_pattern(keyword)?;
                match Regex::new(&pattern) {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        warn!("⚠️ Skipping keyword {:?} of intent {}: {}", keyword, rule.name, e);
                        None
                    }
                }
            })
            .collect();

        Self {
            name: rule.name.clone(),
            keyword_count: rule.keywords.len(),
            patterns,
        }
    }
}

/// `"see you"` becomes `(?i)\bsee\s+you\b`, so "hi" never matches inside "this".
fn keyword_pattern(keyword: &str) -> Option<String> {
    let words: Vec<String> = keyword.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    Some(format!(r"(?i)\b{}\b", words.join(r"\s+")))
}

/// Keyword-based intent, sentiment and entity extraction.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    intents: Vec<CompiledIntent>,
    confidence_threshold: f64,
}

impl IntentClassifier {
    pub fn new(rules: Vec<IntentRule>, confidence_threshold: f64) -> Self {
        Self {
            intents: rules.iter().map(CompiledIntent::compile).collect(),
            confidence_threshold,
        }
    }

    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }

    /// Returns the first intent with at least one keyword in `text`, and the
    /// share of that intent's keywords that matched.
    pub fn classify(&self, text: &str) -> (String, f64) {
        for intent in &self.intents {
            let matches = intent
                .patterns
                .iter()
                .filter(|pattern| pattern.is_match(text))
                .count();
            if matches > 0 {
                let confidence = (matches as f64 / intent.keyword_count as f64).min(1.0);
                if confidence < self.confidence_threshold {
                    debug!("Intent {} below threshold ({:.2})", intent.name, confidence);
                    break;
                }
                return (intent.name.clone(), confidence);
            }
        }
        (UNKNOWN_INTENT.to_string(), 0.0)
    }

    pub fn analyze(&self, text: &str) -> NlpResponseData {
        let cleaned = clean(text);
        let (intent, confidence) = self.classify(&cleaned);
        NlpResponseData {
            original_text: text.to_string(),
            processed_text: Some(reply_for(&intent).to_string()),
            intent: Some(intent),
            entities: extract_entities(&cleaned),
            sentiment: Some(sentiment(&cleaned).to_string()),
            confidence,
            language: Some("en".to_string()),
        }
    }
}

/// Trims and collapses runs of whitespace to single spaces.
fn clean(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn sentiment(text: &str) -> &'static str {
    let (mut positive, mut negative) = (0, 0);
    for word in WORD.find_iter(text) {
        let word = word.as_str().to_lowercase();
        if POSITIVE_WORDS.contains(&word.as_str()) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&word.as_str()) {
            negative += 1;
        }
    }
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => "positive",
        std::cmp::Ordering::Less => "negative",
        std::cmp::Ordering::Equal => "neutral",
    }
}

fn entity(entity_type: &str, found: regex::Match<'_>, confidence: f64) -> Metadata {
    let mut entity = Metadata::new();
    entity.insert("entity_type".to_string(), serde_json::json!(entity_type));
    entity.insert("entity_value".to_string(), serde_json::json!(found.as_str()));
    entity.insert("confidence".to_string(), serde_json::json!(confidence));
    entity.insert("start_position".to_string(), serde_json::json!(found.start()));
    entity.insert("end_position".to_string(), serde_json::json!(found.end()));
    entity
}

/// Clock times and standalone numbers, ordered by position. Positions are
/// byte offsets into `text`; the digits of a time are not reported again as
/// numbers.
fn extract_entities(text: &str) -> Vec<Metadata> {
    let times: Vec<regex::Match<'_>> = CLOCK_TIME.find_iter(text).collect();
    let numbers = NUMBER
        .find_iter(text)
        .filter(|number| !times.iter().any(|time| time.start() <= number.start() && number.end() <= time.end()));

    let mut found: Vec<(usize, Metadata)> = times
        .iter()
        .map(|time| (time.start(), entity("time", *time, TIME_CONFIDENCE)))
        .chain(numbers.map(|number| (number.start(), entity("number", number, NUMBER_CONFIDENCE))))
        .collect();
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, entity)| entity).collect()
}

fn reply_for(intent: &str) -> &'static str {
    match intent {
        "greeting" => "Hello! How can I help you today?",
        "goodbye" => "Goodbye! Have a great day!",
        "question" => "That's an interesting question. Let me think about that.",
        "command" => "Command noted. Command execution is not available yet.",
        "help" => "You can ask me questions, give me commands, or just chat with me!",
        _ => "I'm not sure I understand. Could you please rephrase that?",
    }
}

pub struct NlpProcessor {
    state: ComponentState,
    classifier: Arc<IntentClassifier>,
    analyzed: Arc<AtomicU64>,
}

impl NlpProcessor {
    pub fn new(settings: &NlpSettings) -> Self {
        Self {
            state: ComponentState::new(NLP_PROCESSOR),
            classifier: Arc::new(IntentClassifier::new(
                settings.intents.clone(),
                settings.confidence_threshold,
            )),
            analyzed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of inputs analysed since construction.
    pub fn analyzed_count(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.analyzed)
    }
}

async fn respond(
    bus: &EventBus,
    classifier: &IntentClassifier,
    input: &Event,
    text: &str,
) -> Result<(), HandlerError> {
    if text.trim().is_empty() {
        return Ok(());
    }

    let analysis = classifier.analyze(text);
    let reply = analysis.processed_text.clone().unwrap_or_default();
    debug!(
        "🔎 Intent {:?} ({:.2}) for: {}",
        analysis.intent, analysis.confidence, text
    );

    let correlation = input
        .event_id
        .map(|id| id.to_string())
        .or_else(|| input.correlation_id.clone());

    let mut response = Event::new(NLP_PROCESSOR, EventPayload::NlpResponse(analysis));
    let mut display = Event::new(NLP_PROCESSOR, EventPayload::DisplayText(DisplayTextData::new(reply)));
    if let Some(correlation) = correlation {
        response = response.with_correlation_id(correlation.clone());
        display = display.with_correlation_id(correlation);
    }

    publish_reply(|event| bus.publish(event, 0), response, display)
}

/// Publishes the response, then the reply. Once the response is out the
/// handler succeeds even if the reply cannot be published.
fn publish_reply<F>(mut publish: F, response: Event, display: Event) -> Result<(), HandlerError>
where
    F: FnMut(Event) -> Result<EventId, EventError>,
{
    publish(response)?;
    if let Err(e) = publish(display) {
        warn!("⚠️ NLP reply was not displayed: {}", e);
    }
    Ok(())
}

#[async_trait]
impl Component for NlpProcessor {
    fn name(&self) -> &str {
        self.state.name()
    }

    async fn initialize(&mut self) -> Result<bool, ComponentError> {
        self.state.mark_ready();
        info!("🔎 NLP processor ready ({} intents, rule-based)", self.classifier.intent_count());
        Ok(true)
    }

    async fn register_handlers(&mut self, bus: Arc<EventBus>) -> Result<(), ComponentError> {
        for event_type in [EventType::TextInput, EventType::VoiceInput] {
            let bus_for_handler = Arc::clone(&bus);
            let classifier = Arc::clone(&self.classifier);
            let analyzed = Arc::clone(&self.analyzed);

            let id = bus.on(event_type, NLP_PROCESSOR, move |event: Event| {
                let bus = Arc::clone(&bus_for_handler);
                let classifier = Arc::clone(&classifier);
                let analyzed = Arc::clone(&analyzed);
                async move {
                    let text = match &event.payload {
                        EventPayload::TextInput(data) => data.text.clone(),
                        EventPayload::VoiceInput(data) => data.transcribed_text.clone(),
                        _ => return Ok(()),
                    };
                    respond(&bus, &classifier, &event, &text).await?;
                    analyzed.fetch_add(1, Ordering::Relaxed);
                    Ok::<(), HandlerError>(())
                }
            });
            self.state.track_subscription(id);
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        self.state.mark_offline();
        info!(
            "🔎 NLP processor stopped after {} inputs",
            self.analyzed.load(Ordering::Relaxed)
        );
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthRecord, ComponentError> {
        Ok(self.state.health_record())
    }

    fn status(&self) -> ComponentStatus {
        self.state.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(NlpSettings::default().intents, 0.0)
    }

    #[test]
    fn test_first_matching_intent_wins() {
        let classifier = classifier();

        // "hello" (greeting) and "what" (question) both match; greeting is listed first.
        let (intent, confidence) = classifier.classify("Hello, what time is it?");
        assert_eq!(intent, "greeting");
        assert!((confidence - 0.2).abs() < f64::EPSILON);

        assert_eq!(classifier.classify("please OPEN the door").0, "command");
        assert_eq!(classifier.classify("I need some support").0, "help");
    }

    #[test]
    fn test_keywords_match_whole_words() {
        let classifier = classifier();
        assert_eq!(classifier.classify("this is ship shape").0, "unknown");
        assert_eq!(classifier.classify("see   you tomorrow").0, "goodbye");
    }

    #[test]
    fn test_threshold_demotes_weak_matches() {
        let strict = IntentClassifier::new(NlpSettings::default().intents, 0.5);
        assert_eq!(strict.classify("hello"), ("unknown".to_string(), 0.0));

        let rules = vec![IntentRule::new("weather", &["rain", "sunny"])];
        let weather = IntentClassifier::new(rules, 0.5);
        assert_eq!(weather.classify("Rain today?"), ("weather".to_string(), 0.5));
    }

    #[test]
    fn test_analysis_fields() {
        let analysis = classifier().analyze("What a great day, meet at 10:30 with 3 friends");

        assert_eq!(analysis.intent.as_deref(), Some("question"));
        assert_eq!(analysis.sentiment.as_deref(), Some("positive"));
        assert_eq!(analysis.language.as_deref(), Some("en"));
        assert_eq!(analysis.entities.len(), 2);
        assert_eq!(analysis.entities[0]["entity_type"], serde_json::json!("time"));
        assert_eq!(analysis.entities[0]["entity_value"], serde_json::json!("10:30"));
        assert_eq!(analysis.entities[1]["entity_type"], serde_json::json!("number"));
        assert!(analysis.processed_text.unwrap().contains("question"));
    }

    #[test]
    fn test_entities_carry_confidence_and_span() {
        let analysis = classifier().analyze("  wake me at   7:05 ,  then 12 more ");
        let cleaned = "wake me at 7:05 , then 12 more";

        let time = &analysis.entities[0];
        assert_eq!(time["entity_value"], serde_json::json!("7:05"));
        assert_eq!(time["confidence"], serde_json::json!(0.8));
        assert_eq!(time["start_position"], serde_json::json!(11));
        assert_eq!(time["end_position"], serde_json::json!(15));
        assert_eq!(&cleaned[11..15], "7:05");

        let number = &analysis.entities[1];
        assert_eq!(number["entity_type"], serde_json::json!("number"));
        assert_eq!(number["entity_value"], serde_json::json!("12"));
        assert_eq!(number["confidence"], serde_json::json!(0.9));
        assert_eq!(number["start_position"], serde_json::json!(23));
        assert_eq!(number["end_position"], serde_json::json!(25));
        assert_eq!(analysis.entities.len(), 2);
    }

    #[test]
    fn test_failed_display_publish_keeps_the_response() {
        let response = Event::new(NLP_PROCESSOR, EventPayload::NlpResponse(NlpResponseData::default()));
        let display = Event::new(NLP_PROCESSOR, EventPayload::DisplayText(DisplayTextData::new("hi")));

        let mut sent = Vec::new();
        let result = publish_reply(
            |event| {
                if event.event_type() == EventType::DisplayText {
                    return Err(EventError::NotRunning);
                }
                sent.push(event.event_type());
                Ok(EventId::new())
            },
            response.clone(),
            display.clone(),
        );
        assert!(result.is_ok());
        assert_eq!(sent, vec![EventType::NlpResponse]);

        let result = publish_reply(|_| Err(EventError::NotRunning), response, display);
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_keywords_never_match() {
        let rules = vec![
            IntentRule::new("blank", &["", "   "]),
            IntentRule::new("greeting", &["hello there"]),
        ];
        let classifier = IntentClassifier::new(rules, 0.0);
        assert_eq!(classifier.classify("well HELLO\tthere").0, "greeting");
        assert_eq!(classifier.classify("nothing to see").0, "unknown");
    }

    #[test]
    fn test_unknown_input_gets_fallback_reply() {
        let analysis = classifier().analyze("purple elephants");
        assert_eq!(analysis.intent.as_deref(), Some("unknown"));
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.sentiment.as_deref(), Some("neutral"));
        assert!(analysis.entities.is_empty());
    }
}
