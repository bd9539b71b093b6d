//! Tests for the text pipeline across components

use super::*;
use crate::config::NlpSettings;
use component_system::Component;
use smartsense_bus::{BusConfig, Event, EventBus, EventPayload, EventType, TextInputData};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

async fn started_bus() -> Arc<EventBus> {
    let bus = Arc::new(EventBus::new(BusConfig {
        workers: 2,
        ..BusConfig::default()
    }));
    bus.start().await;
    bus
}

#[tokio::test]
async fn test_nlp_response_is_correlated_to_input() {
    let bus = started_bus().await;

    let mut nlp = NlpProcessor::new(&NlpSettings::default());
    nlp.initialize().await.unwrap();
    nlp.register_handlers(bus.clone()).await.unwrap();

    let responses = Arc::new(Mutex::new(Vec::new()));
    {
        let responses = responses.clone();
        bus.on(EventType::NlpResponse, "observer", move |event: Event| {
            let responses = responses.clone();
            async move {
                responses.lock().unwrap().push(event);
                Ok::<(), smartsense_bus::HandlerError>(())
            }
        });
    }

    let input_id = bus
        .publish(
            Event::new("keyboard", EventPayload::TextInput(TextInputData::new("bye for now"))),
            0,
        )
        .unwrap();

    assert!(wait_until(|| !responses.lock().unwrap().is_empty()).await);
    let response = responses.lock().unwrap()[0].clone();
    assert_eq!(response.source, NLP_PROCESSOR);
    assert_eq!(response.correlation_id, Some(input_id.to_string()));
    match &response.payload {
        EventPayload::NlpResponse(data) => {
            assert_eq!(data.original_text, "bye for now");
            assert_eq!(data.intent.as_deref(), Some("goodbye"));
        }
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(nlp.analyzed_count().load(std::sync::atomic::Ordering::Relaxed), 1);

    bus.shutdown().await;
}

#[tokio::test]
async fn test_text_flows_from_input_to_output() {
    let bus = started_bus().await;

    let mut output = TextOutputHandler::new();
    let transcript = output.transcript();
    let mut nlp = NlpProcessor::new(&NlpSettings::default());
    let mut input = TextInputHandler::new(16, 200);
    let handle = input.handle();

    for component in [
        &mut output as &mut dyn Component,
        &mut nlp as &mut dyn Component,
        &mut input as &mut dyn Component,
    ] {
        assert!(component.initialize().await.unwrap());
        component.register_handlers(bus.clone()).await.unwrap();
    }

    handle.submit("hello there").unwrap();
    handle.submit("how does this work").unwrap();

    assert!(wait_until(|| transcript.rendered() == 2).await);
    let mut lines = transcript.lines();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "Hello! How can I help you today?".to_string(),
            "That's an interesting question. Let me think about that.".to_string(),
        ]
    );

    input.stop_processing().await.unwrap();
    for component in [
        &mut input as &mut dyn Component,
        &mut nlp as &mut dyn Component,
        &mut output as &mut dyn Component,
    ] {
        component.shutdown().await.unwrap();
    }
    bus.shutdown().await;

    let stats = bus.get_statistics();
    // two inputs, each answered with one analysis and one display line
    assert_eq!(stats.statistics.events_published, 6);
    assert_eq!(stats.statistics.events_failed, 0);
}
