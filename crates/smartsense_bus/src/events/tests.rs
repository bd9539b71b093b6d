use crate::events::*;
use crate::types::EventId;
use std::str::FromStr;

#[test]
fn test_event_type_wire_names() {
    let json = serde_json::to_value(EventType::TextInput).unwrap();
    assert_eq!(json, serde_json::json!("text_input_event"));

    let parsed: EventType = serde_json::from_value(serde_json::json!("display_text_event")).unwrap();
    assert_eq!(parsed, EventType::DisplayText);

    assert_eq!(EventType::from_str("memory_update_event").unwrap(), EventType::MemoryUpdate);
    assert!(matches!(
        EventType::from_str("keyboard_event"),
        Err(EventError::UnknownEventType(_))
    ));
}

#[test]
fn test_event_type_follows_payload() {
    let context = ContextData {
        context_type: "conversation".to_string(),
        ..Default::default()
    };
    let update = Event::new("memory", EventPayload::ContextUpdate(context.clone()));
    let response = Event::new("memory", EventPayload::ContextResponse(context));

    assert_eq!(update.event_type(), EventType::ContextUpdate);
    assert_eq!(response.event_type(), EventType::ContextResponse);
}

#[test]
fn test_stamp_keeps_existing_identity() {
    let id = EventId::new();
    let mut event = Event::new("tester", EventPayload::TextInput(TextInputData::new("hello")))
        .with_event_id(id)
        .with_timestamp(42);

    assert_eq!(event.stamp(), id);
    assert_eq!(event.timestamp, Some(42));

    let mut fresh = Event::new("tester", EventPayload::Speak(SpeakData::new("hello")));
    let assigned = fresh.stamp();
    assert_eq!(fresh.event_id, Some(assigned));
    assert!(fresh.timestamp.unwrap() > 0);
}

#[test]
fn test_payload_defaults_from_json() {
    let payload: EventPayload = serde_json::from_value(serde_json::json!({
        "event_type": "display_text_event",
        "data": { "text": "Hello" }
    }))
    .unwrap();

    match payload {
        EventPayload::DisplayText(data) => {
            assert_eq!(data.text, "Hello");
            assert_eq!(data.destination, "main");
            assert_eq!(data.format_type, "plain");
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn test_async_fn_handler_receives_event() {
    let handler = AsyncFnHandler::new("echo", |event: Event| async move {
        match event.payload {
            EventPayload::TextInput(data) if data.text == "ping" => Ok(()),
            _ => Err(HandlerError::from("unexpected payload")),
        }
    });

    let ping = Event::new("tester", EventPayload::TextInput(TextInputData::new("ping")));
    let pong = Event::new("tester", EventPayload::TextInput(TextInputData::new("pong")));

    assert_eq!(handler.handler_name(), "echo");
    assert!(handler.handle(&ping).await.is_ok());
    assert!(handler.handle(&pong).await.is_err());
}

#[tokio::test]
async fn test_blocking_handler_panic_is_captured() {
    let handler = BlockingFnHandler::new("explodes", |_event: &Event| -> Result<(), HandlerError> {
        panic!("sensor offline");
    });

    let event = Event::new("tester", EventPayload::TextInput(TextInputData::new("boom")));
    let result = handler.handle(&event).await;

    assert_eq!(result, Err(HandlerError::Panicked("sensor offline".to_string())));
}
