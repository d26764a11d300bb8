use drivers_friend::controller::{APOLOGY_MESSAGE, WELCOME_MESSAGE};
use drivers_friend::reveal::RevealPacing;
use drivers_friend::{
    ControllerOptions, ConversationController, HttpBackend, Language, Phase, Sender,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn options(language: Language) -> ControllerOptions {
    ControllerOptions {
        language,
        pacing: RevealPacing {
            thinking_min: Duration::from_millis(5),
            thinking_max: Duration::from_millis(10),
            tick: Duration::from_millis(1),
        },
        request_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn full_turn_against_http_backend() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "message": "What's the speed limit?", "language": "de" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "The limit is 50 km/h in cities.",
            "intent": "speed_limit",
            "confidence": 0.95,
            "source": "StVO §3",
            "url": "https://example.org/stvo3"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = Arc::new(HttpBackend::new(format!("{}/api", mock_server.uri())).unwrap());
    let mut controller = ConversationController::new(backend, options(Language::De));

    controller.submit("  What's the speed limit?  ").unwrap();
    controller.wait_idle().await;

    let transcript: Vec<_> = controller
        .messages()
        .iter()
        .map(|m| (m.sender, m.text.as_str()))
        .collect();
    assert_eq!(
        transcript,
        vec![
            (Sender::Bot, WELCOME_MESSAGE),
            (Sender::User, "What's the speed limit?"),
            (Sender::Bot, "The limit is 50 km/h in cities."),
        ]
    );
    let answer = controller.messages().last().unwrap();
    assert_eq!(answer.attribution(), Some(("StVO §3", Some("https://example.org/stvo3"))));
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn server_error_leaves_a_usable_conversation() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Back online.",
            "intent": "greeting",
            "confidence": 1.0
        })))
        .mount(&mock_server)
        .await;

    let backend = Arc::new(HttpBackend::new(format!("{}/api", mock_server.uri())).unwrap());
    let mut controller = ConversationController::new(backend, options(Language::EnUs));

    controller.submit("hello").unwrap();
    controller.wait_idle().await;
    assert_eq!(controller.messages().last().unwrap().text, APOLOGY_MESSAGE);
    assert!(!controller.is_busy());

    controller.submit("hello again").unwrap();
    controller.wait_idle().await;
    assert_eq!(controller.messages().last().unwrap().text, "Back online.");
    assert_eq!(controller.messages().len(), 5);
}

#[tokio::test]
async fn slow_server_hits_the_request_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let backend = Arc::new(HttpBackend::new(format!("{}/api", mock_server.uri())).unwrap());
    let mut controller = ConversationController::new(
        backend,
        ControllerOptions {
            request_timeout: Duration::from_millis(200),
            ..options(Language::EnUk)
        },
    );

    controller.submit("are you there?").unwrap();
    controller.wait_idle().await;
    assert_eq!(controller.messages().last().unwrap().text, APOLOGY_MESSAGE);
}
