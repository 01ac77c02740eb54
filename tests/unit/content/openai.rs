use super::*;

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;

use crate::content::provider::{ProviderKind, Role};
use crate::spec::ruleset::{SchemaNode, StringRule};

/// Serve the canned `(status, body)` responses in order, one connection each.
fn serve(responses: Vec<(u16, String)>) -> (String, std::thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let mut bodies = Vec::new();
        for (status, body) in responses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(v) = lower.strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
            }
            let mut req = vec![0u8; content_length];
            reader.read_exact(&mut req).unwrap();
            bodies.push(String::from_utf8(req).unwrap());
            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
        }
        bodies
    });
    (format!("http://{addr}/v1"), handle)
}

fn config(base_url: String, retries: u32) -> ProviderConfig {
    ProviderConfig {
        kind: ProviderKind::Openai,
        base_url,
        retries,
        timeout_secs: 5,
        ..ProviderConfig::default()
    }
}

fn completion(content: &str) -> String {
    serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
        .to_string()
}

fn request<'a>(schema: &'a SchemaNode) -> ContentRequest<'a> {
    ContentRequest {
        slot: "paragraph",
        block_id: "body[0]",
        schema,
        banned: &[],
        messages: vec![Message::new(Role::System, "sys"), Message::new(Role::User, "write")],
        seed: 9,
        attempt: 1,
        cancel: None,
    }
}

#[test]
fn request_body_carries_sampling_settings_and_envelope_schema() {
    let provider = OpenAiProvider::new(
        config("http://127.0.0.1:9/v1/".into(), 0),
        "k".into(),
        Arc::new(RequestLimiter::new(1, Duration::ZERO)),
    )
    .unwrap();
    assert_eq!(provider.endpoint, "http://127.0.0.1:9/v1/chat/completions");

    let schema = SchemaNode::String(StringRule {
        max_words: Some(50),
        ..StringRule::default()
    });
    let req = request(&schema);
    let body = serde_json::to_value(provider.build_body(&req)).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["temperature"], 0.7);
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["response_format"]["type"], "json_schema");
    assert_eq!(body["response_format"]["json_schema"]["name"], "paragraph");
    assert_eq!(
        body["response_format"]["json_schema"]["schema"]["required"],
        serde_json::json!(["value"])
    );
}

#[test]
fn transient_status_is_retried_then_succeeds() {
    let (url, server) = serve(vec![
        (503, "{}".to_owned()),
        (200, completion(r#"{"value": "hello"}"#)),
    ]);
    let provider = OpenAiProvider::new(
        config(url, 2),
        "secret".into(),
        Arc::new(RequestLimiter::new(1, Duration::ZERO)),
    )
    .unwrap();
    let schema = SchemaNode::String(StringRule::default());
    let out = provider.generate(&request(&schema)).unwrap();
    assert_eq!(out, r#"{"value": "hello"}"#);
    let bodies = server.join().unwrap();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
}

#[test]
fn client_errors_are_not_retried() {
    let (url, server) = serve(vec![(400, r#"{"error":"bad"}"#.to_owned())]);
    let provider = OpenAiProvider::new(
        config(url, 3),
        "secret".into(),
        Arc::new(RequestLimiter::new(1, Duration::ZERO)),
    )
    .unwrap();
    let schema = SchemaNode::Boolean;
    let err = provider.generate(&request(&schema)).unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 400, .. }));
    assert!(!err.is_transient());
    assert_eq!(server.join().unwrap().len(), 1);
}

#[test]
fn missing_content_is_malformed() {
    let (url, server) = serve(vec![(200, r#"{"choices": []}"#.to_owned())]);
    let provider = OpenAiProvider::new(
        config(url, 0),
        "secret".into(),
        Arc::new(RequestLimiter::new(1, Duration::ZERO)),
    )
    .unwrap();
    let schema = SchemaNode::Boolean;
    let err = provider.generate(&request(&schema)).unwrap_err();
    assert!(matches!(err, ProviderError::Malformed(_)));
    server.join().unwrap();
}

#[test]
fn cancellation_stops_the_retry_loop() {
    let (url, server) = serve(vec![(503, "{}".to_owned())]);
    let provider = OpenAiProvider::new(
        config(url, 5),
        "secret".into(),
        Arc::new(RequestLimiter::new(1, Duration::ZERO)),
    )
    .unwrap();
    let schema = SchemaNode::Boolean;
    let cancel = CancelToken::new();
    let mut req = request(&schema);
    req.cancel = Some(&cancel);

    let err = std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(100));
            cancel.cancel();
        });
        provider.generate(&req).unwrap_err()
    });
    assert_eq!(err, ProviderError::Cancelled);
    assert_eq!(server.join().unwrap().len(), 1);
}

#[test]
fn cancelled_request_is_never_sent() {
    let provider = OpenAiProvider::new(
        config("http://127.0.0.1:9/v1".into(), 3),
        "secret".into(),
        Arc::new(RequestLimiter::new(1, Duration::ZERO)),
    )
    .unwrap();
    let schema = SchemaNode::Boolean;
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut req = request(&schema);
    req.cancel = Some(&cancel);
    assert_eq!(provider.generate(&req).unwrap_err(), ProviderError::Cancelled);
}

#[test]
fn backoff_doubles_and_caps() {
    assert_eq!(backoff(0), Duration::from_millis(250));
    assert_eq!(backoff(1), Duration::from_millis(500));
    assert_eq!(backoff(2), Duration::from_millis(1000));
    assert_eq!(backoff(10), Duration::from_millis(4000));
}

#[test]
fn schema_names_are_sanitized() {
    assert_eq!(schema_name("line items.v2"), "line_items_v2");
    assert_eq!(schema_name(""), "slot");
}
