// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn config(url: String, enabled: bool) -> SmsConfig {
    SmsConfig {
        enabled,
        url,
        login: "fm".to_string(),
        password: "secret".to_string(),
        service_id: "svc-1".to_string(),
        source: "FOREMAN".to_string(),
        max_error_attempts: 3,
    }
}

fn message() -> SmsMessage {
    SmsMessage { to: "+48123123123".to_string(), text: "cell fault".to_string() }
}

/// One-shot HTTP stub: answers the first request with `status` and
/// hands back the raw request text.
async fn stub_gateway(status: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut chunk = vec![0u8; 4096];
        let mut request = Vec::new();
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text
                    .lines()
                    .filter(|line| line.to_ascii_lowercase().starts_with("content-length:"))
                    .filter_map(|line| line.split(':').nth(1))
                    .filter_map(|value| value.trim().parse::<usize>().ok())
                    .next()
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        let response =
            format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        String::from_utf8_lossy(&request).to_string()
    });
    (format!("http://{addr}/send"), handle)
}

#[test]
fn config_parses_gateway_field_names_and_defaults() {
    let config: SmsConfig = serde_json::from_value(serde_json::json!({
        "url": "https://sms.example.com/send",
        "serviceId": "svc-9"
    }))
    .unwrap();
    assert_eq!(config.service_id, "svc-9");
    assert!(!config.enabled);
    assert_eq!(config.max_error_attempts, 3);
    assert!(config.login.is_empty());
}

#[tokio::test]
async fn disabled_gateway_is_a_no_op() {
    // nothing listens on the url; a disabled gateway must not dial it
    let gateway = HttpSmsGateway::new(config("http://127.0.0.1:1/send".to_string(), false));
    gateway.send(&message()).await.unwrap();
}

#[tokio::test]
async fn initialize_requires_a_url_only_when_enabled() {
    let disabled = HttpSmsGateway::new(config(String::new(), false));
    disabled.initialize().await.unwrap();

    let enabled = HttpSmsGateway::new(config(String::new(), true));
    assert!(enabled.initialize().await.is_err());
}

#[tokio::test]
async fn delivers_form_encoded_request_to_the_gateway() {
    let (url, handle) = stub_gateway("200 OK").await;
    let gateway = HttpSmsGateway::new(config(url, true));
    gateway.send(&message()).await.unwrap();

    let request = handle.await.unwrap();
    assert!(request.starts_with("POST /send"));
    assert!(request.contains("login=fm"));
    assert!(request.contains("serviceId=svc-1"));
    assert!(request.contains("source=FOREMAN"));
    assert!(request.contains("to=%2B48123123123"));
    assert!(request.contains("text=cell+fault"));
}

#[tokio::test]
async fn gateway_error_status_is_surfaced() {
    let (url, handle) = stub_gateway("500 Internal Server Error").await;
    let gateway = HttpSmsGateway::new(config(url, true));

    let error = gateway.send(&message()).await.unwrap_err();
    match error {
        ComponentError::Sms(message) => assert!(message.contains("500")),
        other => panic!("unexpected error: {other}"),
    }
    handle.await.unwrap();
}

#[tokio::test]
async fn unreachable_gateway_is_a_transport_error() {
    // bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let gateway = HttpSmsGateway::new(config(format!("http://127.0.0.1:{port}/send"), true));
    assert!(matches!(gateway.send(&message()).await, Err(ComponentError::Sms(_))));
}

#[tokio::test]
async fn component_lifecycle_is_idempotent() {
    let gateway = HttpSmsGateway::new(config("https://sms.example.com/send".to_string(), true));
    assert_eq!(gateway.name(), "sms");
    for _ in 0..2 {
        gateway.initialize().await.unwrap();
        gateway.connect().await.unwrap();
        gateway.health_check().await.unwrap();
    }
}
