// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn config() -> SmtpConfig {
    SmtpConfig {
        host: "mail.example.com".to_string(),
        port: 2525,
        username: String::new(),
        password: String::new(),
        starttls: false,
        tls: false,
        from: "foreman <fm@example.com>".to_string(),
        max_error_attempts: 3,
    }
}

fn message() -> EmailMessage {
    EmailMessage {
        to: vec!["ops@example.com".to_string()],
        subject: "cell fault".to_string(),
        body: "cell 3 down".to_string(),
    }
}

#[test]
fn config_defaults_fill_port_and_error_attempts() {
    let config: SmtpConfig = serde_json::from_value(serde_json::json!({
        "host": "mail.example.com",
        "from": "fm@example.com"
    }))
    .unwrap();
    assert_eq!(config.port, 587);
    assert_eq!(config.max_error_attempts, 3);
    assert!(!config.starttls);
    assert!(!config.tls);
    assert!(config.username.is_empty());
}

#[test]
fn builds_with_each_transport_flavor() {
    // plaintext relay
    assert!(SmtpMailer::new(config()).is_ok());

    let mut starttls = config();
    starttls.starttls = true;
    assert!(SmtpMailer::new(starttls).is_ok());

    let mut tls = config();
    tls.tls = true;
    assert!(SmtpMailer::new(tls).is_ok());
}

#[test]
fn builds_with_credentials() {
    let mut with_auth = config();
    with_auth.username = "fm".to_string();
    with_auth.password = "secret".to_string();
    assert!(SmtpMailer::new(with_auth).is_ok());
}

#[test]
fn build_message_carries_subject_and_recipients() {
    let mailer = SmtpMailer::new(config()).unwrap();
    let mut message = message();
    message.to.push("shift-lead@example.com".to_string());

    let mail = mailer.build_message(&message).unwrap();
    let rendered = String::from_utf8_lossy(&mail.formatted()).to_string();
    assert!(rendered.contains("Subject: cell fault"));
    assert!(rendered.contains("ops@example.com"));
    assert!(rendered.contains("shift-lead@example.com"));
    assert!(rendered.contains("fm@example.com"));
}

#[test]
fn build_message_rejects_invalid_from_address() {
    let mut bad_from = config();
    bad_from.from = "not an address".to_string();
    let mailer = SmtpMailer::new(bad_from).unwrap();

    let error = mailer.build_message(&message()).unwrap_err();
    match error {
        ComponentError::Mail(message) => assert!(message.contains("invalid from address")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn build_message_rejects_invalid_recipient() {
    let mailer = SmtpMailer::new(config()).unwrap();
    let mut bad_to = message();
    bad_to.to = vec!["@@not-a-mailbox".to_string()];

    let error = mailer.build_message(&bad_to).unwrap_err();
    match error {
        ComponentError::Mail(message) => assert!(message.contains("invalid recipient")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn initialize_rejects_empty_host() {
    let mut no_host = config();
    no_host.host = String::new();
    let mailer = SmtpMailer::new(no_host).unwrap();
    assert!(mailer.initialize().await.is_err());
}

#[tokio::test]
async fn lifecycle_stages_are_side_effect_free_until_health_check() {
    let mailer = SmtpMailer::new(config()).unwrap();
    assert_eq!(mailer.name(), "smtp");
    mailer.initialize().await.unwrap();
    // the transport pools connections lazily, so connect never dials
    mailer.connect().await.unwrap();
}
