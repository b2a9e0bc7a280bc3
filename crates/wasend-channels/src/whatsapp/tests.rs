use super::events::translate;
use super::qr::{generate_qr_image, generate_qr_terminal, qr_data_url};
use super::{remove_session, WhatsAppClient};
use std::time::Duration;
use wacore::types::events::Event;
use wacore_binary::jid::{Jid, JidExt};
use wasend_core::config::WhatsAppConfig;
use wasend_core::event::ClientEvent;
use wasend_core::traits::MessagingClient;

#[test]
fn test_jid_group_detection() {
    let group_jid: Jid = "120363001234567890@g.us".parse().unwrap();
    assert!(group_jid.is_group(), "g.us JID should be detected as group");

    let personal_jid: Jid = "5511999887766@s.whatsapp.net".parse().unwrap();
    assert!(
        !personal_jid.is_group(),
        "s.whatsapp.net JID should not be group"
    );
}

#[test]
fn test_translate_qr_event() {
    let event = Event::PairingQrCode {
        code: "2@abc,def".to_string(),
        timeout: Duration::from_secs(20),
    };
    assert_eq!(
        translate(event),
        Some(ClientEvent::Qr("2@abc,def".to_string()))
    );
}

#[test]
fn test_generate_qr_terminal() {
    let qr = generate_qr_terminal("test-data").unwrap();
    assert!(!qr.is_empty());
    assert!(qr.lines().count() > 5);
}

#[test]
fn test_generate_qr_image() {
    let png = generate_qr_image("test-data", 8).unwrap();
    // PNG magic bytes.
    assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[test]
fn test_larger_scale_gives_larger_image() {
    let small = generate_qr_image("test-data", 2).unwrap();
    let large = generate_qr_image("test-data", 10).unwrap();
    assert!(large.len() > small.len());
}

#[test]
fn test_qr_data_url_prefix() {
    let url = qr_data_url("test-data", 4).unwrap();
    assert!(url.starts_with("data:image/png;base64,iVBOR"));
}

#[tokio::test]
async fn test_send_without_session_is_not_connected() {
    let dir = tempfile::tempdir().unwrap();
    let client = WhatsAppClient::new(WhatsAppConfig::default(), dir.path().join("session"));
    assert!(!client.is_connected().await);
    let err = client
        .send_text("5511999887766@s.whatsapp.net", "hi")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not connected"));
}

#[tokio::test]
async fn test_clear_session_removes_directory() {
    let dir = tempfile::tempdir().unwrap();
    let session = dir.path().join("session");
    std::fs::create_dir_all(&session).unwrap();
    std::fs::write(session.join("whatsapp.db"), b"stale").unwrap();

    let client = WhatsAppClient::new(WhatsAppConfig::default(), &session);
    client.clear_session().await.unwrap();
    assert!(!session.exists());

    // Second removal is a no-op.
    assert!(!remove_session(&session).unwrap());
}

#[test]
fn test_translate_lifecycle_events() {
    use wacore::types::events::{Disconnected, StreamReplaced};
    use wasend_core::event::DisconnectReason;

    assert_eq!(
        translate(Event::Disconnected(Disconnected)),
        Some(ClientEvent::Closed(DisconnectReason::ConnectionLost))
    );
    assert_eq!(
        translate(Event::StreamReplaced(StreamReplaced)),
        Some(ClientEvent::Closed(DisconnectReason::Replaced))
    );
}
