use super::*;
use crate::testing::MockClient;
use std::time::Instant;
use wasend_core::records::{ContactInput, GroupInput, TemplateInput};

fn messaging(bulk_delay_ms: u64) -> MessagingConfig {
    MessagingConfig {
        bulk_delay_ms,
        max_bulk_recipients: 5,
        max_message_len: 100,
    }
}

fn dispatcher(
    client: &Arc<MockClient>,
    store: &Store,
) -> (Dispatcher, broadcast::Receiver<ServerEvent>) {
    let (tx, rx) = broadcast::channel(64);
    let client: Arc<dyn MessagingClient> = client.clone();
    (
        Dispatcher::new(client, store.clone(), messaging(0), tx),
        rx,
    )
}

fn phones(list: &[&str]) -> Vec<RecipientInput> {
    list.iter()
        .map(|p| RecipientInput::Phone(p.to_string()))
        .collect()
}

async fn add_contact(store: &Store, first: &str, phone: &str) -> Contact {
    store
        .create_contact(ContactInput {
            first_name: first.into(),
            last_name: "Lima".into(),
            phone: phone.into(),
            ..Default::default()
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_single_send_logs_and_announces() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let (d, mut events) = dispatcher(&client, &store);

    let report = d
        .send_single(SingleRequest {
            recipient: Some("+55 11 99988-7766".into()),
            message: "hello".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(report.recipient, "5511999887766@s.whatsapp.net");
    assert_eq!(report.message_id, "MSG1");

    let page = store.list_logs(10, 0).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].status, LogStatus::Sent);
    assert_eq!(page.items[0].kind, LogKind::Single);
    assert_eq!(page.items[0].message_id.as_deref(), Some("MSG1"));

    match events.try_recv().unwrap() {
        ServerEvent::NewMessageLog(log) => assert_eq!(Some(log.id), report.log_id),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_single_send_requires_connection() {
    let client = Arc::new(MockClient::new());
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let err = d
        .send_single(SingleRequest {
            recipient: Some("5511999887766".into()),
            message: "hello".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WasendError::NotConnected));
    assert!(client.sent().is_empty());
}

#[tokio::test]
async fn test_single_send_failure_is_logged() {
    let client = Arc::new(MockClient::connected());
    client.fail_sends_to("5511999887766@s.whatsapp.net");
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let err = d
        .send_single(SingleRequest {
            recipient: Some("5511999887766".into()),
            message: "hello".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WasendError::Client(_)));

    let log = &store.list_logs(1, 0).await.unwrap().items[0];
    assert_eq!(log.status, LogStatus::Failed);
    assert!(log.error.as_deref().unwrap().contains("rejected"));
}

#[tokio::test]
async fn test_single_send_renders_template_for_contact() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let contact = add_contact(&store, "Ana", "5511911112222").await;
    let template = store
        .create_template(TemplateInput {
            name: "greet".into(),
            body: "Oi {firstName} {lastName}, code {code}{missing}".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let (d, _events) = dispatcher(&client, &store);

    let mut variables = HashMap::new();
    variables.insert("code".to_string(), "42".to_string());
    d.send_single(SingleRequest {
        recipient: None,
        message: String::new(),
        template_id: Some(template.id),
        contact_id: Some(contact.id),
        variables,
    })
    .await
    .unwrap();

    assert_eq!(
        client.sent(),
        vec![(
            "5511911112222@s.whatsapp.net".to_string(),
            "Oi Ana Lima, code 42".to_string()
        )]
    );
}

#[tokio::test]
async fn test_single_send_validation() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let empty = d
        .send_single(SingleRequest {
            recipient: Some("123".into()),
            message: "  ".into(),
            ..Default::default()
        })
        .await;
    assert!(matches!(empty, Err(WasendError::Validation(_))));

    let bad_number = d
        .send_single(SingleRequest {
            recipient: Some("call me".into()),
            message: "hi".into(),
            ..Default::default()
        })
        .await;
    assert!(matches!(bad_number, Err(WasendError::InvalidRecipient(_))));

    let too_long = d
        .send_single(SingleRequest {
            recipient: Some("123".into()),
            message: "x".repeat(101),
            ..Default::default()
        })
        .await;
    assert!(matches!(too_long, Err(WasendError::Validation(_))));
}

#[tokio::test]
async fn test_bulk_preserves_order_and_counts() {
    let client = Arc::new(MockClient::connected());
    client.fail_sends_to("222@s.whatsapp.net");
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let report = d
        .send_bulk(BulkRequest {
            recipients: phones(&["111", "222", "not-a-number", "444"]),
            message: "promo".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let order: Vec<&str> = report.results.iter().map(|r| r.recipient.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "111@s.whatsapp.net",
            "222@s.whatsapp.net",
            "not-a-number",
            "444@s.whatsapp.net"
        ]
    );
    let flags: Vec<bool> = report.results.iter().map(|r| r.success).collect();
    assert_eq!(flags, vec![true, false, false, true]);
    assert_eq!(
        report.summary,
        BulkSummary {
            total: 4,
            successful: 2,
            failed: 2
        }
    );

    let log = &store.list_logs(1, 0).await.unwrap().items[0];
    assert_eq!(log.kind, LogKind::Bulk);
    assert_eq!(log.status, LogStatus::Sent);
    assert_eq!(log.summary, Some(report.summary));
    assert_eq!(log.recipients.len(), 4);
    assert!(log.recipients[1].error.is_some());
}

#[tokio::test]
async fn test_bulk_all_failed_logs_failure() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let report = d
        .send_bulk(BulkRequest {
            recipients: phones(&["abc", "def"]),
            message: "promo".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(report.summary.failed, 2);
    let log = &store.list_logs(1, 0).await.unwrap().items[0];
    assert_eq!(log.status, LogStatus::Failed);
}

#[tokio::test]
async fn test_bulk_rejects_empty_and_oversized() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let empty = d
        .send_bulk(BulkRequest {
            message: "hi".into(),
            ..Default::default()
        })
        .await;
    assert!(matches!(empty, Err(WasendError::Validation(_))));

    let too_many = d
        .send_bulk(BulkRequest {
            recipients: phones(&["1", "2", "3", "4", "5", "6"]),
            message: "hi".into(),
            ..Default::default()
        })
        .await;
    assert!(matches!(too_many, Err(WasendError::Validation(_))));
    assert!(client.sent().is_empty());
}

#[tokio::test]
async fn test_bulk_requires_connection() {
    let client = Arc::new(MockClient::new());
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let err = d
        .send_bulk(BulkRequest {
            recipients: phones(&["1"]),
            message: "hi".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WasendError::NotConnected));
    assert_eq!(store.log_stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_bulk_personalizes_and_expands_group_and_contacts() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let ana = add_contact(&store, "Ana", "100").await;
    let bia = add_contact(&store, "Bia", "200").await;
    let cy = add_contact(&store, "Cy", "300").await;
    let group = store
        .create_group(GroupInput {
            name: "vip".into(),
            members: vec![bia.id, cy.id],
            ..Default::default()
        })
        .await
        .unwrap();
    let (d, _events) = dispatcher(&client, &store);

    let detailed: RecipientInput =
        serde_json::from_str(r#"{"phone":"999","name":"Dora Maria"}"#).unwrap();
    d.send_bulk(BulkRequest {
        recipients: vec![detailed],
        message: "Hi {firstName}!".into(),
        group_id: Some(group.id),
        contact_ids: vec![ana.id],
        ..Default::default()
    })
    .await
    .unwrap();

    let texts: Vec<(String, String)> = client.sent();
    assert_eq!(
        texts,
        vec![
            ("999@s.whatsapp.net".to_string(), "Hi Dora!".to_string()),
            ("100@s.whatsapp.net".to_string(), "Hi Ana!".to_string()),
            ("200@s.whatsapp.net".to_string(), "Hi Bia!".to_string()),
            ("300@s.whatsapp.net".to_string(), "Hi Cy!".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_bulk_sleeps_between_sends_only() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let started = Instant::now();
    d.send_bulk(BulkRequest {
        recipients: phones(&["1", "2", "3"]),
        message: "hi".into(),
        delay_ms: Some(40),
        ..Default::default()
    })
    .await
    .unwrap();
    let elapsed = started.elapsed();
    // Two gaps for three sends.
    assert!(elapsed >= Duration::from_millis(80), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
}

#[tokio::test]
async fn test_bulk_keeps_going_after_connection_drops() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    // Drop the connection once two messages are out, as a reset would.
    let dropper = tokio::spawn({
        let client = client.clone();
        async move {
            crate::testing::eventually(|| async { client.sent().len() == 2 }).await;
            client.set_connected(false);
        }
    });

    let report = d
        .send_bulk(BulkRequest {
            recipients: phones(&["1", "2", "3", "4"]),
            message: "hi".into(),
            delay_ms: Some(60),
            ..Default::default()
        })
        .await
        .unwrap();
    dropper.await.unwrap();

    let order: Vec<&str> = report.results.iter().map(|r| r.recipient.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "1@s.whatsapp.net",
            "2@s.whatsapp.net",
            "3@s.whatsapp.net",
            "4@s.whatsapp.net"
        ]
    );
    let flags: Vec<bool> = report.results.iter().map(|r| r.success).collect();
    assert_eq!(flags, vec![true, true, false, false]);
    for failed in &report.results[2..] {
        assert_eq!(failed.error.as_deref(), Some("WhatsApp not connected"));
    }
    assert_eq!(
        report.summary,
        BulkSummary {
            total: 4,
            successful: 2,
            failed: 2
        }
    );

    let log = &store.list_logs(1, 0).await.unwrap().items[0];
    assert_eq!(log.status, LogStatus::Sent);
    assert_eq!(log.recipients.len(), 4);
    assert!(log.recipients[3].error.is_some());
}

#[tokio::test]
async fn test_bulk_marks_group_targets() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let report = d
        .send_bulk(BulkRequest {
            recipients: phones(&["120363001234567890@g.us", "555"]),
            message: "hi".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(report.results[0].group);
    assert!(!report.results[1].group);

    let json = serde_json::to_value(&report.results).unwrap();
    assert_eq!(json[0]["group"], true);
    assert!(json[1].get("group").is_none());
}

#[tokio::test]
async fn test_bulk_accepts_numeric_phones() {
    let client = Arc::new(MockClient::connected());
    let store = Store::memory();
    let (d, _events) = dispatcher(&client, &store);

    let recipients: Vec<RecipientInput> =
        serde_json::from_str(r#"[5511999887766, "5511911112222"]"#).unwrap();
    assert!(matches!(recipients[0], RecipientInput::Number(5511999887766)));

    let report = d
        .send_bulk(BulkRequest {
            recipients,
            message: "hi {phone}".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(report.summary.successful, 2);
    assert_eq!(
        client.sent()[0],
        (
            "5511999887766@s.whatsapp.net".to_string(),
            "hi 5511999887766".to_string()
        )
    );
}

#[test]
fn test_recipient_input_accepts_both_shapes() {
    let list: Vec<RecipientInput> =
        serde_json::from_str(r#"["123", {"number":"456","firstName":"Eva","contactId":3}]"#)
            .unwrap();
    assert!(matches!(&list[0], RecipientInput::Phone(p) if p == "123"));
    match &list[1] {
        RecipientInput::Detailed(d) => {
            assert_eq!(d.phone.as_deref(), Some("456"));
            assert_eq!(d.first_name.as_deref(), Some("Eva"));
            assert_eq!(d.contact_id, Some(3));
        }
        other => panic!("unexpected {other:?}"),
    }
}
