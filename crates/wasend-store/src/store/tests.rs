use super::Store;
use chrono::Utc;
use wasend_core::error::WasendError;
use wasend_core::records::{
    BulkSummary, ContactInput, GroupInput, LogKind, LogRecipient, LogStatus, MessageLog,
    TemplateInput,
};

fn contact_input(first: &str, phone: &str) -> ContactInput {
    ContactInput {
        first_name: first.into(),
        last_name: "Silva".into(),
        phone: phone.into(),
        ..Default::default()
    }
}

fn log_entry(status: LogStatus, kind: LogKind) -> MessageLog {
    MessageLog {
        id: 0,
        recipients: vec![LogRecipient {
            name: None,
            phone: "5511999887766@s.whatsapp.net".into(),
            error: None,
        }],
        message: "hello".into(),
        status,
        error: None,
        kind,
        template_id: None,
        message_id: None,
        summary: None,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_contact_round_trip_and_not_found_after_delete() {
    let store = Store::memory();
    let created = store
        .create_contact(contact_input(" Ana ", "+55 11 99988-7766"))
        .await
        .unwrap();
    assert_eq!(created.id, 1);
    assert_eq!(created.first_name, "Ana");

    let fetched = store.get_contact(created.id).await.unwrap();
    assert_eq!(fetched, created);

    store.delete_contact(created.id).await.unwrap();
    let err = store.get_contact(created.id).await.unwrap_err();
    assert!(matches!(err, WasendError::NotFound { kind: "contact", id: 1 }));
}

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() {
    let store = Store::memory();
    let a = store.create_contact(contact_input("A", "1")).await.unwrap();
    store.delete_contact(a.id).await.unwrap();
    let b = store.create_contact(contact_input("B", "2")).await.unwrap();
    assert_eq!(b.id, 2);
}

#[tokio::test]
async fn test_invalid_contact_rejected() {
    let store = Store::memory();
    let err = store
        .create_contact(contact_input("Ana", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, WasendError::Validation(_)));
    assert!(store.list_contacts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_contact_sets_updated_at() {
    let store = Store::memory();
    let c = store.create_contact(contact_input("Ana", "1")).await.unwrap();
    let updated = store
        .update_contact(c.id, contact_input("Ana Maria", "2"))
        .await
        .unwrap();
    assert_eq!(updated.first_name, "Ana Maria");
    assert_eq!(updated.phone, "2");
    assert_eq!(updated.created_at, c.created_at);
    assert!(updated.updated_at.is_some());

    let missing = store.update_contact(99, contact_input("X", "3")).await;
    assert!(matches!(missing, Err(WasendError::NotFound { .. })));
}

#[tokio::test]
async fn test_group_members_skip_deleted_contacts() {
    let store = Store::memory();
    let a = store.create_contact(contact_input("A", "1")).await.unwrap();
    let b = store.create_contact(contact_input("B", "2")).await.unwrap();
    let group = store
        .create_group(GroupInput {
            name: "Team".into(),
            description: String::new(),
            members: vec![b.id, a.id, b.id],
        })
        .await
        .unwrap();
    assert_eq!(group.members, vec![b.id, a.id]);

    store.delete_contact(a.id).await.unwrap();
    // No cascade: the group still lists the deleted id.
    assert_eq!(store.get_group(group.id).await.unwrap().members.len(), 2);

    let members = store.group_members(group.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].first_name, "B");
}

#[tokio::test]
async fn test_template_variables_extracted_when_absent() {
    let store = Store::memory();
    let t = store
        .create_template(TemplateInput {
            name: "Welcome".into(),
            category: String::new(),
            body: "Hi {firstName}, your code is {code}".into(),
            variables: None,
        })
        .await
        .unwrap();
    assert_eq!(t.variables, vec!["firstName", "code"]);
    assert_eq!(t.category, "general");

    let t = store
        .update_template(
            t.id,
            TemplateInput {
                name: "Welcome".into(),
                category: "onboarding".into(),
                body: "Hi {name}".into(),
                variables: Some(vec!["custom".into()]),
            },
        )
        .await
        .unwrap();
    assert_eq!(t.variables, vec!["custom"]);
    assert_eq!(t.category, "onboarding");
}

#[tokio::test]
async fn test_logs_page_newest_first() {
    let store = Store::memory();
    for _ in 0..5 {
        store
            .append_log(log_entry(LogStatus::Sent, LogKind::Single))
            .await
            .unwrap();
    }

    let page = store.list_logs(2, 0).await.unwrap();
    assert_eq!(page.total, 5);
    assert!(page.has_more);
    assert_eq!(
        page.items.iter().map(|l| l.id).collect::<Vec<_>>(),
        vec![5, 4]
    );

    let last = store.list_logs(2, 4).await.unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].id, 1);
    assert!(!last.has_more);
}

#[tokio::test]
async fn test_log_stats_and_clear() {
    let store = Store::memory();
    store
        .append_log(log_entry(LogStatus::Sent, LogKind::Single))
        .await
        .unwrap();
    store
        .append_log(log_entry(LogStatus::Failed, LogKind::Single))
        .await
        .unwrap();
    let mut bulk = log_entry(LogStatus::Sent, LogKind::Bulk);
    bulk.summary = Some(BulkSummary {
        total: 3,
        successful: 2,
        failed: 1,
    });
    store.append_log(bulk).await.unwrap();

    let stats = store.log_stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.sent, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.single, 2);
    assert_eq!(stats.bulk, 1);
    assert_eq!(stats.bulk_messages_sent, 2);

    assert_eq!(store.clear_logs().await.unwrap(), 3);
    assert_eq!(store.log_stats().await.unwrap().total, 0);

    let next = store
        .append_log(log_entry(LogStatus::Sent, LogKind::Single))
        .await
        .unwrap();
    assert_eq!(next.id, 4);
}

#[tokio::test]
async fn test_json_backend_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).await.unwrap();
    store.create_contact(contact_input("Ana", "1")).await.unwrap();
    store.create_contact(contact_input("Bia", "2")).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("contacts.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["lastId"], 2);
    assert_eq!(doc["items"][1]["firstName"], "Bia");
    assert!(!dir.path().join("contacts.json.tmp").exists());

    let reopened = Store::open(dir.path()).await.unwrap();
    let contacts = reopened.list_contacts().await.unwrap();
    assert_eq!(contacts.len(), 2);
    let c = reopened.create_contact(contact_input("Cy", "3")).await.unwrap();
    assert_eq!(c.id, 3);

    let counts = reopened.counts().await.unwrap();
    assert_eq!(counts.contacts, 3);
    assert_eq!(counts.groups, 0);
}

#[tokio::test]
async fn test_json_backend_sees_external_edits() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).await.unwrap();
    std::fs::write(
        dir.path().join("groups.json"),
        r#"{"lastId":7,"items":[{"id":7,"name":"Imported","createdAt":"2024-01-01T00:00:00Z"}]}"#,
    )
    .unwrap();

    let group = store.get_group(7).await.unwrap();
    assert_eq!(group.name, "Imported");
    assert!(group.members.is_empty());
}

#[tokio::test]
async fn test_corrupt_file_is_an_error_and_left_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = Store::open(dir.path()).await.unwrap();
    let err = store.list_templates().await.unwrap_err();
    assert!(matches!(err, WasendError::Store(_)));

    let write = store
        .create_template(TemplateInput {
            name: "x".into(),
            body: "y".into(),
            ..Default::default()
        })
        .await;
    assert!(write.is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}
