use acctkeep_core::export;
use acctkeep_core::query;
use acctkeep_core::{
    ConflictPolicy, EntryService, Error, ImportOptions, Importer, RawFields, RecordId,
    RecordStore, RecordType, ValidationError,
};
use pretty_assertions::assert_eq;

fn raw(pairs: &[(&str, &str)]) -> RawFields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn populated(svc: &EntryService) -> RecordStore {
    let store = RecordStore::in_memory();
    svc.add(
        &store,
        RecordType::Email,
        &raw(&[
            ("fullName", "Jo March"),
            ("username", "jo@x.com"),
            ("password", "p"),
            ("gender", "female"),
            ("phone", "555-0100"),
        ]),
    )
    .await
    .unwrap();
    svc.add(
        &store,
        RecordType::Website,
        &raw(&[
            ("websiteName", "GitHub"),
            ("username", "octo"),
            ("password", "pw"),
            ("category", "Work"),
        ]),
    )
    .await
    .unwrap();
    svc.add(
        &store,
        RecordType::Website,
        &raw(&[("websiteName", "Mastodon"), ("username", "jo@x.com")]),
    )
    .await
    .unwrap();
    store
}

#[tokio::test]
async fn scenario_a_first_record_gets_id_one() {
    let svc = EntryService::default();
    let store = RecordStore::in_memory();

    let id = svc
        .add(
            &store,
            RecordType::Email,
            &raw(&[("fullName", "Jo"), ("username", "jo@x.com"), ("password", "p")]),
        )
        .await
        .unwrap();

    assert_eq!(id, RecordId(1));
    let all = store.get_all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].kind.field("fullName"), Some("Jo"));
    assert_eq!(all[0].kind.password(), "p");
    assert_eq!(all[0].created_at, all[0].updated_at);
}

#[tokio::test]
async fn export_then_import_into_empty_store_round_trips() {
    let svc = EntryService::default();
    let source = populated(&svc).await;
    let json = export::to_json(&source.get_all().await).unwrap();

    let target = RecordStore::in_memory();
    let summary = Importer::new(&target, &svc)
        .import_json(&json, &mut ConflictPolicy::AlwaysSkip)
        .await
        .unwrap();
    assert_eq!(summary.added, 3);

    let kinds = |records: Vec<acctkeep_core::Record>| {
        records.into_iter().map(|r| r.kind).collect::<Vec<_>>()
    };
    assert_eq!(kinds(target.get_all().await), kinds(source.get_all().await));
}

#[tokio::test]
async fn importing_same_batch_twice_adds_nothing_the_second_time() {
    let svc = EntryService::default();
    let source = populated(&svc).await;
    let json = export::to_json(&source.get_all().await).unwrap();

    let target = RecordStore::in_memory();
    let importer = Importer::new(&target, &svc);
    importer
        .import_json(&json, &mut ConflictPolicy::AlwaysReplace)
        .await
        .unwrap();
    let second = importer
        .import_json(&json, &mut ConflictPolicy::AlwaysReplace)
        .await
        .unwrap();

    assert_eq!((second.added, second.replaced, second.skipped), (0, 0, 3));
    assert_eq!(target.len().await, 3);
}

#[tokio::test]
async fn reimporting_entries_without_password_keeps_stored_password() {
    let svc = EntryService::default();
    let store = RecordStore::in_memory();
    let payload = r#"[{"type": "website", "websiteName": "GitHub", "username": "octo"}]"#;
    let importer = Importer::new(&store, &svc);

    let first = importer
        .import_json(payload, &mut ConflictPolicy::AlwaysReplace)
        .await
        .unwrap();
    assert_eq!(first.added, 1);
    let before = store.get_all().await;
    assert_eq!(before[0].kind.password().len(), 16);

    let second = importer
        .import_json(payload, &mut ConflictPolicy::AlwaysReplace)
        .await
        .unwrap();

    assert_eq!((second.added, second.replaced, second.skipped), (0, 0, 1));
    assert_eq!(store.get_all().await, before);
}

#[tokio::test]
async fn replacing_with_entry_without_password_keeps_stored_password() {
    let svc = EntryService::default();
    let store = RecordStore::in_memory();
    svc.add(
        &store,
        RecordType::Website,
        &raw(&[("websiteName", "GitHub"), ("username", "octo"), ("password", "kept")]),
    )
    .await
    .unwrap();

    let payload =
        r#"[{"type": "website", "websiteName": "GitHub", "username": "octo", "category": "Work"}]"#;
    let summary = Importer::new(&store, &svc)
        .import_json(payload, &mut ConflictPolicy::AlwaysReplace)
        .await
        .unwrap();

    assert_eq!(summary.replaced, 1);
    let stored = &store.get_all().await[0];
    assert_eq!(stored.kind.password(), "kept");
    assert_eq!(stored.kind.field("category"), Some("Work"));
}

#[tokio::test]
async fn scenario_b_second_entry_conflicts_with_the_first_under_live_visibility() {
    let svc = EntryService::default();
    let store = RecordStore::in_memory();
    let payload = r#"[
        {"type": "website", "websiteName": "GitHub", "username": "octo", "password": "one"},
        {"type": "website", "websiteName": "GitHub", "username": "octo", "password": "two"}
    ]"#;

    let summary = Importer::new(&store, &svc)
        .with_options(ImportOptions::default())
        .import_json(payload, &mut ConflictPolicy::AlwaysSkip)
        .await
        .unwrap();

    assert_eq!((summary.added, summary.replaced, summary.skipped), (1, 0, 1));
}

#[tokio::test]
async fn scenario_c_unknown_type_fails_only_that_entry() {
    let svc = EntryService::default();
    let store = RecordStore::in_memory();
    let payload = r#"[
        {"type": "email", "fullName": "Jo", "username": "jo@x.com", "password": "p"},
        {"type": "social", "handle": "@jo"}
    ]"#;

    let summary = Importer::new(&store, &svc)
        .import_json(payload, &mut ConflictPolicy::AlwaysSkip)
        .await
        .unwrap();

    assert_eq!(summary.added, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(
        summary.failures[0].error,
        ValidationError::UnsupportedType("social".to_string())
    );
}

#[tokio::test]
async fn scenario_d_edit_keeps_id_and_created_at() {
    let svc = EntryService::default();
    let store = populated(&svc).await;
    let before = store.get(RecordId(1)).await.unwrap();

    let after = svc
        .edit(&store, RecordId(1), &raw(&[("phone", "555-0199")]))
        .await
        .unwrap();

    assert_eq!(after.id, before.id);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(after.kind.field("phone"), Some("555-0199"));
    for key in ["fullName", "username", "password", "gender"] {
        assert_eq!(after.kind.field(key), before.kind.field(key), "{key}");
    }
}

#[tokio::test]
async fn filter_on_store_contents() {
    let svc = EntryService::default();
    let store = populated(&svc).await;
    let records = store.get_all().await;

    assert_eq!(query::filter(&records, "").len(), 3);
    let jo: Vec<_> = query::filter(&records, "JO@X.COM")
        .into_iter()
        .map(|r| r.display_name().to_string())
        .collect();
    assert_eq!(jo, ["jo@x.com", "Mastodon"]);
}

#[tokio::test]
async fn store_survives_reopen_and_rejects_bad_import() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accounts.db.json");
    let svc = EntryService::default();

    let store = RecordStore::open(&path).await.unwrap();
    svc.add(
        &store,
        RecordType::Website,
        &raw(&[("websiteName", "GitHub"), ("username", "octo"), ("password", "pw")]),
    )
    .await
    .unwrap();
    let err = Importer::new(&store, &svc)
        .import_json(r#"{"not": "an array"}"#, &mut ConflictPolicy::AlwaysReplace)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
    store.close().await.unwrap();

    let reopened = RecordStore::open(&path).await.unwrap();
    assert_eq!(reopened.len().await, 1);
}
