//! Integration tests for the CSV export engine

use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;
use uuid::Uuid;
use workitem_convert::test_support::InMemoryStores;
use workitem_convert::CsvExporter;
use workitem_fields::{FieldType, FieldValue, Kind, WorkItem, WorkItemType};

fn title_type() -> WorkItemType {
    WorkItemType::new(Uuid::new_v4(), "T1").with_field(
        "title",
        "Title",
        FieldType::simple(Kind::String),
    )
}

fn points_type() -> WorkItemType {
    WorkItemType::new(Uuid::new_v4(), "T2").with_field(
        "points",
        "Points",
        FieldType::simple(Kind::Integer),
    )
}

fn item_of(work_item_type: &WorkItemType) -> WorkItem {
    WorkItem::new(Uuid::new_v4(), Uuid::new_v4(), work_item_type.id)
}

#[tokio::test]
async fn test_mixed_types_share_one_grid() {
    let stores = InMemoryStores::new();
    let collaborators = stores.collaborators();
    let t1 = title_type();
    let t2 = points_type();
    let items = vec![
        item_of(&t1).with_field("title", FieldValue::String("Fix bug".into())),
        item_of(&t2).with_field("points", FieldValue::Integer(5)),
    ];

    let export = CsvExporter::new(&collaborators)
        .export(&[t1, t2], &items, true, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(export.labels, vec!["_Type", "Points", "Title"]);
    assert_eq!(export.text, "_Type,Points,Title\nT1,,Fix bug\nT2,5,\n");
}

#[tokio::test]
async fn test_header_is_optional() {
    let stores = InMemoryStores::new();
    let collaborators = stores.collaborators();
    let t1 = title_type();
    let items = vec![item_of(&t1).with_field("title", FieldValue::String("a, b".into()))];

    let export = CsvExporter::new(&collaborators)
        .export(&[t1], &items, false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(export.labels, vec!["_Type", "Title"]);
    assert_eq!(export.text, "T1,\"a, b\"\n");
}

#[tokio::test]
async fn test_empty_export() {
    let stores = InMemoryStores::new();
    let collaborators = stores.collaborators();

    let export = CsvExporter::new(&collaborators)
        .export(&[title_type()], &[], true, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(export.text, "");
    assert!(export.labels.is_empty());
}

#[tokio::test]
async fn test_unknown_type_aborts_export() {
    let stores = InMemoryStores::new();
    let collaborators = stores.collaborators();
    let t1 = title_type();
    let stray = item_of(&points_type());
    let items = vec![item_of(&t1), stray.clone()];

    let err = CsvExporter::new(&collaborators)
        .export(&[t1], &items, true, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_internal());
    assert!(err.to_string().contains(&format!(
        "encountered work item {} with unknown work item type {}",
        stray.id, stray.type_id
    )));
}

#[tokio::test]
async fn test_shared_field_keeps_first_label() {
    let stores = InMemoryStores::new();
    let collaborators = stores.collaborators();
    let t1 = title_type();
    let t3 = WorkItemType::new(Uuid::new_v4(), "T3").with_field(
        "title",
        "Headline",
        FieldType::simple(Kind::String),
    );
    let items = vec![
        item_of(&t1).with_field("title", FieldValue::String("one".into())),
        item_of(&t3).with_field("title", FieldValue::String("two".into())),
    ];

    let export = CsvExporter::new(&collaborators)
        .export(&[t1, t3], &items, true, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(export.labels, vec!["_Type", "Title"]);
    assert_eq!(export.text, "_Type,Title\nT1,one\nT3,two\n");
}

#[tokio::test]
#[traced_test]
async fn test_references_resolve_once_per_identifier() {
    let stores = InMemoryStores::new();
    let collaborators = stores.collaborators();
    let alice = stores.add_user("alice");
    let bob = stores.add_user("bob");
    let backend = stores.add_label("backend");
    let ui = stores.add_label("ui");
    let story = WorkItemType::new(Uuid::new_v4(), "Story")
        .with_field("owner", "Owner", FieldType::simple(Kind::User))
        .with_field("tags", "Tags", FieldType::list(Kind::Label));
    let tags = |ids: &[Uuid]| {
        FieldValue::List(ids.iter().copied().map(FieldValue::Reference).collect())
    };
    let items = vec![
        item_of(&story)
            .with_field("owner", FieldValue::Reference(alice))
            .with_field("tags", tags(&[backend, ui])),
        item_of(&story)
            .with_field("owner", FieldValue::Reference(bob))
            .with_field("tags", tags(&[backend])),
        item_of(&story).with_field("owner", FieldValue::Reference(alice)),
    ];

    let export = CsvExporter::new(&collaborators)
        .export(&[story], &items, true, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        export.text,
        "_Type,Owner,Tags\nStory,alice,backend;ui\nStory,bob,backend\nStory,alice,\n"
    );
    assert_eq!(stores.name_loads(), 4);
    assert!(logs_contain("exported work items to CSV"));
}

#[tokio::test]
async fn test_unknown_reference_aborts_export() {
    let stores = InMemoryStores::new();
    let collaborators = stores.collaborators();
    let story = WorkItemType::new(Uuid::new_v4(), "Story").with_field(
        "owner",
        "Owner",
        FieldType::simple(Kind::User),
    );
    let items = vec![item_of(&story).with_field("owner", FieldValue::Reference(Uuid::new_v4()))];

    let err = CsvExporter::new(&collaborators)
        .export(&[story], &items, true, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("failed to retrieve field values"));
}

#[tokio::test]
async fn test_cancelled_export_fails() {
    let stores = InMemoryStores::new();
    let collaborators = stores.collaborators();
    let alice = stores.add_user("alice");
    let story = WorkItemType::new(Uuid::new_v4(), "Story").with_field(
        "owner",
        "Owner",
        FieldType::simple(Kind::User),
    );
    let items = vec![item_of(&story).with_field("owner", FieldValue::Reference(alice))];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = CsvExporter::new(&collaborators)
        .export(&[story], &items, true, &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}
