//! Integration tests for projecting work items into wire resources

mod common;

use std::sync::{Arc, Mutex};

use common::{payload, stubs, Fixture};
use serde_json::{json, Value};
use uuid::Uuid;
use workitem_convert::store::Ancestor;
use workitem_convert::{
    ConvertError, FnInclude, HasChildren, Include, OperationKind, ParentOf, WorkItemResource,
    HAS_CHILDREN_META,
};
use workitem_fields::system::{SYSTEM_CODEBASE, SYSTEM_DESCRIPTION, SYSTEM_TITLE};
use workitem_fields::{CodebaseContent, FieldValue, MarkupContent, WorkItem, WorkItemType};

#[tokio::test]
async fn test_projection_round_trips_through_patch() {
    let fx = Fixture::new();
    let alice = fx.stores.add_user("alice");
    let backend = fx.stores.add_label("backend");
    let todo = fx.stores.add_board_column("To Do");
    let sprint = fx.stores.add_iteration(fx.space.space_id, "Sprint 1");
    let mut original = fx.item();

    let body = payload(json!({
        "type": "workitems",
        "attributes": {
            "version": 1,
            "system.title": "Fix login",
            "system.description": { "content": "**bold** move", "markup": "Markdown" },
            "points": 3
        },
        "relationships": {
            "assignees": { "data": stubs("identities", &[alice]) },
            "labels": { "data": stubs("labels", &[backend]) },
            "boardcolumns": { "data": stubs("boardcolumns", &[todo]) },
            "iteration": { "data": { "id": sprint.to_string(), "type": "iterations" } }
        }
    }));
    fx.apply(&body, &mut original, OperationKind::Create)
        .await
        .unwrap();

    let resource = fx
        .projector
        .to_wire(&fx.bug, &original, &[], &fx.cancel)
        .await
        .unwrap();
    let wire: WorkItemResource =
        serde_json::from_value(serde_json::to_value(&resource).unwrap()).unwrap();

    let mut copy = WorkItem::new(original.id, original.space_id, original.type_id)
        .with_number(original.number);
    fx.apply(&wire, &mut copy, OperationKind::Update)
        .await
        .unwrap();

    assert_eq!(copy, original);
}

#[tokio::test]
async fn test_absent_relationships_are_emitted_with_defaults() {
    let fx = Fixture::new();
    let item = fx.item();

    let resource = fx
        .projector
        .to_wire(&fx.bug, &item, &[], &fx.cancel)
        .await
        .unwrap();
    let wire = serde_json::to_value(&resource).unwrap();
    let rels = &wire["relationships"];

    assert_eq!(rels["assignees"]["data"], Value::Null);
    assert_eq!(rels["labels"]["data"], json!([]));
    assert!(rels["labels"]["links"]["related"]
        .as_str()
        .unwrap()
        .ends_with(&format!("workitems/{}/labels", item.id)));
    assert_eq!(rels["boardcolumns"]["data"], json!([]));
    assert_eq!(rels["creator"]["data"], Value::Null);
    assert_eq!(rels["iteration"]["data"], Value::Null);
    assert_eq!(rels["area"]["data"], Value::Null);
    assert_eq!(rels["baseType"]["data"]["id"], json!(fx.bug.id.to_string()));
    assert_eq!(rels["space"]["data"]["id"], json!(fx.space.space_id.to_string()));
    assert!(rels["children"]["links"]["related"].is_string());
    assert!(rels["events"]["links"]["related"].is_string());
    assert!(rels["workItemLinks"]["links"]["related"].is_string());
    assert!(rels["comments"]["links"]["related"].is_string());

    assert_eq!(wire["attributes"]["version"], Value::Null);
    assert_eq!(wire["attributes"]["system.number"], json!(7));
    assert_eq!(
        wire["links"]["self"],
        json!(format!("http://localhost:8080/api/workitems/{}", item.id))
    );
}

#[tokio::test]
async fn test_title_is_html_escaped_and_description_rendered() {
    let fx = Fixture::new();
    let item = fx
        .item()
        .with_field(SYSTEM_TITLE, FieldValue::String("a < b".into()))
        .with_field(
            SYSTEM_DESCRIPTION,
            FieldValue::Markup(MarkupContent::new("**bold**", "Markdown")),
        );

    let resource = fx
        .projector
        .to_wire(&fx.bug, &item, &[], &fx.cancel)
        .await
        .unwrap();

    let attrs = &resource.attributes;
    assert_eq!(attrs["system.title"], json!("a &lt; b"));
    assert_eq!(attrs["system.description"], json!("**bold**"));
    assert_eq!(attrs["system.description.markup"], json!("Markdown"));
    assert!(attrs["system.description.rendered"]
        .as_str()
        .unwrap()
        .contains("<strong>bold</strong>"));
}

#[tokio::test]
async fn test_title_escaping_leaves_slashes_alone() {
    let fx = Fixture::new();
    let item = fx
        .item()
        .with_field(SYSTEM_TITLE, FieldValue::String("Fix a/b <x> 'q'".into()));

    let resource = fx
        .projector
        .to_wire(&fx.bug, &item, &[], &fx.cancel)
        .await
        .unwrap();

    let title = resource.attributes["system.title"].as_str().unwrap();
    assert!(title.starts_with("Fix a/b &lt;x&gt; "));
    assert!(!title.contains("&#x2F;"));
    assert!(!title.contains('\''));
}

#[tokio::test]
async fn test_codebase_adds_edit_link() {
    let fx = Fixture::new();
    let codebase_id = Uuid::new_v4();
    let item = fx.item().with_field(
        SYSTEM_CODEBASE,
        FieldValue::Codebase(
            CodebaseContent::new("https://github.com/acme/app").with_codebase_id(codebase_id),
        ),
    );

    let resource = fx
        .projector
        .to_wire(&fx.bug, &item, &[], &fx.cancel)
        .await
        .unwrap();

    assert_eq!(
        resource.attributes["system.codebase"]["repository"],
        json!("https://github.com/acme/app")
    );
    let edit = resource.links.unwrap().edit_codebase.unwrap();
    assert!(edit.ends_with(&format!("codebases/{codebase_id}/edit")));
}

#[tokio::test]
async fn test_type_mismatch_is_internal() {
    let fx = Fixture::new();
    let other = WorkItemType::new(Uuid::new_v4(), "Task");

    let err = fx
        .projector
        .to_wire(&other, &fx.item(), &[], &fx.cancel)
        .await
        .unwrap_err();
    assert!(err.is_internal());
}

#[tokio::test]
async fn test_to_wire_many_requires_matching_lengths() {
    let fx = Fixture::new();
    let items = vec![fx.item(), fx.item()];

    let err = fx
        .projector
        .to_wire_many(std::slice::from_ref(&fx.bug), &items, &[], &fx.cancel)
        .await
        .unwrap_err();
    assert!(err.is_internal());
    assert!(err.to_string().contains("length mismatch"));

    let types = vec![fx.bug.clone(), fx.bug.clone()];
    let resources = fx
        .projector
        .to_wire_many(&types, &items, &[], &fx.cancel)
        .await
        .unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[1].id, Some(items[1].id));
}

#[tokio::test]
async fn test_includes_run_in_order() {
    let fx = Fixture::new();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let first_calls = calls.clone();
    let first = FnInclude(
        move |_: &WorkItem, resource: &mut WorkItemResource| -> workitem_convert::Result<()> {
            first_calls.lock().unwrap().push("first");
            resource.attributes.insert("trace".into(), json!(["first"]));
            Ok(())
        },
    );
    let second_calls = calls.clone();
    let second = FnInclude(
        move |_: &WorkItem, resource: &mut WorkItemResource| -> workitem_convert::Result<()> {
            second_calls.lock().unwrap().push("second");
            if let Some(Value::Array(trace)) = resource.attributes.get_mut("trace") {
                trace.push(json!("second"));
            }
            Ok(())
        },
    );
    let includes: [&dyn Include; 2] = [&first, &second];

    let resource = fx
        .projector
        .to_wire(&fx.bug, &fx.item(), &includes, &fx.cancel)
        .await
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    assert_eq!(resource.attributes["trace"], json!(["first", "second"]));
}

#[tokio::test]
async fn test_first_failing_include_aborts() {
    let fx = Fixture::new();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let failing = FnInclude(
        |_: &WorkItem, _: &mut WorkItemResource| -> workitem_convert::Result<()> {
            Err(ConvertError::internal("hook exploded"))
        },
    );
    let later_calls = calls.clone();
    let later = FnInclude(
        move |_: &WorkItem, _: &mut WorkItemResource| -> workitem_convert::Result<()> {
            later_calls.lock().unwrap().push("later");
            Ok(())
        },
    );
    let includes: [&dyn Include; 2] = [&failing, &later];

    let err = fx
        .projector
        .to_wire(&fx.bug, &fx.item(), &includes, &fx.cancel)
        .await
        .unwrap_err();

    assert!(err.is_internal());
    assert!(err.to_string().contains("hook exploded"));
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_has_children_sets_meta() {
    let fx = Fixture::new();
    let parent = fx.item();
    let leaf = fx.item();
    fx.stores.add_child(parent.id, leaf.clone());
    let has_children = HasChildren::new(fx.stores.collaborators().work_item_links);
    let includes: [&dyn Include; 1] = [&has_children];

    let resource = fx
        .projector
        .to_wire(&fx.bug, &parent, &includes, &fx.cancel)
        .await
        .unwrap();
    let meta = resource.relationships.unwrap().children.unwrap().meta.unwrap();
    assert_eq!(meta[HAS_CHILDREN_META], json!(true));

    let resource = fx
        .projector
        .to_wire(&fx.bug, &leaf, &includes, &fx.cancel)
        .await
        .unwrap();
    let meta = resource.relationships.unwrap().children.unwrap().meta.unwrap();
    assert_eq!(meta[HAS_CHILDREN_META], json!(false));
    assert_eq!(fx.stores.children_queries(), 2);
}

#[tokio::test]
async fn test_has_children_prefers_supplied_links() {
    let fx = Fixture::new();
    let parent = fx.item();
    let child = fx.item();
    fx.stores.add_child(parent.id, child.clone());
    let links = vec![workitem_convert::store::WorkItemLink {
        id: Uuid::new_v4(),
        link_type_id: workitem_convert::PARENT_CHILD_LINK_TYPE_ID,
        source_id: parent.id,
        target_id: child.id,
    }];
    let has_children = HasChildren::with_links(fx.stores.collaborators().work_item_links, links);
    let includes: [&dyn Include; 1] = [&has_children];

    fx.projector
        .to_wire(&fx.bug, &parent, &includes, &fx.cancel)
        .await
        .unwrap();
    assert_eq!(fx.stores.children_queries(), 0);
}

#[tokio::test]
async fn test_has_children_failure_propagates() {
    let fx = Fixture::new();
    fx.stores.fail_children_queries(true);
    let has_children = HasChildren::new(fx.stores.collaborators().work_item_links);
    let includes: [&dyn Include; 1] = [&has_children];

    let err = fx
        .projector
        .to_wire(&fx.bug, &fx.item(), &includes, &fx.cancel)
        .await
        .unwrap_err();
    assert!(err.is_internal());
    assert!(err.to_string().contains("has children"));
}

#[tokio::test]
async fn test_parent_of_uses_ancestors_then_store() {
    let fx = Fixture::new();
    let parent = fx.item();
    let child = fx.item();
    fx.stores.add_child(parent.id, child.clone());
    let store = fx.stores.collaborators().work_item_links;

    let from_store = ParentOf::new(store.clone(), fx.projector.links().clone());
    let includes: [&dyn Include; 1] = [&from_store];
    let resource = fx
        .projector
        .to_wire(&fx.bug, &child, &includes, &fx.cancel)
        .await
        .unwrap();
    let relation = resource.relationships.unwrap().parent.unwrap();
    assert_eq!(relation.data.unwrap().id, parent.id.to_string());

    let elsewhere = Uuid::new_v4();
    let from_ancestors = ParentOf::new(store, fx.projector.links().clone()).with_ancestors(vec![
        Ancestor {
            id: child.id,
            parent_id: Some(elsewhere),
        },
    ]);
    let includes: [&dyn Include; 1] = [&from_ancestors];
    let resource = fx
        .projector
        .to_wire(&fx.bug, &child, &includes, &fx.cancel)
        .await
        .unwrap();
    let relation = resource.relationships.unwrap().parent.unwrap();
    assert_eq!(relation.data.unwrap().id, elsewhere.to_string());

    let resource = fx
        .projector
        .to_wire(&fx.bug, &parent, &includes, &fx.cancel)
        .await
        .unwrap();
    assert_eq!(resource.relationships.unwrap().parent.unwrap().data, None);
}

#[tokio::test]
async fn test_list_children_pages_with_meta() {
    let fx = Fixture::new();
    let parent = fx.item();
    let children: Vec<WorkItem> = (0..3).map(|_| fx.item()).collect();
    for child in &children {
        fx.stores.add_child(parent.id, child.clone());
    }

    let page = fx
        .projector
        .list_children(parent.id, 1, 1, &fx.cancel)
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, Some(children[1].id));
    let meta = page.items[0]
        .relationships
        .as_ref()
        .unwrap()
        .children
        .as_ref()
        .unwrap()
        .meta
        .as_ref()
        .unwrap();
    assert_eq!(meta[HAS_CHILDREN_META], json!(false));
}

#[tokio::test]
async fn test_cancelled_include_fails() {
    let fx = Fixture::new();
    let has_children = HasChildren::new(fx.stores.collaborators().work_item_links);
    let includes: [&dyn Include; 1] = [&has_children];
    fx.cancel.cancel();

    let err = fx
        .projector
        .to_wire(&fx.bug, &fx.item(), &includes, &fx.cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}
