use serde_json::json;

use flexdata_core::{Collection, DataBag, FieldKey, RowId};
use flexdata_engine::{CollectionSession, ProjectSession, WriteKind};
use flexdata_harness::{FlakyStore, StoreOp, TestWorkspace};
use flexdata_storage::{Catalog, SqliteStorage};

fn titled(title: &str) -> DataBag {
    [("title", json!(title))].into_iter().collect()
}

fn titles(session: &CollectionSession) -> Vec<String> {
    session
        .rows()
        .items()
        .iter()
        .filter_map(|r| r.data.get("title").and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}

/// A flaky store over a fresh database holding one collection with
/// confirmed rows titled `names`.
fn flaky_with_rows(
    names: &[&str],
) -> Result<(FlakyStore<SqliteStorage>, Collection, Vec<RowId>), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let collection = ws.create_collection("list")?;
    let mut session = ws.open(&collection);
    for name in names {
        session.add_row(titled(name))?;
    }
    let report = session.sync(&mut ws.storage);
    assert!(report.is_clean());
    let ids = report.rows.created.iter().map(|(_, id)| *id).collect();
    Ok((FlakyStore::new(ws.storage), collection, ids))
}

#[test]
fn rejected_insert_is_rolled_back() -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, collection, _) = flaky_with_rows(&["kept"])?;
    let mut session = CollectionSession::open(&store, collection.clone());
    store.fail(StoreOp::Create);

    let provisional = session.add_row(titled("doomed"))?;
    session.patch_cell(provisional, &FieldKey::new("title"), json!("still doomed"))?;
    assert_eq!(session.rows().len(), 2);

    let report = session.sync(&mut store);
    assert_eq!(report.rows.rolled_back, vec![provisional]);
    assert_eq!(report.rows.failures.len(), 1);
    let failure = &report.rows.failures[0];
    assert_eq!(failure.kind, WriteKind::Create);
    assert_eq!(failure.id, provisional);
    assert_eq!(failure.error.code.as_deref(), Some("unavailable"));
    assert_eq!(store.rejected(), 1);

    assert_eq!(titles(&session), ["kept"]);
    store.heal_all();
    assert_eq!(titles(&CollectionSession::open(&store, collection)), ["kept"]);
    Ok(())
}

#[test]
fn failed_delete_is_not_restored() -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, collection, ids) = flaky_with_rows(&["a", "b"])?;
    let mut session = CollectionSession::open(&store, collection.clone());
    store.fail(StoreOp::Delete);

    session.remove_row(ids[0])?;
    let report = session.sync(&mut store);
    assert_eq!(report.rows.failures.len(), 1);
    assert_eq!(report.rows.failures[0].kind, WriteKind::Delete);
    assert!(report.rows.rolled_back.is_empty());
    assert_eq!(titles(&session), ["b"]);

    // Only a reload shows the row the store kept.
    session.reload(&store);
    assert_eq!(titles(&session), ["a", "b"]);
    Ok(())
}

#[test]
fn failed_move_is_not_reverted() -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, collection, ids) = flaky_with_rows(&["a", "b"])?;
    let mut session = CollectionSession::open(&store, collection.clone());
    store.fail(StoreOp::Update);

    session.move_row(ids[1], 0)?;
    let report = session.sync(&mut store);
    assert!(!report.is_clean());
    assert_eq!(report.rows.failures[0].kind, WriteKind::Update);
    assert_eq!(titles(&session), ["b", "a"]);

    let fresh = CollectionSession::open(&store, collection);
    assert_eq!(titles(&fresh), ["a", "b"]);
    Ok(())
}

#[test]
fn failed_patch_keeps_local_value() -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, collection, ids) = flaky_with_rows(&["a"])?;
    let mut session = CollectionSession::open(&store, collection.clone());
    store.fail(StoreOp::Update);

    session.patch_cell(ids[0], &FieldKey::new("title"), json!("local"))?;
    let report = session.sync(&mut store);
    assert_eq!(report.rows.failures.len(), 1);
    assert_eq!(titles(&session), ["local"]);
    assert_eq!(store.inner().row_data(collection.id)?, vec![titled("a")]);
    Ok(())
}

#[test]
fn one_failure_does_not_stop_later_writes() -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, collection, ids) = flaky_with_rows(&["a", "b", "c"])?;
    let mut session = CollectionSession::open(&store, collection.clone());
    store.fail(StoreOp::Update);

    session.patch_cell(ids[0], &FieldKey::new("title"), json!("x"))?;
    session.remove_row(ids[2])?;
    let inserted = session.add_row(titled("d"))?;
    let report = session.sync(&mut store);

    assert_eq!(report.rows.failures.len(), 1);
    assert_eq!(report.rows.applied, 1);
    assert_eq!(report.rows.created.len(), 1);
    assert_eq!(report.rows.created[0].0, inserted);

    store.heal_all();
    let fresh = CollectionSession::open(&store, collection);
    assert_eq!(titles(&fresh), ["a", "b", "d"]);
    Ok(())
}

#[test]
fn read_failures_yield_empty_lists() -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, collection, _) = flaky_with_rows(&["a"])?;
    let project = store
        .inner()
        .get_project(collection.project_id)?
        .ok_or("project missing")?;
    store.fail(StoreOp::Read);

    let session = CollectionSession::open(&store, collection.clone());
    assert!(session.rows().is_empty());
    assert!(session.fields().is_empty());

    let project_session = ProjectSession::open(&store, project);
    assert!(project_session.collections().is_empty());
    assert!(project_session.selected().is_none());

    store.heal(StoreOp::Read);
    let mut session = session;
    session.reload(&store);
    assert_eq!(session.rows().len(), 1);
    Ok(())
}

#[test]
fn failed_collection_create_leaves_session_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, collection, _) = flaky_with_rows(&[])?;
    let project = store
        .inner()
        .get_project(collection.project_id)?
        .ok_or("project missing")?;
    let mut project_session = ProjectSession::open(&store, project);
    store.fail(StoreOp::Create);

    assert!(project_session.create_collection(&mut store, "more").is_err());
    assert_eq!(project_session.collections().len(), 1);
    assert_eq!(project_session.selected().map(|c| c.id), Some(collection.id));
    Ok(())
}
