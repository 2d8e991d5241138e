use serde_json::json;

use flexdata_core::{DataBag, FieldDefinition, FieldKey, FieldType, Row, SortKey};
use flexdata_engine::{EngineError, Rendered, ValidationError};
use flexdata_harness::TestWorkspace;
use flexdata_storage::{Catalog, RemoteStore};

fn bag(value: serde_json::Value) -> Result<DataBag, Box<dyn std::error::Error>> {
    Ok(DataBag::try_from(value)?)
}

// ============================================================================
// Row creation and patches
// ============================================================================

#[test]
fn inserted_row_reloads_deep_equal_and_last() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let notes = ws.create_collection("notes")?;
    let mut session = ws.open(&notes);

    session.add_row(bag(json!({"x": "earlier"}))?)?;
    let provisional = session.add_row(bag(json!({"a": 1, "b": 2}))?)?;
    let report = session.sync(&mut ws.storage);
    assert!(report.is_clean());
    assert_eq!(report.rows.created.len(), 2);

    let (from, confirmed) = report.rows.created[1];
    assert_eq!(from, provisional);
    assert!(session.rows().get(provisional).is_none());
    let local = session.rows().get(confirmed).cloned().ok_or("confirmed row missing")?;

    let reloaded = ws.open(&notes);
    let last = reloaded.rows().items().last().ok_or("no rows")?;
    assert_eq!(reloaded.rows().len(), 2);
    assert_eq!(*last, local);
    assert_eq!(last.data, bag(json!({"a": 1, "b": 2}))?);
    assert_eq!(last.sort_key, SortKey::new(2000.0));
    Ok(())
}

#[test]
fn patch_persists_merged_bag() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let notes = ws.create_collection("notes")?;
    let mut session = ws.open(&notes);
    session.add_row(bag(json!({"a": 1, "b": 2}))?)?;
    let report = session.sync(&mut ws.storage);
    let (_, id) = report.rows.created[0];

    session.patch_cell(id, &FieldKey::new("b"), json!(3))?;
    assert_eq!(session.rows().get(id).map(|r| &r.data), Some(&bag(json!({"a": 1, "b": 3}))?));
    assert!(session.sync(&mut ws.storage).is_clean());

    let reloaded = ws.open(&notes);
    assert_eq!(reloaded.rows().items()[0].data, bag(json!({"a": 1, "b": 3}))?);
    Ok(())
}

#[test]
fn patch_before_confirmation_follows_the_new_id() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let notes = ws.create_collection("notes")?;
    let mut session = ws.open(&notes);

    let provisional = session.add_row(bag(json!({"a": 1}))?)?;
    session.patch_cell(provisional, &FieldKey::new("a"), json!("changed"))?;
    let report = session.sync(&mut ws.storage);
    assert!(report.is_clean());
    assert_eq!(report.rows.applied, 1);

    let stored = ws.storage.row_data(notes.id)?;
    assert_eq!(stored, vec![bag(json!({"a": "changed"}))?]);
    Ok(())
}

#[test]
fn required_text_blocks_file_only_submission() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let mut session = ws.collection_with_fields(
        "uploads",
        &[("t", FieldType::ShortText, true), ("u", FieldType::File, false)],
    )?;
    let t = session.fields().items()[0].key.clone();
    let u = session.fields().items()[1].key.clone();

    let file_only: DataBag = [(u.as_str(), json!("https://cdn.example/1700000000000_a.mp3"))]
        .into_iter()
        .collect();
    let err = session.add_row(file_only).err().ok_or("expected validation failure")?;
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::MissingRequired(ref missing)) if missing == &["t"]
    ));
    assert!(session.rows().pending().is_empty());

    let first: DataBag = [(t.as_str(), json!("Hello"))].into_iter().collect();
    let id = session.add_row(first)?;
    assert_eq!(session.rows().get(id).map(|r| r.sort_key), Some(SortKey::new(1000.0)));
    let second: DataBag = [(t.as_str(), json!("World"))].into_iter().collect();
    let id = session.add_row(second)?;
    assert_eq!(session.rows().get(id).map(|r| r.sort_key), Some(SortKey::new(2000.0)));
    assert!(session.sync(&mut ws.storage).is_clean());

    let reloaded = ws.open(session.collection());
    let titles: Vec<_> = reloaded
        .rows()
        .items()
        .iter()
        .map(|r| r.data.get(t.as_str()).cloned())
        .collect();
    assert_eq!(titles, vec![Some(json!("Hello")), Some(json!("World"))]);
    Ok(())
}

// ============================================================================
// Field lifecycle
// ============================================================================

#[test]
fn field_delete_keeps_row_data() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let mut session =
        ws.collection_with_fields("songs", &[("Title", FieldType::ShortText, false)])?;
    let field = session.fields().items()[0].clone();

    let data: DataBag = [(field.key.as_str(), json!("Hello"))].into_iter().collect();
    session.add_row(data.clone())?;
    assert!(session.sync(&mut ws.storage).is_clean());

    session.remove_field(field.id)?;
    assert!(session.sync(&mut ws.storage).is_clean());

    let reloaded = ws.open(session.collection());
    assert!(reloaded.fields().is_empty());
    assert_eq!(reloaded.rows().items()[0].data, data);

    let cells = reloaded.render_rows();
    assert_eq!(cells[0].len(), 1);
    assert_eq!(cells[0][0].label, field.key.as_str());
    assert_eq!(cells[0][0].value, Rendered::Text("Hello".into()));
    Ok(())
}

#[test]
fn field_definition_changes_keep_the_key() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let mut session =
        ws.collection_with_fields("songs", &[("Title", FieldType::ShortText, false)])?;
    let field = session.fields().items()[0].clone();

    session.update_field(
        field.id,
        FieldDefinition {
            label: "  Name ".into(),
            field_type: FieldType::LongText,
            required: true,
        },
    )?;
    assert!(session.sync(&mut ws.storage).is_clean());

    let reloaded = ws.open(session.collection());
    let stored = &reloaded.fields().items()[0];
    assert_eq!(stored.key, field.key);
    assert_eq!(stored.label, "Name");
    assert_eq!(stored.field_type, FieldType::LongText);
    assert!(stored.required);
    Ok(())
}

#[test]
fn blank_field_label_is_rejected_locally() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let notes = ws.create_collection("notes")?;
    let mut session = ws.open(&notes);
    let err = session.add_field("   ", FieldType::Number, false).err().ok_or("expected error")?;
    assert!(matches!(err, EngineError::Validation(ValidationError::BlankName("field"))));
    assert!(session.fields().pending().is_empty());
    Ok(())
}

// ============================================================================
// Catalog and sessions
// ============================================================================

#[test]
fn collection_delete_needs_matching_name() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let mut project = ws.project_session();
    let songs = project.create_collection(&mut ws.storage, "Songs")?.clone();
    project.create_collection(&mut ws.storage, "Settings")?;

    let mut session = ws.open(&songs);
    session.add_row(bag(json!({"title": "a"}))?)?;
    assert!(session.sync(&mut ws.storage).is_clean());

    let err = project
        .delete_collection(&mut ws.storage, songs.id, "songs")
        .err()
        .ok_or("expected mismatch")?;
    assert!(matches!(
        err,
        EngineError::ConfirmationMismatch { ref expected } if expected == "Songs"
    ));
    assert_eq!(ws.storage.list_collections(ws.project.id)?.len(), 2);

    project.delete_collection(&mut ws.storage, songs.id, "Songs")?;
    assert_eq!(project.collections().len(), 1);
    assert_eq!(project.selected().map(|c| c.name.as_str()), Some("Settings"));
    assert!(ws.storage.get_collection(songs.id)?.is_none());
    assert!(RemoteStore::<Row>::fetch_ordered(&ws.storage, songs.id)?.is_empty());
    Ok(())
}

#[test]
fn selection_falls_back_to_first_collection() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let first = ws.create_collection("first")?;
    let second = ws.create_collection("second")?;

    let mut project = ws.project_session();
    assert_eq!(project.selected().map(|c| c.id), Some(first.id));
    assert_eq!(project.select(second.id).map(|c| c.id), Some(second.id));
    assert_eq!(
        project.select(flexdata_core::CollectionId::new()).map(|c| c.id),
        Some(first.id)
    );

    let opened = project.open_selected(&ws.storage)?;
    assert_eq!(opened.collection().id, first.id);
    Ok(())
}

#[test]
fn project_rename_skips_unchanged_name() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new()?;
    let mut project = ws.project_session();
    assert!(!project.rename_project(&mut ws.storage, " Test Project ")?);
    assert!(project.rename_project(&mut ws.storage, "Renamed")?);
    assert_eq!(
        ws.storage.get_project(ws.project.id)?.map(|p| p.name),
        Some("Renamed".to_string())
    );
    Ok(())
}

#[test]
fn second_connection_last_write_wins() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::on_disk()?;
    let notes = ws.create_collection("notes")?;
    let mut setup = ws.open(&notes);
    setup.add_row(bag(json!({"a": 1, "b": 2}))?)?;
    let (_, id) = setup.sync(&mut ws.storage).rows.created[0];

    let mut other_store = ws.connect()?;
    let mut mine = ws.open(&notes);
    let mut theirs = flexdata_engine::CollectionSession::open(&other_store, notes.clone());

    mine.patch_cell(id, &FieldKey::new("b"), json!("mine"))?;
    theirs.patch_cell(id, &FieldKey::new("a"), json!("theirs"))?;
    assert!(mine.sync(&mut ws.storage).is_clean());
    assert!(theirs.sync(&mut other_store).is_clean());

    // The later write carries the whole bag and replaces the earlier one.
    let reloaded = ws.open(&notes);
    assert_eq!(reloaded.rows().items()[0].data, bag(json!({"a": "theirs", "b": 2}))?);
    Ok(())
}
