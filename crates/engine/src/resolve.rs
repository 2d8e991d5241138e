//! Best-effort guesses over user-defined schemas. Nothing here is
//! authoritative: every resolver returns `Option` and callers fall back.

use serde_json::Value;

use flexdata_core::{Collection, DataBag, FieldDef, FieldKey};

/// Collection names that hold playable tracks.
pub const AUDIO_COLLECTIONS: [&str; 8] = [
    "songs",
    "tracks",
    "episodes",
    "audio",
    "voice_clips",
    "clips",
    "portfolio",
    "music",
];

/// Collection names that hold project settings such as the theme color.
pub const SETTINGS_COLLECTIONS: [&str; 4] = ["settings", "config", "branding", "configuration"];

const TITLE_LABELS: [&str; 4] = ["title", "name", "track", "label"];
const AUDIO_LABELS: [&str; 6] = ["url", "audio", "file", "link", "mp3", "source"];
const COVER_LABELS: [&str; 5] = ["image", "art", "cover", "thumbnail", "photo"];

const THEME_VALUE_KEYS: [&str; 6] = [
    "theme_color",
    "color",
    "brand_color",
    "primary_color",
    "hex",
    "value",
];
const SETTING_NAME_KEYS: [&str; 3] = ["key", "name", "label"];

/// Value as display text, or `None` when it would not count as set
/// (null, empty string, `false`, zero).
pub(crate) fn present_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// First key of `keys` whose value in `bag` is set, as text.
pub(crate) fn first_present<'k, I>(bag: &DataBag, keys: I) -> Option<String>
where
    I: IntoIterator<Item = &'k str>,
{
    keys.into_iter()
        .find_map(|key| bag.get(key).and_then(present_text))
}

/// First collection (in list order) whose name matches one of
/// `candidates` case-insensitively, else the first collection.
pub fn collection_name_heuristic<'a>(
    candidates: &[&str],
    collections: &'a [Collection],
) -> Option<&'a Collection> {
    find_named(candidates, collections).or_else(|| collections.first())
}

/// Like [`collection_name_heuristic`] without the fallback.
pub fn find_named<'a>(
    candidates: &[&str],
    collections: &'a [Collection],
) -> Option<&'a Collection> {
    collections.iter().find(|c| {
        let name = c.name.to_lowercase();
        candidates.iter().any(|candidate| *candidate == name)
    })
}

/// Which field plays which role in a media player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    pub title: Option<FieldKey>,
    pub audio: Option<FieldKey>,
    pub cover: Option<FieldKey>,
}

/// Guess roles from field labels (exact, case-insensitive).
pub fn guess_field_mapping(fields: &[FieldDef]) -> FieldMapping {
    let by_label = |labels: &[&str]| {
        fields
            .iter()
            .find(|f| labels.contains(&f.label.to_lowercase().as_str()))
            .map(|f| f.key.clone())
    };
    FieldMapping {
        title: by_label(&TITLE_LABELS[..]),
        audio: by_label(&AUDIO_LABELS[..]),
        cover: by_label(&COVER_LABELS[..]),
    }
}

/// Theme color from the rows of a settings collection.
///
/// A row naming itself "theme color" (via `key`, `name` or `label`) wins
/// outright with its `value` or `color`. Otherwise the last row carrying a
/// `#`-prefixed color value is used.
pub fn detect_theme_color(rows: &[DataBag]) -> Option<String> {
    let mut color = None;
    for row in rows {
        let setting_name = first_present(row, SETTING_NAME_KEYS).unwrap_or_default();
        if setting_name.to_lowercase().contains("theme color") {
            if let Some(value) = first_present(row, ["value", "color"]) {
                return Some(value);
            }
        }
        if let Some(value) = first_present(row, THEME_VALUE_KEYS).filter(|v| v.starts_with('#')) {
            color = Some(value);
        }
    }
    color
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexdata_core::{CollectionId, FieldId, FieldType, ProjectId, SortKey, Timestamp};
    use serde_json::json;

    fn collections(names: &[&str]) -> Vec<Collection> {
        let project_id = ProjectId::new();
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Collection {
                id: CollectionId::new(),
                project_id,
                name: name.to_string(),
                created_at: Timestamp::new(i as u64, 0),
            })
            .collect()
    }

    fn labeled(label: &str) -> FieldDef {
        FieldDef {
            id: FieldId::new(),
            collection_id: CollectionId::new(),
            key: FieldKey::generate(),
            field_type: FieldType::ShortText,
            label: label.into(),
            required: false,
            sort_key: SortKey::FIRST,
            created_at: Timestamp::ZERO,
        }
    }

    fn bag(value: Value) -> DataBag {
        DataBag::try_from(value).unwrap()
    }

    #[test]
    fn heuristic_matches_case_insensitively() {
        let cols = collections(&["Settings", "Tracks", "notes"]);
        let found = collection_name_heuristic(&AUDIO_COLLECTIONS, &cols);
        assert_eq!(found.map(|c| c.name.as_str()), Some("Tracks"));
    }

    #[test]
    fn heuristic_falls_back_to_first() {
        let cols = collections(&["notes", "people"]);
        let found = collection_name_heuristic(&AUDIO_COLLECTIONS, &cols);
        assert_eq!(found.map(|c| c.name.as_str()), Some("notes"));
        assert!(find_named(&AUDIO_COLLECTIONS, &cols).is_none());
        assert!(collection_name_heuristic(&AUDIO_COLLECTIONS, &[]).is_none());
    }

    #[test]
    fn mapping_by_label() {
        let fields = vec![labeled("Song Title"), labeled("Name"), labeled("MP3"), labeled("Cover")];
        let mapping = guess_field_mapping(&fields);
        assert_eq!(mapping.title, Some(fields[1].key.clone()));
        assert_eq!(mapping.audio, Some(fields[2].key.clone()));
        assert_eq!(mapping.cover, Some(fields[3].key.clone()));
    }

    #[test]
    fn theme_color_named_row_wins() {
        let rows = vec![
            bag(json!({"color": "#111111"})),
            bag(json!({"label": "Theme Color", "value": "#ff0000"})),
            bag(json!({"hex": "#222222"})),
        ];
        assert_eq!(detect_theme_color(&rows), Some("#ff0000".into()));
    }

    #[test]
    fn theme_color_last_hex_value() {
        let rows = vec![
            bag(json!({"color": "#111111"})),
            bag(json!({"value": "blue"})),
            bag(json!({"primary_color": "#333333"})),
        ];
        assert_eq!(detect_theme_color(&rows), Some("#333333".into()));
        assert_eq!(detect_theme_color(&[bag(json!({"value": "red"}))]), None);
    }
}
