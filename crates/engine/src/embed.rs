use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use flexdata_core::{Collection, CollectionId, DataBag, FieldDef, ProjectId, Row, RowId};
use flexdata_storage::Catalog;

use crate::resolve::{
    AUDIO_COLLECTIONS, FieldMapping, SETTINGS_COLLECTIONS, detect_theme_color, find_named,
    first_present,
};

pub const DEFAULT_THEME: &str = "#2563EB";

const DEFAULT_TITLE: &str = "Untitled";
const TITLE_KEYS: [&str; 6] = ["title", "name", "track_title", "label", "track", "song_name"];
const URL_KEYS: [&str; 9] = [
    "url",
    "audio_url",
    "file",
    "audio_file",
    "audio",
    "song",
    "mp3",
    "link",
    "source",
];

/// Player options carried in the embed URL's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedConfig {
    pub theme: Option<String>,
    pub title_field: Option<String>,
    pub url_field: Option<String>,
    pub collection_id: Option<String>,
    pub collection_name: Option<String>,
}

impl EmbedConfig {
    /// Parse `theme=..&title_field=..` (leading `?` allowed). Unknown keys
    /// are ignored, empty values count as absent and the first occurrence
    /// of a repeated key wins.
    pub fn from_query(query: &str) -> Self {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query.trim_start_matches('?')).unwrap_or_else(|err| {
                debug!(error = %err, "unreadable embed query");
                Vec::new()
            });
        let mut config = Self::default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                "theme" => &mut config.theme,
                "title_field" => &mut config.title_field,
                "url_field" => &mut config.url_field,
                "collection_id" => &mut config.collection_id,
                "collection_name" => &mut config.collection_name,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        config
    }

    /// The explicit theme, when it is a usable hex color.
    pub fn explicit_theme(&self) -> Option<&str> {
        self.theme.as_deref().filter(|t| is_hex_color(t))
    }

    /// Explicit theme, else `detected`, else [`DEFAULT_THEME`].
    pub fn theme_color(&self, detected: Option<&str>) -> String {
        self.explicit_theme()
            .or(detected)
            .unwrap_or(DEFAULT_THEME)
            .to_string()
    }

    /// Theme for the player. Without a usable explicit theme, the rows of
    /// the project's settings collection are searched for a theme color;
    /// a failed read counts as no color.
    pub fn resolve_theme<S: Catalog + ?Sized>(
        &self,
        store: &S,
        collections: &[Collection],
    ) -> String {
        if let Some(theme) = self.explicit_theme() {
            return theme.to_string();
        }
        let detected = find_named(&SETTINGS_COLLECTIONS, collections).and_then(|settings| {
            match store.row_data(settings.id) {
                Ok(rows) => detect_theme_color(&rows),
                Err(err) => {
                    warn!(collection_id = %settings.id, error = %err, "failed to read settings");
                    None
                }
            }
        });
        self.theme_color(detected.as_deref())
    }

    /// Pick the track collection: explicit id, else name (case-insensitive),
    /// else the first collection with a typical audio name.
    pub fn select_collection<'a>(&self, collections: &'a [Collection]) -> Option<&'a Collection> {
        if let Some(id) = &self.collection_id {
            return collections.iter().find(|c| c.id.to_string() == *id);
        }
        if let Some(name) = &self.collection_name {
            return collections
                .iter()
                .find(|c| c.name.to_lowercase() == name.to_lowercase());
        }
        find_named(&AUDIO_COLLECTIONS, collections)
    }
}

fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    pub start: f64,
    pub end: f64,
}

impl Clip {
    pub fn full_audio() -> Self {
        Self {
            name: "Full Audio".into(),
            start: 0.0,
            end: 999_999.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: RowId,
    pub name: String,
    pub url: String,
    pub clips: Vec<Clip>,
}

/// Turn rows into playable tracks. Rows without any URL are skipped.
pub fn map_tracks(rows: &[Row], title_field: Option<&str>, url_field: Option<&str>) -> Vec<Track> {
    let tracks: Vec<Track> = rows
        .iter()
        .filter_map(|row| {
            let url = first_present(&row.data, url_field.into_iter().chain(URL_KEYS))?;
            let name = first_present(&row.data, title_field.into_iter().chain(TITLE_KEYS))
                .unwrap_or_else(|| DEFAULT_TITLE.to_string());
            Some(Track {
                id: row.id,
                name,
                url,
                clips: clips_of(&row.data),
            })
        })
        .collect();
    debug!(rows = rows.len(), tracks = tracks.len(), "mapped tracks");
    tracks
}

fn clips_of(data: &DataBag) -> Vec<Clip> {
    data.get("clips")
        .filter(|v| v.is_array())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_else(|| vec![Clip::full_audio()])
}

/// Player URL for a collection with the given field mapping.
pub fn embed_url(
    origin: &str,
    project_id: ProjectId,
    collection_id: Option<CollectionId>,
    mapping: &FieldMapping,
) -> String {
    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(id) = collection_id {
        params.push(("collection_id", id.to_string()));
    }
    if let Some(key) = &mapping.title {
        params.push(("title_field", key.to_string()));
    }
    if let Some(key) = &mapping.audio {
        params.push(("url_field", key.to_string()));
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}/embed/audio/{project_id}?{query}",
        origin.trim_end_matches('/')
    )
}

/// Plain-text brief for wiring an external site to a collection through
/// the read proxy. Lists every field as label -> internal key.
pub fn integration_guide(
    proxy_base: &str,
    project_id: ProjectId,
    collection: &Collection,
    fields: &[FieldDef],
    mapping: &FieldMapping,
) -> String {
    let api_base = format!("{}/api/v1/{project_id}", proxy_base.trim_end_matches('/'));
    let field_lines = fields
        .iter()
        .map(|f| {
            format!(
                "  * \"{}\": row.data[\"{}\"] ({})",
                f.display_label(),
                f.key,
                f.field_type.as_str()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let example_key = mapping
        .title
        .as_ref()
        .map(|k| k.to_string())
        .or_else(|| fields.first().map(|f| f.key.to_string()))
        .unwrap_or_else(|| "field_key".to_string());

    format!(
        "PROJECT\n\
         - Project ID: {project_id}\n\
         - Base API URL: {api_base}\n\
         \n\
         DATA SCHEMA\n\
         - Collection: \"{name}\" (ID: {collection_id})\n\
         - Endpoint: {api_base}/{collection_id}\n\
         - Field mapping (label -> internal key):\n\
         {field_lines}\n\
         \n\
         DATA STRUCTURE\n\
         The endpoint returns {{\"count\": n, \"results\": [...]}}.\n\
         Each result is one row's data object.\n\
         Read values by internal key, never by label. Example: item[\"{example_key}\"]\n",
        name = collection.name,
        collection_id = collection.id,
    )
}
