pub mod embed;
pub mod error;
pub mod mapper;
pub mod ordered;
pub mod outbox;
pub mod resolve;
pub mod session;
pub mod sync;

pub use embed::{Clip, DEFAULT_THEME, EmbedConfig, Track, embed_url, integration_guide, map_tracks};
pub use error::{EngineError, RemoteWriteError, ValidationError};
pub use mapper::{Cell, Rendered, render_orphan, render_record, render_value, validate_for_create};
pub use ordered::OrderedList;
pub use outbox::{Outbox, PendingWrite, WriteKind};
pub use resolve::{
    FieldMapping, collection_name_heuristic, detect_theme_color, find_named, guess_field_mapping,
};
pub use session::{CollectionSession, CollectionSyncReport, ProjectSession};
pub use sync::{SyncFailure, SyncReport, dispatch};
