use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use flexdata_core::{Collection, CollectionId, DataBag, ProjectId, looks_like_uuid};
use flexdata_storage::Catalog;

use crate::error::ProxyError;

/// Shared store handle. One request reads at a time.
pub struct AppState<S> {
    pub storage: Arc<Mutex<S>>,
}

impl<S> AppState<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

pub fn router<S>(state: AppState<S>) -> Router
where
    S: Catalog + Send + 'static,
{
    Router::new()
        .route("/api/v1/{project_id}/{collection}", get(collection_rows::<S>))
        .fallback(invalid_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn invalid_route() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Invalid route. Use: /api/v1/:projectId/:collectionId" })),
    )
}

async fn collection_rows<S>(
    State(state): State<AppState<S>>,
    Path((project, segment)): Path<(String, String)>,
) -> Result<Json<Value>, ProxyError>
where
    S: Catalog + Send + 'static,
{
    let project_id =
        ProjectId::parse(&project).map_err(|_| ProxyError::InvalidProject(project.clone()))?;
    let storage = state.storage.lock().await;
    let (collection, rows) = read_collection(&*storage, project_id, &segment)?;
    drop(storage);

    info!(
        project_id = %project_id,
        requested = %segment,
        collection_id = %collection.id,
        count = rows.len(),
        "served collection"
    );
    Ok(Json(json!({ "count": rows.len(), "results": rows })))
}

/// Resolve `segment` (collection id or name) within the project and read
/// its rows in display order.
pub fn read_collection<S: Catalog + ?Sized>(
    storage: &S,
    project_id: ProjectId,
    segment: &str,
) -> Result<(Collection, Vec<DataBag>), ProxyError> {
    let collection = resolve_collection(storage, project_id, segment)?;
    let rows = storage.row_data(collection.id)?;
    Ok((collection, rows))
}

/// A UUID segment is an id and must belong to the project. Anything else
/// is an exact collection name.
pub fn resolve_collection<S: Catalog + ?Sized>(
    storage: &S,
    project_id: ProjectId,
    segment: &str,
) -> Result<Collection, ProxyError> {
    let found = if looks_like_uuid(segment) {
        let id = CollectionId::parse(segment)
            .map_err(|_| ProxyError::CollectionNotFound(segment.to_string()))?;
        storage
            .get_collection(id)?
            .filter(|c| c.project_id == project_id)
    } else {
        let found = storage.find_collection_by_name(project_id, segment)?;
        if let Some(collection) = &found {
            info!(name = segment, collection_id = %collection.id, "resolved collection name");
        }
        found
    };
    found.ok_or_else(|| ProxyError::CollectionNotFound(segment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use flexdata_core::{Row, RowId, SortKey, Timestamp};
    use flexdata_storage::{RemoteStore, SqliteStorage};
    use tower::ServiceExt;

    struct Fixture {
        app: Router,
        project_id: ProjectId,
        songs: Collection,
    }

    fn fixture() -> Result<Fixture, Box<dyn std::error::Error>> {
        let mut store = SqliteStorage::open_in_memory()?;
        let project = store.create_project("Demo", None)?;
        let songs = store.create_collection(project.id, "songs")?;
        for (title, key) in [("second", 2000.0), ("first", 1000.0)] {
            let mut data = DataBag::new();
            data.insert("title", json!(title));
            RemoteStore::<Row>::create_item(
                &mut store,
                &Row {
                    id: RowId::new(),
                    collection_id: songs.id,
                    data,
                    sort_key: SortKey::new(key),
                    created_at: Timestamp::ZERO,
                    updated_at: Timestamp::ZERO,
                },
            )?;
        }
        Ok(Fixture {
            app: router(AppState::new(store)),
            project_id: project.id,
            songs,
        })
    }

    async fn get_json(
        app: Router,
        uri: &str,
    ) -> Result<(StatusCode, Value), Box<dyn std::error::Error>> {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn rows_by_id_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let f = fixture()?;
        let uri = format!("/api/v1/{}/{}", f.project_id, f.songs.id);
        let (status, body) = get_json(f.app, &uri).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["results"][0]["title"], "first");
        assert_eq!(body["results"][1]["title"], "second");
        Ok(())
    }

    #[tokio::test]
    async fn rows_by_name() -> Result<(), Box<dyn std::error::Error>> {
        let f = fixture()?;
        let uri = format!("/api/v1/{}/songs", f.project_id);
        let (status, body) = get_json(f.app, &uri).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_name_is_404() -> Result<(), Box<dyn std::error::Error>> {
        let f = fixture()?;
        let uri = format!("/api/v1/{}/nope", f.project_id);
        let (status, body) = get_json(f.app, &uri).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn collection_of_other_project_is_404() -> Result<(), Box<dyn std::error::Error>> {
        let f = fixture()?;
        let uri = format!("/api/v1/{}/{}", ProjectId::new(), f.songs.id);
        let (status, _) = get_json(f.app, &uri).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_project_is_400() -> Result<(), Box<dyn std::error::Error>> {
        let f = fixture()?;
        let (status, _) = get_json(f.app, "/api/v1/not-a-uuid/songs").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn other_routes_get_usage_hint() -> Result<(), Box<dyn std::error::Error>> {
        let f = fixture()?;
        let (status, body) = get_json(f.app, "/api/v1/only-one").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["error"],
            "Invalid route. Use: /api/v1/:projectId/:collectionId"
        );
        Ok(())
    }
}
