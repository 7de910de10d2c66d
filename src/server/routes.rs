//! HTTP routes
//!
//! Maps `/{dataset}/{zoom}/{row}/{col}.{ext}` onto `get_tile`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use bytes::Bytes;

use crate::error::{Result, TuileError};

use super::StorageCache;

/// Content type used when the extension names no known image format
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<StorageCache>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/:dataset/:zoom/:row/:tile", get(get_tile))
        .with_state(state)
}

/// A parsed tile request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub dataset: String,
    pub zoom: u32,
    pub row: u32,
    pub col: u32,
    /// Extension requested, e.g. `jpeg`
    pub format: Option<String>,
}

impl TileRequest {
    /// Parse the path segments of a tile request
    ///
    /// `("paris", "17", "3", "12.png")` → col 12, row 3, zoom 17, format png.
    pub fn parse(
        dataset: &str,
        zoom: &str,
        row: &str,
        tile: &str,
    ) -> std::result::Result<Self, String> {
        if dataset.is_empty()
            || dataset == "."
            || dataset == ".."
            || dataset.contains(['/', '\\'])
        {
            return Err(format!("Invalid dataset {:?}", dataset));
        }

        let (col, format) = match tile.split_once('.') {
            Some((col, ext)) => (col, Some(ext.to_ascii_lowercase())),
            None => (tile, None),
        };

        Ok(Self {
            dataset: dataset.to_string(),
            zoom: parse_number("zoom", zoom)?,
            row: parse_number("row", row)?,
            col: parse_number("column", col)?,
            format,
        })
    }

    /// Content type matching the requested extension
    pub fn content_type(&self) -> &'static str {
        self.format
            .as_deref()
            .and_then(image::ImageFormat::from_extension)
            .map(|format| format.to_mime_type())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

fn parse_number(what: &str, value: &str) -> std::result::Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid {} {:?}", what, value))
}

async fn health() -> &'static str {
    "ok"
}

async fn get_tile(
    State(state): State<AppState>,
    Path((dataset, zoom, row, tile)): Path<(String, String, String, String)>,
) -> Response {
    let request = match TileRequest::parse(&dataset, &zoom, &row, &tile) {
        Ok(request) => request,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };
    let content_type = request.content_type();

    let lookup = {
        let request = request.clone();
        tokio::task::spawn_blocking(move || fetch_tile(&state.cache, &request)).await
    };

    match lookup {
        Ok(Ok(Some(bytes))) => (
            [
                (header::CONTENT_TYPE, content_type),
                (header::ACCEPT_RANGES, "bytes"),
            ],
            Bytes::from(bytes),
        )
            .into_response(),
        Ok(Ok(None)) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Ok(Err(e)) => {
            tracing::error!("Failed to read tile {:?}: {}", request, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!("Tile lookup task failed for {:?}: {}", request, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}

/// Blocking lookup; `None` when the storage or the tile is missing
fn fetch_tile(cache: &StorageCache, request: &TileRequest) -> Result<Option<Vec<u8>>> {
    let storage = match cache.get(&request.dataset, request.zoom)? {
        Some(storage) => storage,
        None => return Ok(None),
    };

    let mut storage = storage.lock();
    match storage.get_tile(request.col, request.row) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(TuileError::AbsentTile { .. }) | Err(TuileError::OutOfRange { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
