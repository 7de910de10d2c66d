//! Tests for the tile server
//!
//! These tests verify:
//! - Serving raw tile bytes with an image content type
//! - 404 for missing storages, absent tiles and out-of-range cells
//! - 400 for unparsable coordinates
//! - Bounded caching of opened storages

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;
use tuile::server::{create_router, AppState, StorageCache};
use tuile::{TileStorage, TuileError};

// =============================================================================
// Helper Functions
// =============================================================================

fn create_dataset(base: &Path, dataset: &str, zoom: u32, tiles: &[(u32, u32, &str)]) {
    let path = base.join(dataset).join(zoom.to_string());
    let mut storage = TileStorage::create(&path, (4, 4)).unwrap();
    for (col, row, bytes) in tiles {
        storage.set_tile(*col, *row, bytes.as_bytes()).unwrap();
    }
    storage.close().unwrap();
}

fn setup_router(base: &Path, capacity: u64) -> (Router, Arc<StorageCache>) {
    let cache = Arc::new(StorageCache::new(base, capacity));
    let router = create_router(AppState {
        cache: Arc::clone(&cache),
    });
    (router, cache)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, content_type, body.to_vec())
}

// =============================================================================
// Route Tests
// =============================================================================

#[tokio::test]
async fn test_health() {
    let temp_dir = TempDir::new().unwrap();
    let (router, _cache) = setup_router(temp_dir.path(), 4);

    let (status, _, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_serves_tile_bytes() {
    let temp_dir = TempDir::new().unwrap();
    create_dataset(temp_dir.path(), "paris", 17, &[(2, 1, "jpeg bytes")]);
    let (router, _cache) = setup_router(temp_dir.path(), 4);

    let (status, content_type, body) = get(&router, "/paris/17/1/2.jpeg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(body, b"jpeg bytes");
}

#[tokio::test]
async fn test_content_type_follows_extension() {
    let temp_dir = TempDir::new().unwrap();
    create_dataset(temp_dir.path(), "paris", 3, &[(0, 0, "png bytes")]);
    let (router, _cache) = setup_router(temp_dir.path(), 4);

    let (status, content_type, _) = get(&router, "/paris/3/0/0.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_absent_tile_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    create_dataset(temp_dir.path(), "paris", 17, &[(0, 0, "x")]);
    let (router, _cache) = setup_router(temp_dir.path(), 4);

    let (status, _, _) = get(&router, "/paris/17/3/3.jpeg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get(&router, "/paris/17/0/99.jpeg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_dataset_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let (router, cache) = setup_router(temp_dir.path(), 4);

    let (status, _, body) = get(&router, "/nowhere/1/0/0.jpeg").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, b"Not found");
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_storage_created_after_miss_is_served() {
    let temp_dir = TempDir::new().unwrap();
    let (router, _cache) = setup_router(temp_dir.path(), 4);

    let (status, _, _) = get(&router, "/late/1/0/0.jpeg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    create_dataset(temp_dir.path(), "late", 1, &[(0, 0, "here now")]);
    let (status, _, body) = get(&router, "/late/1/0/0.jpeg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"here now");
}

#[tokio::test]
async fn test_bad_coordinates_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (router, _cache) = setup_router(temp_dir.path(), 4);

    let (status, _, _) = get(&router, "/paris/z/0/0.jpeg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&router, "/paris/1/0/left.jpeg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Cache Tests
// =============================================================================

#[test]
fn test_cache_reuses_open_storage() {
    let temp_dir = TempDir::new().unwrap();
    create_dataset(temp_dir.path(), "paris", 17, &[(0, 0, "a")]);
    let cache = StorageCache::new(temp_dir.path(), 4);

    let first = cache.get("paris", 17).unwrap().unwrap();
    let second = cache.get("paris", 17).unwrap().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert_eq!(first.lock().get_tile(0, 0).unwrap(), b"a");
}

#[test]
fn test_cache_is_bounded() {
    let temp_dir = TempDir::new().unwrap();
    for zoom in 0..6 {
        create_dataset(temp_dir.path(), "world", zoom, &[(0, 0, "z")]);
    }
    let cache = StorageCache::new(temp_dir.path(), 2);

    for zoom in 0..6 {
        assert!(cache.get("world", zoom).unwrap().is_some());
    }

    assert!(cache.len() <= 2);
}

#[test]
fn test_cache_resolves_storage_dir() {
    let cache = StorageCache::new(Path::new("/srv/maps"), 1);
    assert_eq!(
        cache.storage_dir("paris", 17),
        Path::new("/srv/maps/paris/17.tuiles")
    );
}

#[test]
fn test_concurrent_first_lookups_share_one_storage() {
    let temp_dir = TempDir::new().unwrap();
    create_dataset(temp_dir.path(), "paris", 3, &[(1, 1, "tile")]);
    let cache = Arc::new(StorageCache::new(temp_dir.path(), 4));
    let barrier = Arc::new(std::sync::Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                cache.get("paris", 3).unwrap().unwrap()
            })
        })
        .collect();
    let storages: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for storage in &storages[1..] {
        assert!(Arc::ptr_eq(&storages[0], storage));
    }
    assert_eq!(cache.len(), 1);
    assert_eq!(storages[0].lock().get_tile(1, 1).unwrap(), b"tile");
}

#[test]
fn test_cache_open_failure_is_reported_and_not_cached() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("broken").join("5.tuiles")).unwrap();
    let cache = StorageCache::new(temp_dir.path(), 4);

    match cache.get("broken", 5) {
        Err(TuileError::Io(_)) => {}
        Err(TuileError::Shared(e)) => assert!(matches!(*e, TuileError::Io(_))),
        other => panic!("expected an I/O error, got {:?}", other.map(|s| s.is_some())),
    }
    assert!(cache.is_empty());
}
