//! Tests for the maintenance tools
//!
//! These tests verify:
//! - check: counting empty/invalid tiles, clearing unless pretending
//! - rebuild: copying live tiles, dropping orphans and undecodable tiles
//! - import: sizing the grid from file names and storing every file

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tuile::config::StorageConfig;
use tuile::tools::{
    self, CheckOptions, ImportOptions, RebuildOptions, TileDecoder,
};
use tuile::{storage_path, TileStorage, TuileError};

// =============================================================================
// Helper Functions
// =============================================================================

fn png_tile(shade: u8) -> Vec<u8> {
    let image = RgbImage::from_pixel(2, 2, Rgb([shade, shade, shade]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// 3x2 storage: two valid PNGs, one garbage tile, three empty cells
fn setup_mixed_storage(dir: &Path) -> TileStorage {
    let mut storage = TileStorage::create(&dir.join("mixed"), (3, 2)).unwrap();
    storage.set_tile(0, 0, &png_tile(10)).unwrap();
    storage.set_tile(2, 0, b"not an image").unwrap();
    storage.set_tile(1, 1, &png_tile(200)).unwrap();
    storage
}

/// Accepts only tiles starting with `ok`
struct PrefixDecoder;

impl TileDecoder for PrefixDecoder {
    fn decode(&self, bytes: &[u8]) -> tuile::Result<()> {
        if bytes.starts_with(b"ok") {
            Ok(())
        } else {
            Err(TuileError::Decode("missing prefix".to_string()))
        }
    }
}

// =============================================================================
// Check Tests
// =============================================================================

#[test]
fn test_check_counts_and_clears_invalid_tiles() {
    let temp_dir = TempDir::new().unwrap();
    let mut storage = setup_mixed_storage(temp_dir.path());

    let report = tools::check(&mut storage, CheckOptions { pretend: false }).unwrap();

    assert_eq!(report.total, 6);
    assert_eq!(report.empty, 3);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.cleared, 1);
    assert!((report.empty_ratio() - 4.0 / 6.0).abs() < 1e-9);

    assert!(!storage.contains_tile(2, 0).unwrap());
    assert_eq!(storage.get_tile(0, 0).unwrap(), png_tile(10));
    assert_eq!(storage.get_tile(1, 1).unwrap(), png_tile(200));
}

#[test]
fn test_check_pretend_leaves_tiles() {
    let temp_dir = TempDir::new().unwrap();
    let mut storage = setup_mixed_storage(temp_dir.path());

    let report = tools::check(&mut storage, CheckOptions { pretend: true }).unwrap();

    assert_eq!(report.invalid, 1);
    assert_eq!(report.cleared, 0);
    assert_eq!(storage.get_tile(2, 0).unwrap(), b"not an image");
}

#[test]
fn test_check_second_run_finds_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let mut storage = setup_mixed_storage(temp_dir.path());

    tools::check(&mut storage, CheckOptions::default()).unwrap();
    let report = tools::check(&mut storage, CheckOptions::default()).unwrap();

    assert_eq!(report.invalid, 0);
    assert_eq!(report.empty, 4);
}

#[test]
fn test_check_with_custom_decoder_and_progress() {
    let temp_dir = TempDir::new().unwrap();
    let mut storage = TileStorage::create(&temp_dir.path().join("grid"), (2, 2)).unwrap();
    storage.set_tile(0, 0, b"ok tile").unwrap();
    storage.set_tile(1, 0, b"bad tile").unwrap();

    let mut ticks = 0;
    let report = tools::check_with(
        &mut storage,
        CheckOptions { pretend: false },
        &PrefixDecoder,
        || ticks += 1,
    )
    .unwrap();

    assert_eq!(ticks, 4);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.empty, 2);
    assert!(storage.contains_tile(0, 0).unwrap());
    assert!(!storage.contains_tile(1, 0).unwrap());
}

// =============================================================================
// Rebuild Tests
// =============================================================================

#[test]
fn test_rebuild_drops_orphaned_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let mut storage = TileStorage::create(&temp_dir.path().join("src"), (2, 2)).unwrap();
    storage.set_tile(0, 0, b"old version").unwrap();
    storage.set_tile(0, 0, b"new").unwrap();
    storage.set_tile(1, 1, b"other").unwrap();
    let source = storage.path().to_path_buf();
    storage.close().unwrap();

    let dest = temp_dir.path().join("dst");
    let report = tools::rebuild(&source, &dest, RebuildOptions { check: false }).unwrap();

    assert_eq!(report.copied, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.bytes_copied, 8);

    let mut rebuilt = TileStorage::open(&storage_path(&dest)).unwrap();
    assert_eq!(rebuilt.size(), (2, 2));
    assert_eq!(rebuilt.get_tile(0, 0).unwrap(), b"new");
    assert_eq!(rebuilt.get_tile(1, 1).unwrap(), b"other");
    assert!(!rebuilt.contains_tile(1, 0).unwrap());
    assert_eq!(
        fs::metadata(rebuilt.path().join("tiles0000000000")).unwrap().len(),
        8
    );
}

#[test]
fn test_rebuild_with_check_skips_undecodable() {
    let temp_dir = TempDir::new().unwrap();
    let storage = setup_mixed_storage(temp_dir.path());
    let source = storage.path().to_path_buf();
    drop(storage);

    let dest = temp_dir.path().join("clean");
    let report = tools::rebuild(&source, &dest, RebuildOptions { check: true }).unwrap();

    assert_eq!(report.copied, 2);
    assert_eq!(report.skipped, 1);

    let mut rebuilt = TileStorage::open(&storage_path(&dest)).unwrap();
    assert!(!rebuilt.contains_tile(2, 0).unwrap());
    assert_eq!(rebuilt.get_tile(1, 1).unwrap(), png_tile(200));
}

#[test]
fn test_rebuild_keeps_source_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig::builder(3, 1).max_blob_file_size(5).build();
    let mut source =
        TileStorage::create_with_config(&temp_dir.path().join("src"), config.clone()).unwrap();
    source.set_tile(0, 0, b"abc").unwrap();
    source.set_tile(2, 0, b"def").unwrap();

    let dest = temp_dir.path().join("dst");
    tools::rebuild_with(
        &mut source,
        &dest,
        RebuildOptions::default(),
        &PrefixDecoder,
        || {},
    )
    .unwrap();

    let mut rebuilt = TileStorage::open(&storage_path(&dest)).unwrap();
    assert_eq!(rebuilt.config(), &config);
    assert_eq!(rebuilt.blob_file_count().unwrap(), 2);
    assert_eq!(rebuilt.get_tile(2, 0).unwrap(), b"def");
}

#[test]
fn test_rebuild_into_existing_destination_fails() {
    let temp_dir = TempDir::new().unwrap();
    let mut source = TileStorage::create(&temp_dir.path().join("src"), (1, 1)).unwrap();
    TileStorage::create(&temp_dir.path().join("dst"), (1, 1)).unwrap();

    let result = tools::rebuild_with(
        &mut source,
        &temp_dir.path().join("dst"),
        RebuildOptions::default(),
        &PrefixDecoder,
        || {},
    );
    assert!(matches!(result, Err(TuileError::StorageExists(_))));
}

// =============================================================================
// Import Tests
// =============================================================================

#[test]
fn test_import_sizes_grid_from_names() {
    let temp_dir = TempDir::new().unwrap();
    let tiles_dir = temp_dir.path().join("tiles");
    fs::create_dir(&tiles_dir).unwrap();
    fs::write(tiles_dir.join("tile-0000x0000.jpeg"), b"r0c0").unwrap();
    fs::write(tiles_dir.join("tile-0002x0001.jpeg"), b"r2c1").unwrap();
    fs::write(tiles_dir.join("tile-0001x0004.jpeg"), b"r1c4").unwrap();

    let out = temp_dir.path().join("out");
    let report = tools::import_dir(&tiles_dir, &out).unwrap();

    assert_eq!(report.columns, 5);
    assert_eq!(report.rows, 3);
    assert_eq!(report.imported, 3);

    let mut storage = TileStorage::open(&storage_path(&out)).unwrap();
    assert_eq!(storage.size(), (5, 3));
    assert_eq!(storage.get_tile(0, 0).unwrap(), b"r0c0");
    assert_eq!(storage.get_tile(1, 2).unwrap(), b"r2c1");
    assert_eq!(storage.get_tile(4, 1).unwrap(), b"r1c4");
    assert!(!storage.contains_tile(3, 2).unwrap());
}

#[test]
fn test_import_reports_progress() {
    let temp_dir = TempDir::new().unwrap();
    let tiles_dir = temp_dir.path().join("tiles");
    fs::create_dir(&tiles_dir).unwrap();
    for i in 0..4 {
        fs::write(tiles_dir.join(format!("tile-{}x{}.png", i, i)), [i as u8; 3]).unwrap();
    }

    let mut calls = Vec::new();
    tools::import_dir_with(
        &tiles_dir,
        &temp_dir.path().join("out"),
        ImportOptions {
            max_blob_file_size: 7,
        },
        |n| calls.push(n),
    )
    .unwrap();

    assert_eq!(calls, vec![4, 0, 0, 0, 0]);

    let storage = TileStorage::open(&temp_dir.path().join("out.tuiles")).unwrap();
    assert_eq!(storage.blob_file_count().unwrap(), 2);
}

#[test]
fn test_import_rejects_unexpected_names() {
    let temp_dir = TempDir::new().unwrap();
    let tiles_dir = temp_dir.path().join("tiles");
    fs::create_dir(&tiles_dir).unwrap();
    fs::write(tiles_dir.join("tile-1x1.jpeg"), b"x").unwrap();
    fs::write(tiles_dir.join("notes.txt"), b"y").unwrap();

    let result = tools::import_dir(&tiles_dir, &temp_dir.path().join("out"));
    assert!(matches!(result, Err(TuileError::Import(_))));
    assert!(!temp_dir.path().join("out.tuiles").exists());
}

#[test]
fn test_import_empty_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let tiles_dir = temp_dir.path().join("tiles");
    fs::create_dir(&tiles_dir).unwrap();

    let result = tools::import_dir(&tiles_dir, &temp_dir.path().join("out"));
    assert!(matches!(result, Err(TuileError::Import(_))));
}
