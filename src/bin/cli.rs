//! Tuile CLI
//!
//! Command-line maintenance for Tuile storages.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};
use tuile::tools::{self, CheckOptions, ImageDecoder, ImportOptions, RebuildOptions};
use tuile::TileStorage;

const PROGRESS_TEMPLATE: &str = "{wide_bar} {pos}/{len} ({percent}%) eta {eta}";

/// Tuile CLI
#[derive(Parser, Debug)]
#[command(name = "tuile-cli")]
#[command(about = "Maintenance tools for Tuile tile storages")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode every tile and clear the invalid ones
    Check {
        /// Only report, do not clear invalid tiles
        #[arg(short, long)]
        pretend: bool,

        /// Storage directory
        path: PathBuf,
    },

    /// Copy live tiles into a fresh storage, dropping orphaned bytes
    Rebuild {
        /// Skip tiles that fail to decode
        #[arg(short, long)]
        check: bool,

        /// Storage directory
        path: PathBuf,

        /// Destination (defaults to `tmp.tuiles` next to the source)
        dest: Option<PathBuf>,
    },

    /// Build a storage from a directory of tile-<row>x<col>.<ext> files
    Import {
        /// Directory of tile files
        tiles_dir: PathBuf,

        /// Output path (the .tuiles suffix is applied)
        out_path: PathBuf,

        /// Blob file size cap in MB
        #[arg(short, long)]
        max_blob_mb: Option<u64>,
    },

    /// Print the configuration and fill level of a storage
    Info {
        /// Storage directory
        path: PathBuf,
    },

    /// Write the bytes of one tile to a file or stdout
    Get {
        /// Storage directory
        path: PathBuf,

        col: u32,
        row: u32,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> tuile::Result<()> {
    match command {
        Commands::Check { pretend, path } => check(&path, pretend),
        Commands::Rebuild { check, path, dest } => {
            let dest = dest.unwrap_or_else(|| path.with_file_name("tmp"));
            rebuild(&path, &dest, check)
        }
        Commands::Import {
            tiles_dir,
            out_path,
            max_blob_mb,
        } => import(&tiles_dir, &out_path, max_blob_mb),
        Commands::Info { path } => info(&path),
        Commands::Get {
            path,
            col,
            row,
            output,
        } => get(&path, col, row, output.as_deref()),
    }
}

fn check(path: &Path, pretend: bool) -> tuile::Result<()> {
    let mut storage = TileStorage::open(path)?;
    let bar = progress_bar(storage.len());

    let report = tools::check_with(&mut storage, CheckOptions { pretend }, &ImageDecoder, || {
        bar.inc(1)
    })?;
    bar.finish_and_clear();
    storage.close()?;

    println!("Found {} invalid tiles", report.invalid);
    println!("Found {} empty tiles", report.empty);
    println!(
        "{} tiles ({:.2}%) are now empty",
        report.invalid + report.empty,
        report.empty_ratio() * 100.0
    );
    Ok(())
}

fn rebuild(path: &Path, dest: &Path, check: bool) -> tuile::Result<()> {
    let mut source = TileStorage::open(path)?;
    let bar = progress_bar(source.len());

    let report = tools::rebuild_with(&mut source, dest, RebuildOptions { check }, &ImageDecoder, || {
        bar.inc(1)
    })?;
    bar.finish_and_clear();
    source.close()?;

    println!(
        "Copied {} tiles ({} bytes) into {}, dropped {}",
        report.copied,
        report.bytes_copied,
        tuile::storage_path(dest).display(),
        report.skipped
    );
    Ok(())
}

fn import(tiles_dir: &Path, out_path: &Path, max_blob_mb: Option<u64>) -> tuile::Result<()> {
    let options = match max_blob_mb {
        Some(mb) => ImportOptions::with_max_blob_mb(mb)?,
        None => ImportOptions::default(),
    };

    let bar = progress_bar(0);
    let report = tools::import_dir_with(tiles_dir, out_path, options, |total| {
        if total > 0 {
            bar.set_length(total);
        } else {
            bar.inc(1);
        }
    })?;
    bar.finish_and_clear();

    println!(
        "Imported {} tiles into a {}x{} grid at {}",
        report.imported,
        report.columns,
        report.rows,
        tuile::storage_path(out_path).display()
    );
    Ok(())
}

fn info(path: &Path) -> tuile::Result<()> {
    let mut storage = TileStorage::open(path)?;

    let config = serde_json::to_string_pretty(storage.config())?;
    println!("{}", config);

    let mut present = 0u64;
    for (col, row) in storage.coords()? {
        if storage.contains_tile(col, row)? {
            present += 1;
        }
    }
    println!("Blob files: {}", storage.blob_file_count()?);
    println!("Tiles: {} of {} cells", present, storage.len());

    storage.close()
}

fn get(path: &Path, col: u32, row: u32, output: Option<&Path>) -> tuile::Result<()> {
    let mut storage = TileStorage::open(path)?;
    let tile = storage.get_tile(col, row)?;
    storage.close()?;

    match output {
        Some(file) => std::fs::write(file, &tile)?,
        None => std::io::stdout().write_all(&tile)?,
    }
    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        bar.set_style(style);
    }
    bar
}
