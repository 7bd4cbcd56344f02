use clap::{Parser, Subcommand};
use media_styles::config::{self, EngineConfig};
use media_styles::engine::{AttachmentEngine, ScanInput};
use media_styles::imaging::{Interpolation, RustCodec};
use media_styles::output;
use media_styles::storage::FileSystemStorage;
use media_styles::types::{AttachmentRecord, CropPayload};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "media-styles")]
#[command(about = "Derive, store and address resized style variants of uploaded images")]
#[command(long_about = "\
Derive, store and address resized style variants of uploaded images

Every upload is decoded once and derived into one variant per configured
style: center-cropped to the style's aspect ratio and scaled to its exact
size. Animated GIFs keep every frame, delay and loop count.

Files land under the storage root as:

  public/
  └── 42/                              # attachment id
      ├── logo.3fa9c1d2e4b5.png        # original
      ├── logo.3fa9c1d2e4b5.thumb.png  # uncropped style (upload token)
      └── logo.8d0e11a7c2f4.medium.png # cropped style (crop token)

Attachment state is kept in a JSON record file that every command reads
and updates.

Run 'media-styles gen-config' to generate a documented media-styles.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Resampling filter, overriding the config file
    /// (nearest, triangle or bilinear, catmull-rom, gaussian, lanczos3)
    #[arg(long, global = true)]
    interpolation: Option<Interpolation>,

    #[command(subcommand)]
    command: Command,
}

/// The record file every attachment command operates on.
#[derive(clap::Args, Clone)]
struct RecordArgs {
    /// Attachment record (JSON)
    #[arg(long)]
    record: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a file and derive every style
    Upload {
        /// Image to upload
        file: PathBuf,
        #[command(flatten)]
        record: RecordArgs,
        /// Attachment id, required when the record file does not exist yet
        #[arg(long)]
        id: Option<String>,
    },
    /// Apply crop rectangles: JSON text, or @file to read it from a file
    Crop {
        payload: String,
        #[command(flatten)]
        record: RecordArgs,
    },
    /// Print the public URL of the original or the first matching style
    Url {
        #[command(flatten)]
        record: RecordArgs,
        /// Styles to try in order
        styles: Vec<String>,
    },
    /// List every stored path of a record
    Paths {
        #[command(flatten)]
        record: RecordArgs,
    },
    /// Delete stored files the record no longer references
    Prune {
        #[command(flatten)]
        record: RecordArgs,
    },
    /// Delete every file of a record and clear its upload
    Purge {
        #[command(flatten)]
        record: RecordArgs,
    },
    /// List configured styles
    Styles,
    /// Print a stock media-styles.toml with all options documented
    GenConfig,
}

#[derive(Error, Debug)]
enum RecordError {
    #[error("cannot read record {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse record {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot encode record {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot write record {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("record {0} does not exist; pass --id to create it")]
    MissingId(PathBuf),
}

fn load_record(path: &Path) -> Result<AttachmentRecord, RecordError> {
    let content = std::fs::read_to_string(path).map_err(|source| RecordError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| RecordError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save_record(path: &Path, record: &AttachmentRecord) -> Result<(), RecordError> {
    let json = serde_json::to_string_pretty(record).map_err(|source| RecordError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json + "\n").map_err(|source| RecordError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the record, or start a fresh one when the file is absent and an id was given.
fn load_or_create_record(path: &Path, id: Option<String>) -> Result<AttachmentRecord, RecordError> {
    if path.exists() {
        let mut record = load_record(path)?;
        if let Some(id) = id {
            record.id = id;
        }
        return Ok(record);
    }
    id.map(AttachmentRecord::new)
        .ok_or_else(|| RecordError::MissingId(path.to_path_buf()))
}

/// Crop payload text, read from a file when prefixed with `@`.
fn read_payload(arg: &str) -> std::io::Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path),
        None => Ok(arg.to_string()),
    }
}

fn build_engine(
    config: &EngineConfig,
    interpolation: Option<Interpolation>,
) -> Result<AttachmentEngine<FileSystemStorage, RustCodec>, Box<dyn std::error::Error>> {
    let storage = config.file_storage(Path::new("."));
    Ok(AttachmentEngine::new(config.registry()?, storage, config.codec())
        .with_interpolation(interpolation.unwrap_or(config.encoding.interpolation)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    init_thread_pool(&config.processing);
    let engine = build_engine(&config, cli.interpolation)?;

    match cli.command {
        Command::Upload { file, record, id } => {
            let mut rec = load_or_create_record(&record.record, id)?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let input = ScanInput::from_reader(file_name, std::fs::File::open(&file)?)?;
            let report = engine.scan(&mut rec, input)?;
            save_record(&record.record, &rec)?;
            output::print_scan_output(&rec, &engine.list_paths(&rec), &report);
        }
        Command::Crop { payload, record } => {
            let mut rec = load_record(&record.record)?;
            let payload = CropPayload::from_json(&read_payload(&payload)?)?;
            let report = engine.scan(&mut rec, ScanInput::Crop(payload.clone()))?;
            save_record(&record.record, &rec)?;
            output::print_crop_output(&rec, &engine.list_paths(&rec), &payload, &report);
        }
        Command::Url { record, styles } => {
            let rec = load_record(&record.record)?;
            let styles: Vec<&str> = styles.iter().map(String::as_str).collect();
            println!("{}", engine.url(&rec, &styles));
        }
        Command::Paths { record } => {
            let rec = load_record(&record.record)?;
            output::print_record(&rec, &engine.list_paths(&rec));
        }
        Command::Prune { record } => {
            let rec = load_record(&record.record)?;
            output::print_removed("Pruned", &engine.prune(&rec)?);
        }
        Command::Purge { record } => {
            let mut rec = load_record(&record.record)?;
            let removed = engine.purge(&rec)?;
            rec = AttachmentRecord::new(rec.id);
            save_record(&record.record, &rec)?;
            output::print_removed("Purged", &removed);
        }
        Command::Styles => output::print_styles(engine.registry()),
        // Printed before the config was loaded
        Command::GenConfig => {}
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
