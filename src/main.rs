use clap::{Parser, Subcommand};
use pikshr::config::{self, PikshrConfig};
use pikshr::imaging::format_for_extension;
use pikshr::output::{self, ImportOutcome, ImportStats};
use pikshr::repository::{PictureRepository, RepositoryError, RepositorySettings};
use pikshr::store::MemoryStore;
use pikshr::{NewPicture, Picture};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

type Repo = PictureRepository<MemoryStore>;

fn version_string() -> &'static str {
    let hash = env!("PIKSHR_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{}+{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "pikshr")]
#[command(about = "Store pictures by content, with thumbnails and metadata")]
#[command(long_about = "\
Store pictures by content, with thumbnails and metadata

Every upload is decoded, re-encoded as PNG and identified by the SHA-256 of
that PNG. Uploading the same pixels again, in any format, updates the same
picture. A thumbnail that fits in 200x200 is stored next to it.

Run 'pikshr gen-config' to generate a documented pikshr.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = "pikshr.toml", global = true)]
    config: PathBuf,

    /// Store snapshot file (overrides store.snapshot)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Metadata supplied with an upload.
#[derive(clap::Args, Clone)]
struct MetadataArgs {
    /// Uploader identity
    #[arg(long, default_value = "")]
    owner: String,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Alternative text for screen readers
    #[arg(long = "alt", default_value = "")]
    alt_text: String,
    /// MIME type to record (guessed from the extension when omitted)
    #[arg(long)]
    content_type: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Store one picture and print its id
    Upload {
        file: PathBuf,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Store every supported picture under a directory
    Import {
        dir: PathBuf,
        /// Uploader identity
        #[arg(long, default_value = "")]
        owner: String,
    },
    /// Write the full picture to a file (default: <id>.png)
    Get {
        id: String,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Write the thumbnail to a file (default: <id>.thumb.png)
    Thumbnail {
        id: String,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Print a picture's metadata as JSON
    Show { id: String },
    /// List the most recent pictures
    Recent {
        /// Only pictures uploaded by this owner
        #[arg(long)]
        owner: Option<String>,
        /// How many to list (defaults from [listing])
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print a stock pikshr.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pikshr=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    let snapshot = cli.store.unwrap_or_else(|| config.store.snapshot.clone());
    let repo = open_repository(&config, &snapshot)?;

    match cli.command {
        Command::Upload { file, metadata } => {
            let upload = read_upload(&file, &metadata)?;
            let id = repo.insert_picture(&upload, &metadata.owner).map_err(|e| {
                tracing::error!(file = %file.display(), id = ?e.id, "upload failed: {e}");
                e
            })?;
            repo.transport().save(&snapshot)?;
            tracing::info!(file = %file.display(), %id, "stored");
            println!("{id}");
        }
        Command::Import { dir, owner } => {
            let files = collect_images(&dir);
            tracing::info!(dir = %dir.display(), count = files.len(), "importing");
            let outcomes = import_all(&repo, &config, &files, &owner)?;

            let mut stats = ImportStats::default();
            for (path, outcome) in &outcomes {
                stats.record(outcome);
                println!("{}", output::format_import_line(path, outcome));
            }
            repo.transport().save(&snapshot)?;
            println!("{stats}");
        }
        Command::Get { id, out } => {
            let picture = fetch(repo.get_picture(&id), &id)?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("{}.png", picture.id)));
            write_artifact(&picture, "picture", &out)?;
        }
        Command::Thumbnail { id, out } => {
            let picture = fetch(repo.get_thumbnail(&id), &id)?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("{}.thumb.png", picture.id)));
            write_artifact(&picture, "thumbnail", &out)?;
        }
        Command::Show { id } => {
            let picture = fetch(repo.get_metadata(&id), &id)?;
            println!("{}", output::format_metadata(&picture)?);
        }
        Command::Recent { owner, limit } => {
            let limit = limit.unwrap_or(if owner.is_some() {
                config.listing.own_pics_per_page
            } else {
                config.listing.pics_per_page
            });
            let pictures = repo.recent_pictures(owner.as_deref(), limit)?;
            for line in output::format_recent(&pictures) {
                println!("{line}");
            }
        }
        Command::GenConfig => unreachable!("handled before the store is opened"),
    }

    Ok(())
}

/// Open the store and wrap it in a repository. Any failure here is fatal.
fn open_repository(config: &PikshrConfig, snapshot: &Path) -> Result<Repo, Box<dyn std::error::Error>> {
    let store = MemoryStore::load(&config.store.keyspace, snapshot).map_err(|e| {
        tracing::error!(
            keyspace = %config.store.keyspace,
            snapshot = %snapshot.display(),
            "cannot open store: {e}"
        );
        e
    })?;
    store.define_column_family(&config.store.column_family);
    tracing::debug!(
        keyspace = %config.store.keyspace,
        rows = store.row_count(&config.store.column_family),
        "store opened"
    );
    Ok(PictureRepository::with_settings(
        store,
        RepositorySettings::from_config(config),
    ))
}

fn guess_content_type(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(format_for_extension)
        .map(|fmt| fmt.to_mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn read_upload(path: &Path, metadata: &MetadataArgs) -> std::io::Result<NewPicture> {
    let contents = std::fs::read(path)?;
    let content_type = metadata
        .content_type
        .clone()
        .unwrap_or_else(|| guess_content_type(path));
    Ok(NewPicture::new(contents, content_type)
        .title(metadata.title.as_str())
        .description(metadata.description.as_str())
        .alt_text(metadata.alt_text.as_str()))
}

/// Every file under `dir` whose extension has a decoder, in path order.
fn collect_images(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| format_for_extension(ext).is_some())
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Ingest files in parallel, capped at the configured worker count.
fn import_all(
    repo: &Repo,
    config: &PikshrConfig,
    files: &[PathBuf],
    owner: &str,
) -> Result<Vec<(PathBuf, ImportOutcome)>, rayon::ThreadPoolBuildError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config::effective_threads(&config.processing))
        .build()?;
    let metadata = MetadataArgs {
        owner: owner.to_string(),
        title: String::new(),
        description: String::new(),
        alt_text: String::new(),
        content_type: None,
    };

    Ok(pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let outcome = match read_upload(path, &metadata) {
                    Err(e) => ImportOutcome::Failed(e.to_string()),
                    Ok(upload) => match repo.insert_picture(&upload, owner) {
                        Ok(id) => ImportOutcome::Stored(id),
                        Err(e) => match e.id {
                            Some(id) => ImportOutcome::StoreFailed(id, e.to_string()),
                            None => ImportOutcome::Failed(e.to_string()),
                        },
                    },
                };
                if !matches!(outcome, ImportOutcome::Stored(_)) {
                    tracing::warn!(file = %path.display(), ?outcome, "import failed");
                }
                (path.clone(), outcome)
            })
            .collect()
    }))
}

/// Turn a read result into the picture or a user-facing error.
fn fetch(
    result: Result<Picture, RepositoryError>,
    id: &str,
) -> Result<Picture, Box<dyn std::error::Error>> {
    match result {
        Ok(picture) => Ok(picture),
        Err(RepositoryError::ImageNotFound) => Err(format!("picture {id} not found").into()),
        Err(e) if e.is_transient() => {
            tracing::warn!(%id, "store temporarily unavailable: {e}");
            Err(format!("store temporarily unavailable ({e}), try again").into())
        }
        Err(e) => {
            tracing::error!(%id, "unable to retrieve picture: {e}");
            Err(e.into())
        }
    }
}

fn write_artifact(
    picture: &Picture,
    what: &str,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if !picture.has_contents() {
        return Err(format!("picture {} has no {what}", picture.id).into());
    }
    std::fs::write(out, &picture.contents)?;
    println!("{}", out.display());
    Ok(())
}
