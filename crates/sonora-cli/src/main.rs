//! Sonora CLI: run the audio upload pipeline from the command line.
//!
//! Configuration comes from the environment (`UPLOAD_BACKEND`,
//! `LOCAL_STORAGE_PATH`, `SIMPLE_UPLOAD_URL`, ...) and, optionally, from a
//! JSON editor configuration passed with `--config`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sonora_cli::{init_tracing, mime_for_path, UploadReport};
use sonora_core::{AcceptancePolicy, Config, EditorConfig, FilePayload};
use sonora_document::{MemoryDocument, Schema};
use sonora_storage::create_uploader;
use sonora_upload::{AudioUploadEditing, LocalMediaResolver};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sonora", about = "Audio upload pipeline CLI")]
struct Cli {
    /// JSON editor configuration (`audio.upload`, `simpleUpload`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload audio files into a new document and print the result
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Declared MIME type for every file (default: audio/<extension>)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Resolve a local reference (data: or blob: URI) into a file
    Resolve {
        /// The `src` to resolve
        src: String,
        /// Where to write the bytes (default: the resolved file name)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the file picker `accept` filter for the configured types
    Accept,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = Config::from_env().context("Failed to load configuration from environment")?;
    let Some(path) = path else {
        return Ok(config);
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read editor configuration {}", path.display()))?;
    let editor = EditorConfig::from_json(&json)?;
    Ok(config.with_editor_config(editor))
}

async fn read_files(paths: &[PathBuf], mime: Option<&str>) -> anyhow::Result<Vec<FilePayload>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime.map(str::to_string).unwrap_or_else(|| mime_for_path(path));
        files.push(FilePayload::new(name, mime_type, data));
    }
    Ok(files)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let policy = Arc::new(
        AcceptancePolicy::from_config(&config.audio).context("Invalid audio.upload.types")?,
    );

    match cli.command {
        Commands::Upload { files, mime } => {
            config.validate()?;
            let uploader = create_uploader(&config)
                .await
                .context("Failed to create uploader")?;

            let files = read_files(&files, mime.as_deref()).await?;
            let requested = files.len();

            let model = MemoryDocument::with_empty_paragraph(Arc::new(Schema::with_audio()));
            let mut editing =
                AudioUploadEditing::new(model, policy, uploader, LocalMediaResolver::default());

            let ids = editing.execute_upload(files);
            tracing::info!(requested, accepted = ids.len(), "Uploading audio files");
            let events = editing.run_until_idle().await;
            tracing::debug!(events = events.len(), "Upload pipeline idle");

            println!("{}", editing.model().render_html());
            print_json(&UploadReport::new(requested, &ids, &events))?;
        }
        Commands::Resolve { src, output } => {
            let file = LocalMediaResolver::default()
                .resolve(&src)
                .await
                .context("Failed to resolve local media")?;
            let output = output.unwrap_or_else(|| PathBuf::from(&file.name));
            tokio::fs::write(&output, &file.data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&file.info())?;
        }
        Commands::Accept => {
            println!("{}", policy.accept_attribute());
        }
    }

    Ok(())
}
