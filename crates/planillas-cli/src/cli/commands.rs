use anyhow::{Context, Result};
use clap::Parser;
use planillas::api::PlanillasApi;
use planillas::commands::CmdResult;
use planillas::config::PlanillasConfig;
use planillas::model::Attachment;
use planillas::store::fs_backend::FsBackend;
use planillas::store::DoctorOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use super::render::{print_result, RenderMode};
use super::setup::{Cli, Commands, MetaSource};

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    debug!(
        uploads = %config.uploads_dir.display(),
        db = %config.db_file.display(),
        mirror = config.mirror.is_enabled(),
        "configuration loaded"
    );
    let api = PlanillasApi::from_config(&config).context("could not open the planilla store")?;

    let mode = if cli.json {
        RenderMode::Json
    } else {
        RenderMode::Text
    };
    let result = dispatch(&api, cli.command).await?;
    print_result(&result, mode)
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Relative paths in an explicit config file are resolved against its directory.
fn load_config(path: Option<&Path>) -> Result<PlanillasConfig> {
    let config = PlanillasConfig::load(path).context("could not load configuration")?;
    Ok(match path.and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => config.rooted_at(dir),
        _ => config,
    })
}

async fn dispatch(api: &PlanillasApi<FsBackend>, command: Commands) -> Result<CmdResult> {
    let result = match command {
        Commands::Create { source, images } => {
            let meta = read_meta(&source)?.unwrap_or_else(|| "{}".to_string());
            let (attachments, mut uploaded) = upload_images(api, &images)?;
            match api.create_planilla(&meta, attachments).await {
                Ok(mut result) => {
                    result.uploads.append(&mut uploaded);
                    result
                }
                Err(e) => {
                    discard_uploads(api, &uploaded);
                    return Err(e.into());
                }
            }
        }
        Commands::List => api.list_planillas()?,
        Commands::Get { id } => api.get_planilla(&id)?,
        Commands::Sync { id, remote_id } => api.sync_planilla(&id, remote_id).await?,
        Commands::Update { id, source, images } => {
            let meta = read_meta(&source)?
                .context("update needs the new metadata (--meta or --meta-file)")?;
            let (attachments, mut uploaded) = upload_images(api, &images)?;
            match api.update_planilla(&id, &meta, attachments).await {
                Ok(mut result) => {
                    result.uploads.append(&mut uploaded);
                    result
                }
                Err(e) => {
                    discard_uploads(api, &uploaded);
                    return Err(e.into());
                }
            }
        }
        Commands::Delete { id } => api.delete_planilla(&id).await?,
        Commands::Upload { path } => {
            let (name, bytes) = read_image(&path)?;
            api.upload(&name, &bytes)?
        }
        Commands::RemoveUpload { filename } => api.remove_upload(&filename)?,
        Commands::Doctor {
            prune_attachments,
            grace_secs,
        } => api.doctor(&DoctorOptions {
            prune_attachments,
            grace: Duration::from_secs(grace_secs),
        })?,
    };
    Ok(result)
}

fn read_meta(source: &MetaSource) -> Result<Option<String>> {
    if let Some(meta) = &source.meta {
        return Ok(Some(meta.clone()));
    }
    match &source.meta_file {
        Some(path) => std::fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("could not read {}", path.display())),
        None => Ok(None),
    }
}

fn read_image(path: &Path) -> Result<(String, Vec<u8>)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file path: {}", path.display()))?
        .to_string();
    let bytes =
        std::fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
    Ok((name, bytes))
}

/// Upload each image; on failure, undo the uploads already made.
fn upload_images(
    api: &PlanillasApi<FsBackend>,
    paths: &[PathBuf],
) -> Result<(Vec<Attachment>, Vec<planillas::store::UploadedFile>)> {
    let mut uploaded = Vec::new();
    for path in paths {
        let stored = read_image(path).and_then(|(name, bytes)| {
            api.store()
                .store_upload(&name, &bytes)
                .map_err(anyhow::Error::from)
        });
        match stored {
            Ok(file) => uploaded.push(file),
            Err(e) => {
                discard_uploads(api, &uploaded);
                return Err(e);
            }
        }
    }
    let attachments = uploaded.iter().map(|f| f.to_attachment()).collect();
    Ok((attachments, uploaded))
}

fn discard_uploads(api: &PlanillasApi<FsBackend>, uploaded: &[planillas::store::UploadedFile]) {
    for file in uploaded {
        if let Err(e) = api.store().delete_upload(&file.filename) {
            warn!(filename = %file.filename, error = %e, "could not discard upload");
        }
    }
}
