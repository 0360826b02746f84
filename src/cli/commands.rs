//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::{Catalog, LoudnessLevel};
use crate::config::Config;
use crate::error::{Result, WhitenoiseError};
use crate::generate::{generate_composition, DeepSeekComposer};
use crate::render::{ExportFormat, RenderPipeline, RenderScheduler, RenderStatus, Renderer};

/// Load the catalog, or an empty one when the file does not exist yet
fn load_catalog_or_empty(config: &Config) -> Result<Catalog> {
    match Catalog::load(&config.catalog_path) {
        Ok(catalog) => Ok(catalog),
        Err(WhitenoiseError::CatalogNotFound { path }) => {
            warn!(path = %path.display(), "No catalog found; continuing without one");
            Ok(Catalog::default())
        }
        Err(e) => Err(e),
    }
}

/// List stored compositions.
pub fn list(config: &Config) -> Result<()> {
    let summaries = config.store().list()?;

    if summaries.is_empty() {
        println!("No compositions in {}", config.compositions_dir.display());
        return Ok(());
    }

    println!("{:<24} {:<28} {:>8} {:>7}", "ID", "NAME", "SECONDS", "TRACKS");
    println!("{:-<70}", "");
    for summary in &summaries {
        println!(
            "{:<24} {:<28} {:>8.0} {:>7}",
            summary.id, summary.name, summary.duration, summary.track_count
        );
    }

    Ok(())
}

/// Show one composition with per-track catalog details.
pub fn info(config: &Config, id: &str) -> Result<()> {
    let catalog = load_catalog_or_empty(config)?;
    let detail = config.store().detail(id, &catalog)?;
    println!("{}", serde_json::to_string_pretty(&detail)?);
    Ok(())
}

/// Render compositions in the background and wait for all of them.
///
/// # Returns
/// Number of renders that failed
pub fn render(
    config: &Config,
    ids: &[String],
    format: Option<&str>,
    bitrate: Option<&str>,
    strict: bool,
) -> Result<usize> {
    let format = match format {
        Some(name) => ExportFormat::parse(name, bitrate)?,
        None if bitrate.is_some() => {
            ExportFormat::parse(config.export_format.extension(), bitrate)?
        }
        None => config.export_format,
    };

    config.ensure_dirs()?;
    let catalog = Arc::new(load_catalog_or_empty(config)?);

    let pipeline = RenderPipeline {
        store: config.store(),
        renderer: Renderer::new(Arc::new(config.source()), config.render_settings()),
        exporter: config.exporter(),
        output_dir: config.composed_dir.clone(),
        fail_fast_sources: strict,
    };
    let scheduler = RenderScheduler::new(pipeline, catalog);

    let runtime = tokio::runtime::Runtime::new()?;
    let results = runtime.block_on(async {
        for id in ids {
            if !scheduler.submit(id, format) {
                info!(composition = %id, "Skipping duplicate id");
            }
        }

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(status) = scheduler.wait(id).await {
                results.push((id.clone(), status));
            }
        }
        results
    });

    let mut failed = 0;
    for (id, status) in &results {
        match status {
            RenderStatus::Done(record) => {
                println!(
                    "{}: {} ({} bytes, sha256 {})",
                    id,
                    record.path.display(),
                    record.size,
                    &record.sha256[..12.min(record.sha256.len())]
                );
                for warning in &record.warnings {
                    println!("  warning: {}", warning);
                }
            }
            RenderStatus::Failed { reason } => {
                failed += 1;
                println!("{}: FAILED - {}", id, reason);
            }
            RenderStatus::Pending => {}
        }
    }

    Ok(failed)
}

/// Generate a composition from a scene description.
pub fn generate(config: &Config, scene: &str, save: bool) -> Result<()> {
    let catalog = Catalog::load(&config.catalog_path)?;
    let composer = DeepSeekComposer::new(config.llm.clone());

    let generated = match generate_composition(&composer, &catalog, scene) {
        Ok(generated) => generated,
        Err(e) => {
            if let Some(raw) = e.raw_response() {
                eprintln!("Model reply:\n{}", raw);
            }
            return Err(e);
        }
    };

    println!("# id: {}", generated.id);
    println!("{}", generated.yaml);

    if save {
        let path = generated.save(&config.store())?;
        println!("Saved: {}", path.display());
    }

    Ok(())
}

/// Re-measure catalogued clips and write the catalog back.
pub fn rescan(config: &Config, dry_run: bool) -> Result<()> {
    let catalog = Catalog::load(&config.catalog_path)?;
    let (refreshed, report) = catalog.rescan(&config.audio_dir);

    if !dry_run {
        refreshed.save(&config.catalog_path)?;
        info!(path = %config.catalog_path.display(), "Catalog written");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print the catalog as JSON.
pub fn sounds(config: &Config) -> Result<()> {
    let catalog = Catalog::load(&config.catalog_path)?;
    println!("{}", serde_json::to_string_pretty(catalog.document())?);
    Ok(())
}

/// Print the loudness tier and suggested volume for a level.
pub fn classify(db: f64) -> Result<()> {
    let level = LoudnessLevel::classify(db);
    let (low, high) = level.suggested_volume();
    println!("{} dBFS -> {} (suggested volume {:.2}-{:.2})", db, level, low, high);
    Ok(())
}
