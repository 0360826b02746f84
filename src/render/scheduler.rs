//! Background render scheduling
//!
//! Each composition id has at most one render in flight. A submitted job
//! runs load -> validate -> render -> export on tokio's blocking pool, and
//! its progress is observable as `Pending`, `Done` or `Failed` through a
//! watch channel keyed by id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::export::{ExportFormat, Exporter};
use super::renderer::{Renderer, TrackWarning};
use crate::catalog::CatalogSnapshot;
use crate::composition::CompositionStore;
use crate::error::Result;

/// Outcome of a finished render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRecord {
    pub id: String,
    pub path: PathBuf,
    pub format: ExportFormat,
    pub size: u64,
    pub sha256: String,
    pub warnings: Vec<TrackWarning>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Observable state of a render job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RenderStatus {
    Pending,
    Done(RenderRecord),
    Failed { reason: String },
}

impl RenderStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, RenderStatus::Pending)
    }
}

/// What the output directory says about a composition
///
/// This is the filesystem-only view: an artifact counts as ready when it
/// exists and is non-empty. It knows nothing about jobs in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ArtifactStatus {
    Missing,
    Ready { path: PathBuf, size: u64 },
}

/// Everything a render job needs besides the composition id
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    pub store: CompositionStore,
    pub renderer: Renderer,
    pub exporter: Exporter,
    pub output_dir: PathBuf,
    /// Reject documents whose sources are not catalogued before rendering
    pub fail_fast_sources: bool,
}

impl RenderPipeline {
    /// Run one render to completion on the current thread
    pub fn run(
        &self,
        id: &str,
        format: ExportFormat,
        catalog: &CatalogSnapshot,
    ) -> Result<RenderRecord> {
        let started_at = Utc::now();
        let id = CompositionStore::normalize_id(id);

        let check = self.fail_fast_sources.then(|| catalog.as_ref());
        let composition = self.store.load(id, check)?;

        let output = self.renderer.render(&composition);
        let artifact = self
            .exporter
            .publish(&output.buffer, &self.output_dir, id, format)?;

        Ok(RenderRecord {
            id: id.to_string(),
            path: artifact.path,
            format,
            size: artifact.size,
            sha256: artifact.sha256,
            warnings: output.warnings,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

struct SchedulerInner {
    pipeline: RenderPipeline,
    catalog: RwLock<CatalogSnapshot>,
    jobs: Mutex<HashMap<String, watch::Sender<RenderStatus>>>,
}

impl SchedulerInner {
    fn jobs(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<RenderStatus>>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Runs renders in the background, one at a time per composition id
#[derive(Clone)]
pub struct RenderScheduler {
    inner: Arc<SchedulerInner>,
}

impl RenderScheduler {
    pub fn new(pipeline: RenderPipeline, catalog: CatalogSnapshot) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                pipeline,
                catalog: RwLock::new(catalog),
                jobs: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Current catalog snapshot
    pub fn catalog(&self) -> CatalogSnapshot {
        let guard = self
            .inner
            .catalog
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a refreshed catalog; renders already running keep theirs
    pub fn replace_catalog(&self, catalog: CatalogSnapshot) {
        let mut guard = self
            .inner
            .catalog
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = catalog;
    }

    /// Start rendering `id` in the background
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Returns
    /// `false` if a render for the same id is still pending
    pub fn submit(&self, id: &str, format: ExportFormat) -> bool {
        let id = CompositionStore::normalize_id(id).to_string();

        {
            let mut jobs = self.inner.jobs();
            if let Some(tx) = jobs.get(&id) {
                if tx.borrow().is_pending() {
                    warn!(composition = %id, "Render already in progress");
                    return false;
                }
            }
            let (tx, _rx) = watch::channel(RenderStatus::Pending);
            jobs.insert(id.clone(), tx);
        }

        let catalog = self.catalog();
        let inner = Arc::clone(&self.inner);
        info!(composition = %id, %format, "Render submitted");

        tokio::spawn(async move {
            let job_inner = Arc::clone(&inner);
            let job_id = id.clone();
            let result = tokio::task::spawn_blocking(move || {
                job_inner.pipeline.run(&job_id, format, &catalog)
            })
            .await;

            let status = match result {
                Ok(Ok(record)) => {
                    info!(
                        composition = %id,
                        path = %record.path.display(),
                        warnings = record.warnings.len(),
                        "Render finished"
                    );
                    RenderStatus::Done(record)
                }
                Ok(Err(e)) => {
                    error!(composition = %id, error = %e, "Render failed");
                    RenderStatus::Failed {
                        reason: e.to_string(),
                    }
                }
                Err(join_error) => {
                    error!(composition = %id, error = %join_error, "Render task aborted");
                    RenderStatus::Failed {
                        reason: format!("render task aborted: {}", join_error),
                    }
                }
            };

            if let Some(tx) = inner.jobs().get(&id) {
                tx.send_replace(status);
            }
        });

        true
    }

    /// Latest known state of the render for `id`, if one was ever submitted
    pub fn status(&self, id: &str) -> Option<RenderStatus> {
        let id = CompositionStore::normalize_id(id);
        self.inner.jobs().get(id).map(|tx| tx.borrow().clone())
    }

    /// Wait until the render for `id` leaves `Pending`
    pub async fn wait(&self, id: &str) -> Option<RenderStatus> {
        let id = CompositionStore::normalize_id(id);
        let mut rx = self.inner.jobs().get(id)?.subscribe();

        let status = match rx.wait_for(|status| !status.is_pending()).await {
            Ok(status) => status.clone(),
            Err(_) => RenderStatus::Failed {
                reason: "render job was dropped".to_string(),
            },
        };
        Some(status)
    }

    /// Filesystem view of the published artifact for `id`
    pub fn artifact_status(&self, id: &str, format: ExportFormat) -> ArtifactStatus {
        artifact_status(&self.inner.pipeline.output_dir, id, format)
    }
}

/// Check whether `<dir>/<id>.<ext>` exists with a non-zero size
pub fn artifact_status(dir: &Path, id: &str, format: ExportFormat) -> ArtifactStatus {
    let path = Exporter::artifact_path(dir, CompositionStore::normalize_id(id), format);
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => ArtifactStatus::Ready {
            path,
            size: meta.len(),
        },
        _ => ArtifactStatus::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::engine::{write_wav, AudioBuffer, ChannelLayout};
    use crate::render::renderer::RenderSettings;
    use crate::render::source::DirectorySource;
    use std::fs;

    const COMPOSITION: &str = r#"
name: Hum
duration: 2
tracks:
  - audio: hum.wav
    volume: 0.5
  - audio: missing.wav
"#;

    fn setup() -> (tempfile::TempDir, RenderScheduler) {
        let root = tempfile::tempdir().unwrap();
        let audio = root.path().join("audio");
        let compositions = root.path().join("compositions");
        fs::create_dir_all(&audio).unwrap();
        fs::create_dir_all(&compositions).unwrap();

        let clip = AudioBuffer::from_channels(vec![vec![0.5; 500]], 1000).unwrap();
        write_wav(&clip, &audio.join("hum.wav"), 32).unwrap();
        fs::write(compositions.join("hum.yaml"), COMPOSITION).unwrap();

        let pipeline = RenderPipeline {
            store: CompositionStore::new(&compositions),
            renderer: Renderer::new(
                Arc::new(DirectorySource::new(&audio)),
                RenderSettings {
                    sample_rate: 1000,
                    layout: ChannelLayout::Stereo,
                },
            ),
            exporter: Exporter::default(),
            output_dir: root.path().join("composed"),
            fail_fast_sources: false,
        };
        let scheduler = RenderScheduler::new(pipeline, Arc::new(Catalog::default()));
        (root, scheduler)
    }

    const WAV: ExportFormat = ExportFormat::Wav { bit_depth: 16 };

    #[tokio::test]
    async fn test_submit_and_wait() {
        let (root, scheduler) = setup();

        assert_eq!(scheduler.artifact_status("hum", WAV), ArtifactStatus::Missing);
        assert!(scheduler.submit("hum", WAV));

        let status = scheduler.wait("hum").await.unwrap();
        let RenderStatus::Done(record) = status else {
            panic!("expected Done, got {:?}", status);
        };

        assert_eq!(record.path, root.path().join("composed/hum.wav"));
        assert_eq!(record.warnings.len(), 1);
        assert_eq!(record.warnings[0].audio, "missing.wav");
        assert!(record.finished_at >= record.started_at);

        match scheduler.artifact_status("hum.yaml", WAV) {
            ArtifactStatus::Ready { size, .. } => assert_eq!(size, record.size),
            other => panic!("expected Ready, got {:?}", other),
        }
        assert_eq!(scheduler.status("hum"), Some(RenderStatus::Done(record)));
    }

    #[tokio::test]
    async fn test_duplicate_submit_is_rejected_while_pending() {
        let (_root, scheduler) = setup();

        assert!(scheduler.submit("hum", WAV));
        // Either still pending (rejected) or already finished (accepted again)
        let second = scheduler.submit("hum", WAV);
        if !second {
            assert!(scheduler.status("hum").is_some());
        }
        scheduler.wait("hum").await.unwrap();
        assert!(scheduler.submit("hum", WAV));
        scheduler.wait("hum").await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_render_is_reported() {
        let (_root, scheduler) = setup();

        assert!(scheduler.submit("nope", WAV));
        match scheduler.wait("nope").await.unwrap() {
            RenderStatus::Failed { reason } => assert!(reason.contains("nope")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(scheduler.artifact_status("nope", WAV), ArtifactStatus::Missing);
    }

    #[tokio::test]
    async fn test_unknown_id_has_no_status() {
        let (_root, scheduler) = setup();
        assert_eq!(scheduler.status("hum"), None);
        assert_eq!(scheduler.wait("hum").await, None);
    }

    #[test]
    fn test_pipeline_fail_fast_uses_catalog() {
        let (_root, scheduler) = setup();
        let mut pipeline = scheduler.inner.pipeline.clone();
        pipeline.fail_fast_sources = true;

        let catalog: CatalogSnapshot = Arc::new(
            Catalog::from_yaml_str("categories:\n  t:\n    files:\n      - filename: hum.wav\n")
                .unwrap(),
        );
        let err = pipeline.run("hum", WAV, &catalog).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DOCUMENT");
    }

    #[test]
    fn test_replace_catalog_swaps_snapshot() {
        let (_root, scheduler) = setup();
        let before = scheduler.catalog();
        let next = Arc::new(
            Catalog::from_yaml_str("categories:\n  t:\n    files:\n      - filename: a.wav\n")
                .unwrap(),
        );
        scheduler.replace_catalog(Arc::clone(&next));

        assert!(before.is_empty());
        assert!(scheduler.catalog().contains("a.wav"));
    }
}
