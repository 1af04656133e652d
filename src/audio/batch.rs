use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::analysis::{extract, AnalysisConfig};
use super::decode::DecodedAudio;
use super::features::RawChannelData;
use super::source::SourceRegistry;
use crate::error::MotionError;

/// One file queued for import. The first input becomes the master.
#[derive(Clone, Debug)]
pub struct SourceInput {
    pub name: String,
    pub path: PathBuf,
}

impl SourceInput {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("source")
            .to_string();
        Self { name, path }
    }
}

/// Emitted after each source finishes decoding and extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    /// 0..=100, never decreasing within a batch.
    pub percent: f32,
    pub source: String,
}

/// Everything one batch produced. Only exists when every source succeeded.
#[derive(Debug)]
pub struct BatchOutput {
    pub registry: SourceRegistry,
    pub channels: Vec<RawChannelData>,
}

/// Decode and analyze `inputs` one after another.
///
/// Source `i + 1` starts only after source `i` is fully extracted. Any
/// failure or a raised `cancel` flag discards everything collected so far.
pub fn run_batch<F, P>(
    inputs: &[SourceInput],
    config: &AnalysisConfig,
    load: F,
    cancel: &AtomicBool,
    mut on_progress: P,
) -> Result<BatchOutput, MotionError>
where
    F: Fn(&SourceInput) -> Result<DecodedAudio, MotionError>,
    P: FnMut(BatchProgress),
{
    config.validate()?;

    let mut registry = SourceRegistry::new();
    let mut channels = Vec::new();
    let total = inputs.len();

    for (i, input) in inputs.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            log::warn!("Analysis cancelled after {}/{} sources", i, total);
            return Err(MotionError::Cancelled);
        }

        let audio = load(input)?;
        let source = registry.register(&input.name, audio);
        channels.extend(extract(source, config)?);

        on_progress(BatchProgress {
            completed: i + 1,
            total,
            percent: (i + 1) as f32 / total as f32 * 100.0,
            source: input.name.clone(),
        });
    }

    log::info!("Analyzed {} sources into {} channels", total, channels.len());
    Ok(BatchOutput { registry, channels })
}

/// A batch running on a background thread.
pub struct AnalysisBatch {
    cancel: Arc<AtomicBool>,
    progress: Receiver<BatchProgress>,
    handle: JoinHandle<Result<BatchOutput, MotionError>>,
}

impl AnalysisBatch {
    /// Start analysis off the calling thread. The configuration is checked
    /// here so invalid settings fail before any work is scheduled.
    pub fn spawn<F>(inputs: Vec<SourceInput>, config: AnalysisConfig, load: F) -> Result<Self, MotionError>
    where
        F: Fn(&SourceInput) -> Result<DecodedAudio, MotionError> + Send + 'static,
    {
        config.validate()?;

        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, progress): (Sender<BatchProgress>, Receiver<BatchProgress>) = mpsc::channel();
        let worker_cancel = Arc::clone(&cancel);

        let handle = std::thread::spawn(move || {
            run_batch(&inputs, &config, load, &worker_cancel, |p| {
                // receiver may be gone if the caller stopped listening
                let _ = tx.send(p);
            })
        });

        Ok(Self {
            cancel,
            progress,
            handle,
        })
    }

    pub fn progress(&self) -> &Receiver<BatchProgress> {
        &self.progress
    }

    /// Abandon the batch. Takes effect before the next source starts.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Block until the worker finishes.
    pub fn wait(self) -> Result<BatchOutput, MotionError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
