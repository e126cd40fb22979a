// ============================================================
// Layer 6 — Checkpoints
// ============================================================
// Two pieces:
//
//   KeepLastSaver     — writes the latest weights to one fixed
//                       path and keeps a bounded history by
//                       rotating older files:
//
//                         model.bin-3  ← model.bin-2
//                         model.bin-2  ← model.bin-1
//                         model.bin-1  ← model.bin
//                         model.bin    ← new weights
//
//                       With keep_last = 5 at most five files exist:
//                       the fixed path plus -1 .. -4.
//
//   CheckpointManager — a checkpoint directory holding the
//                       architecture config (model.json) next to
//                       the rotated weights (model.bin), so a model
//                       can be rebuilt before its weights are loaded.
//
// Weights are serialised with burn's full-precision binary
// recorder into bytes and written by us, so the file name is
// exactly the configured path (no extension appended).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
};

use crate::application::architecture::ArchitectureConfig;

const WEIGHTS_FILE: &str = "model.bin";
const CONFIG_FILE:  &str = "model.json";

/// Number of checkpoint versions kept when none is configured.
pub const DEFAULT_KEEP_LAST: usize = 5;

type WeightsRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// Saves model weights to a fixed path, keeping the last `keep_last` versions.
#[derive(Debug, Clone)]
pub struct KeepLastSaver {
    filename:  PathBuf,
    keep_last: usize,
}

impl KeepLastSaver {
    pub fn new(filename: impl Into<PathBuf>, keep_last: usize) -> Self {
        Self { filename: filename.into(), keep_last }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Path of the `index`-th older version: "{filename}-{index}".
    pub fn versioned(&self, index: usize) -> PathBuf {
        let mut name = self.filename.clone().into_os_string();
        name.push(format!("-{index}"));
        PathBuf::from(name)
    }

    /// Shift every existing version one slot older, oldest first.
    /// The version that falls off the end is overwritten.
    pub fn rotate(&self) -> Result<()> {
        for i in (1..self.keep_last).rev() {
            let older = self.versioned(i);
            let newer = if i > 1 { self.versioned(i - 1) } else { self.filename.clone() };
            if newer.is_file() {
                fs::rename(&newer, &older).with_context(|| {
                    format!("Cannot rotate '{}' to '{}'", newer.display(), older.display())
                })?;
            }
        }
        Ok(())
    }

    /// Rotate the history, then write the model's weights to the fixed path.
    pub fn save<B: Backend, M: Module<B>>(&self, model: &M) -> Result<()> {
        self.rotate()?;

        let bytes = Recorder::<B>::record(&WeightsRecorder::default(), model.clone().into_record(), ())
            .with_context(|| format!("Cannot serialise weights for '{}'", self.filename.display()))?;

        if let Some(parent) = self.filename.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        fs::write(&self.filename, bytes)
            .with_context(|| format!("Cannot write checkpoint '{}'", self.filename.display()))?;

        tracing::info!("Saved checkpoint '{}'", self.filename.display());
        Ok(())
    }

    /// Load the latest weights into `model`.
    /// The architecture of `model` must match the saved one.
    pub fn load<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let bytes = fs::read(&self.filename).with_context(|| {
            format!(
                "Cannot read checkpoint '{}'. Have you run 'init' first?",
                self.filename.display()
            )
        })?;
        let record = Recorder::<B>::load(&WeightsRecorder::default(), bytes, device)
            .with_context(|| {
                format!("Checkpoint '{}' does not match the model", self.filename.display())
            })?;
        tracing::debug!("Loaded checkpoint '{}'", self.filename.display());
        Ok(model.load_record(record))
    }
}

/// A directory holding a model's architecture config and its rotated weights.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saver for the weights of this directory.
    pub fn saver(&self, keep_last: usize) -> KeepLastSaver {
        KeepLastSaver::new(self.dir.join(WEIGHTS_FILE), keep_last)
    }

    pub fn save_config(&self, config: &ArchitectureConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved architecture config to '{}'", path.display());
        Ok(())
    }

    /// Fail if the directory already holds weights of another architecture.
    /// Rotated weight versions are rebuilt from the one saved config.
    pub fn check_config(&self, config: &ArchitectureConfig) -> Result<()> {
        if !self.dir.join(CONFIG_FILE).is_file() {
            return Ok(());
        }
        let saved = self.load_config()?;
        ensure!(
            serde_json::to_value(&saved)? == serde_json::to_value(config)?,
            "'{}' holds a {} checkpoint with a different architecture. \
             Use another --checkpoint-dir or remove the old checkpoint.",
            self.dir.display(),
            saved.name()
        );
        Ok(())
    }

    pub fn load_config(&self) -> Result<ArchitectureConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'init' first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid architecture config in '{}'", path.display()))
    }
}
