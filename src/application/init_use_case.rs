// ============================================================
// Layer 2 — InitUseCase
// ============================================================
// Builds a freshly initialised model and checkpoints it:
//
//   Step 1: Validate the architecture          (Layer 5 - ml)
//   Step 2: Check and save model.json          (Layer 6 - infra)
//   Step 3: Build the model on the device      (Layer 5 - ml)
//   Step 4: Rotate old weights, save new ones  (Layer 6 - infra)
//
// Running it again on the same directory keeps the previous
// weights as model.bin-1, model.bin-2, ... up to keep_last files.
// A directory saved with another architecture is refused, since
// its older weights could no longer be rebuilt.

use anyhow::Result;
use burn::prelude::*;

use crate::application::{
    architecture::{ArchitectureConfig, ModelSummary},
    CliBackend,
};
use crate::infra::checkpoint::CheckpointManager;

#[derive(Debug, Clone)]
pub struct InitConfig {
    pub architecture:   ArchitectureConfig,
    pub checkpoint_dir: String,
    pub keep_last:      usize,
}

pub struct InitUseCase {
    config: InitConfig,
}

impl InitUseCase {
    pub fn new(config: InitConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ModelSummary> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<CliBackend>(&device)
    }

    pub fn execute_on<B: Backend>(&self, device: &B::Device) -> Result<ModelSummary> {
        let cfg = &self.config;
        cfg.architecture.validate()?;

        let manager = CheckpointManager::new(&cfg.checkpoint_dir);
        manager.check_config(&cfg.architecture)?;
        manager.save_config(&cfg.architecture)?;
        let saver = manager.saver(cfg.keep_last);

        let name = cfg.architecture.name();
        tracing::info!("Initialising {} model", name);

        let (layers, num_params) = match &cfg.architecture {
            ArchitectureConfig::DortmundPhoc(c) => {
                let model = c.init::<B>(device);
                saver.save::<B, _>(&model)?;
                (model.to_string(), model.num_params())
            }
            ArchitectureConfig::DortmundCtc(c) => {
                let model = c.init::<B>(device);
                saver.save::<B, _>(&model)?;
                (model.to_string(), model.num_params())
            }
            ArchitectureConfig::VggCtc(c) => {
                let model = c.init::<B>(device);
                saver.save::<B, _>(&model)?;
                (model.to_string(), model.num_params())
            }
        };

        tracing::info!("Checkpoint written to '{}'", saver.filename().display());
        Ok(ModelSummary { name, layers, num_params })
    }
}
