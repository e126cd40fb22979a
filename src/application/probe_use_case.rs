// ============================================================
// Layer 2 — ProbeUseCase
// ============================================================
// Reloads a checkpoint and pushes a padded batch of random
// images of the requested sizes through it:
//
//   Step 1: Read model.json, rebuild the model   (Layer 6 + 5)
//   Step 2: Load the latest weights              (Layer 6)
//   Step 3: Collate random images into a batch   (Layer 5)
//   Step 4: Forward pass
//   Step 5: CTC models → greedy decode per image
//           PHOC model → count active attributes
//
// Useful for checking that a checkpoint loads and that the frame
// counts match the image widths.

use std::path::PathBuf;

use anyhow::{ensure, Result};
use burn::{prelude::*, tensor::Distribution};

use crate::application::{architecture::ArchitectureConfig, CliBackend};
use crate::domain::symbols::SymbolsTable;
use crate::infra::checkpoint::{CheckpointManager, DEFAULT_KEEP_LAST};
use crate::ml::{
    decoder::greedy_decode,
    sequence::{PaddedImages, SequenceBatch},
};

const PHOC_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub checkpoint_dir: String,
    /// (height, width) of each probe image
    pub sizes:          Vec<[usize; 2]>,
    pub symbols:        Option<PathBuf>,
    pub blank:          usize,
}

/// Result for one probe image.
#[derive(Debug, Clone)]
pub struct ProbeSample {
    pub size:       [usize; 2],
    /// Output frames (CTC models only)
    pub frames:     Option<usize>,
    pub prediction: String,
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub architecture: &'static str,
    pub output_shape: Vec<usize>,
    pub samples:      Vec<ProbeSample>,
}

pub struct ProbeUseCase {
    config: ProbeConfig,
}

impl ProbeUseCase {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ProbeReport> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        self.execute_on::<CliBackend>(&device)
    }

    pub fn execute_on<B: Backend>(&self, device: &B::Device) -> Result<ProbeReport> {
        let cfg = &self.config;
        ensure!(!cfg.sizes.is_empty(), "Give at least one image size to probe");

        let manager      = CheckpointManager::new(&cfg.checkpoint_dir);
        let architecture = manager.load_config()?;
        let saver        = manager.saver(DEFAULT_KEEP_LAST);
        let symbols      = cfg.symbols.as_deref().map(SymbolsTable::load).transpose()?;

        let images: Vec<Tensor<B, 3>> = cfg
            .sizes
            .iter()
            .map(|&[h, w]| Tensor::random([1, h, w], Distribution::Default, device))
            .collect();
        let batch = PaddedImages::collate(images)?;
        tracing::info!(
            "Probing {} model with {} images",
            architecture.name(),
            batch.batch_size()
        );

        let report = match &architecture {
            ArchitectureConfig::DortmundPhoc(c) => {
                let model = saver.load::<B, _>(c.init::<B>(device), device)?;
                let probs = model.forward_probs(batch);
                self.phoc_report(architecture.name(), probs)
            }
            ArchitectureConfig::DortmundCtc(c) => {
                let model = saver.load::<B, _>(c.init::<B>(device), device)?;
                let logits = model.forward_padded(batch);
                self.ctc_report(architecture.name(), &logits, symbols.as_ref())
            }
            ArchitectureConfig::VggCtc(c) => {
                let model = saver.load::<B, _>(c.init::<B>(device), device)?;
                let logits = model.forward_padded(batch);
                self.ctc_report(architecture.name(), &logits, symbols.as_ref())
            }
        };
        Ok(report)
    }

    fn phoc_report<B: Backend>(&self, architecture: &'static str, probs: Tensor<B, 2>) -> ProbeReport {
        let [batch, phoc_size] = probs.dims();
        let values: Vec<f32> = probs.into_data().iter::<f32>().collect();

        let samples = self
            .config
            .sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let row = &values[i * phoc_size..(i + 1) * phoc_size];
                let active = row.iter().filter(|&&p| p > PHOC_THRESHOLD).count();
                ProbeSample {
                    size,
                    frames: None,
                    prediction: format!("{active}/{phoc_size} attributes active"),
                }
            })
            .collect();

        ProbeReport { architecture, output_shape: vec![batch, phoc_size], samples }
    }

    fn ctc_report<B: Backend>(
        &self,
        architecture: &'static str,
        logits:       &SequenceBatch<B>,
        symbols:      Option<&SymbolsTable>,
    ) -> ProbeReport {
        let decoded = greedy_decode(logits, self.config.blank);

        let samples = self
            .config
            .sizes
            .iter()
            .zip(logits.lengths.iter())
            .zip(decoded.iter())
            .map(|((&size, &frames), ids)| {
                let prediction = match symbols {
                    Some(table) => table.decode(ids),
                    None => ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" "),
                };
                ProbeSample { size, frames: Some(frames), prediction }
            })
            .collect();

        ProbeReport {
            architecture,
            output_shape: logits.data.dims().to_vec(),
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::application::init_use_case::{InitConfig, InitUseCase};
    use crate::ml::ctc_model::VggCtcConfig;
    use crate::ml::phocnet::PhocNetConfig;

    type TestBackend = NdArray<f32>;

    fn init(dir: &str, architecture: ArchitectureConfig) {
        InitUseCase::new(InitConfig {
            architecture,
            checkpoint_dir: dir.to_string(),
            keep_last: 2,
        })
        .execute_on::<TestBackend>(&Default::default())
        .unwrap();
    }

    #[test]
    fn probe_ctc_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_string_lossy().into_owned();
        init(&dir, ArchitectureConfig::VggCtc(VggCtcConfig::new(vec![4, 4], vec![2], 2, 3, 1, 5)));

        let symbols = tmp.path().join("syms.txt");
        std::fs::write(&symbols, "<ctc> 0\na 1\nb 2\nc 3\nd 4\n").unwrap();

        let report = ProbeUseCase::new(ProbeConfig {
            checkpoint_dir: dir,
            sizes: vec![[8, 20], [6, 12]],
            symbols: Some(symbols),
            blank: 0,
        })
        .execute_on::<TestBackend>(&Default::default())
        .unwrap();

        assert_eq!(report.architecture, "vgg-ctc");
        assert_eq!(report.output_shape, vec![2, 10, 5]);
        assert_eq!(report.samples[0].frames, Some(10));
        assert_eq!(report.samples[1].frames, Some(6));
        assert!(report.samples[1].prediction.chars().count() <= 6);
    }

    #[test]
    fn probe_phoc_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_string_lossy().into_owned();
        init(
            &dir,
            ArchitectureConfig::DortmundPhoc(PhocNetConfig::new(12).with_levels(2).with_fc_size(8)),
        );

        let report = ProbeUseCase::new(ProbeConfig {
            checkpoint_dir: dir,
            sizes: vec![[16, 16]],
            symbols: None,
            blank: 0,
        })
        .execute_on::<TestBackend>(&Default::default())
        .unwrap();

        assert_eq!(report.output_shape, vec![1, 12]);
        assert_eq!(report.samples[0].frames, None);
        assert!(report.samples[0].prediction.ends_with("/12 attributes active"));
    }

    #[test]
    fn probe_without_checkpoint_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let result = ProbeUseCase::new(ProbeConfig {
            checkpoint_dir: tmp.path().to_string_lossy().into_owned(),
            sizes: vec![[8, 8]],
            symbols: None,
            blank: 0,
        })
        .execute_on::<TestBackend>(&Default::default());
        assert!(result.is_err());
    }
}
