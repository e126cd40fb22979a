// ============================================================
// Layer 2 — Architecture Configuration
// ============================================================
// The three model families under one serialisable type. This is
// what gets written to model.json in a checkpoint directory and
// what the use cases dispatch on.

use anyhow::Result;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ml::{
    ctc_model::{DortmundCtcConfig, VggCtcConfig},
    phocnet::PhocNetConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchitectureConfig {
    /// PHOCNet: Dortmund conv + TPP + fully connected layers
    DortmundPhoc(PhocNetConfig),

    /// Dortmund conv + BLSTM CTC model
    DortmundCtc(DortmundCtcConfig),

    /// Configurable VGG conv + BLSTM CTC model
    VggCtc(VggCtcConfig),
}

/// Printable description of an initialised model.
#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub name:        &'static str,
    pub layers:      String,
    pub num_params:  usize,
}

impl ArchitectureConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DortmundPhoc(_) => "dortmund-phoc",
            Self::DortmundCtc(_)  => "dortmund-ctc",
            Self::VggCtc(_)       => "vgg-ctc",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::DortmundPhoc(c) => c.validate(),
            Self::DortmundCtc(c)  => c.validate(),
            Self::VggCtc(c)       => c.validate(),
        }
    }

    /// True for models with a per-frame CTC output.
    pub fn is_ctc(&self) -> bool {
        !matches!(self, Self::DortmundPhoc(_))
    }

    /// Build the model on `device` and describe it.
    pub fn summarize<B: Backend>(&self, device: &B::Device) -> ModelSummary {
        let (layers, num_params) = match self {
            Self::DortmundPhoc(c) => {
                let m = c.init::<B>(device);
                (m.to_string(), m.num_params())
            }
            Self::DortmundCtc(c) => {
                let m = c.init::<B>(device);
                (m.to_string(), m.num_params())
            }
            Self::VggCtc(c) => {
                let m = c.init::<B>(device);
                (m.to_string(), m.num_params())
            }
        };
        ModelSummary { name: self.name(), layers, num_params }
    }
}
