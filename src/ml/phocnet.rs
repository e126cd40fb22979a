// ============================================================
// Layer 5 — PHOCNet (Dortmund word embedding model)
// ============================================================
// Maps a word image to a PHOC (pyramidal histogram of characters)
// vector:
//
//   Dortmund conv stack
//       → temporal pyramid max pooling (levels 1..=L)
//       → fc6 (512 * L(L+1)/2 → fc_size)  ReLU  dropout
//       → fc7 (fc_size → fc_size)         ReLU  dropout
//       → fc8 (fc_size → phoc_size)
//
// Every layer uses Caffe initialisation: N(0, sqrt(2/fan_in))
// weights and zero biases.

use anyhow::{ensure, Result};
use burn::{
    nn::{Dropout, DropoutConfig, Linear},
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

use crate::ml::conv::{caffe_linear, DortmundConv, DortmundConvConfig, DORTMUND_OUTPUT_CHANNELS};
use crate::ml::pooling::{pyramid_bins, temporal_pyramid_max_pool_padded};
use crate::ml::sequence::PaddedImages;

#[derive(Config, Debug)]
pub struct PhocNetConfig {
    /// Length of the PHOC vector predicted by fc8
    pub phoc_size: usize,
    /// Temporal pyramid levels
    #[config(default = 5)]
    pub levels:    usize,
    /// Width of fc6 and fc7
    #[config(default = 4096)]
    pub fc_size:   usize,
    #[config(default = 0.5)]
    pub dropout:   f64,
}

impl PhocNetConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.phoc_size > 0, "phoc_size must be positive");
        ensure!(self.levels > 0, "The temporal pyramid needs at least one level");
        ensure!(self.fc_size > 0, "fc_size must be positive");
        ensure!(
            (0.0..1.0).contains(&self.dropout),
            "dropout must be in [0, 1), got {}",
            self.dropout
        );
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PhocNet<B> {
        let conv = DortmundConvConfig::new().with_caffe_init(true).init(device);
        let tpp_features = DORTMUND_OUTPUT_CHANNELS * pyramid_bins(self.levels);
        PhocNet {
            conv,
            fc6:     caffe_linear(tpp_features, self.fc_size, device),
            fc7:     caffe_linear(self.fc_size, self.fc_size, device),
            fc8:     caffe_linear(self.fc_size, self.phoc_size, device),
            dropout: DropoutConfig::new(self.dropout).init(),
            levels:  self.levels,
        }
    }
}

#[derive(Module, Debug)]
pub struct PhocNet<B: Backend> {
    pub conv:    DortmundConv<B>,
    pub fc6:     Linear<B>,
    pub fc7:     Linear<B>,
    pub fc8:     Linear<B>,
    pub dropout: Dropout,
    pub levels:  usize,
}

impl<B: Backend> PhocNet<B> {
    /// images: [batch, 1, H, W] → PHOC logits [batch, phoc_size]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward_padded(PaddedImages::uniform(images))
    }

    /// Same as `forward`, pooling only the real region of each image.
    pub fn forward_padded(&self, images: PaddedImages<B>) -> Tensor<B, 2> {
        let features = self.conv.forward_padded(images);
        let x = temporal_pyramid_max_pool_padded(&features, self.levels);
        let x = self.dropout.forward(relu(self.fc6.forward(x)));
        let x = self.dropout.forward(relu(self.fc7.forward(x)));
        self.fc8.forward(x)
    }

    /// PHOC attribute probabilities in [0, 1].
    pub fn forward_probs(&self, images: PaddedImages<B>) -> Tensor<B, 2> {
        sigmoid(self.forward_padded(images))
    }
}
