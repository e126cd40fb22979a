// ============================================================
// Layer 5 — CTC Recognition Models
// ============================================================
// Conv feature extractor + recurrent head producing per-frame
// symbol logits for CTC:
//
//   conv stack                    [N, C, H', W']   (sizes tracked)
//   adaptive avg pool (height)    [N, C, P, W']
//   image → sequence              [N, W', C*P]
//   dropout → BLSTM → dropout     [N, W', 2*hidden]
//   linear                        [N, W', num_outputs]
//
// Two conv front-ends are available:
//   DortmundCtc — the fixed Dortmund stack (512 channels)
//   VggCtc      — a configurable stack with leaky ReLU
//
// Dropout only fires on autodiff backends, so inference on a
// plain backend (or after `model.valid()`) is deterministic.

use anyhow::{ensure, Result};
use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::ml::blstm::{Blstm, BlstmConfig};
use crate::ml::conv::{
    DortmundConv, DortmundConvConfig, VggConv, VggConvConfig, DORTMUND_OUTPUT_CHANNELS,
};
use crate::ml::pooling::adaptive_avg_pool_height;
use crate::ml::sequence::{image_to_sequence, PaddedImages, SequenceBatch};

fn validate_head(
    num_outputs:          usize,
    adaptive_pool_height: usize,
    lstm_hidden_size:     usize,
    lstm_num_layers:      usize,
    dropout:              f64,
) -> Result<()> {
    ensure!(num_outputs > 0, "num_outputs must be positive");
    ensure!(adaptive_pool_height > 0, "adaptive_pool_height must be positive");
    ensure!(lstm_hidden_size > 0, "lstm_hidden_size must be positive");
    ensure!(lstm_num_layers > 0, "The BLSTM needs at least one layer");
    ensure!(
        (0.0..1.0).contains(&dropout),
        "dropout must be in [0, 1), got {dropout}"
    );
    Ok(())
}

// ─── Recurrent head ───────────────────────────────────────────────────────────

/// Everything after the conv stack: pooling, collapse, BLSTM and projection.
#[derive(Module, Debug)]
pub struct RecurrentHead<B: Backend> {
    pub blstm:                Blstm<B>,
    pub linear:               Linear<B>,
    pub dropout:              Dropout,
    pub adaptive_pool_height: usize,
}

impl<B: Backend> RecurrentHead<B> {
    fn new(
        conv_channels:        usize,
        adaptive_pool_height: usize,
        lstm_hidden_size:     usize,
        lstm_num_layers:      usize,
        num_outputs:          usize,
        dropout:              f64,
        device:               &B::Device,
    ) -> Self {
        let blstm = BlstmConfig::new(conv_channels * adaptive_pool_height, lstm_hidden_size)
            .with_num_layers(lstm_num_layers)
            .with_dropout(dropout)
            .init(device);
        let linear = LinearConfig::new(2 * lstm_hidden_size, num_outputs).init(device);
        Self {
            blstm,
            linear,
            dropout: DropoutConfig::new(dropout).init(),
            adaptive_pool_height,
        }
    }

    pub fn forward(&self, features: PaddedImages<B>) -> SequenceBatch<B> {
        let pooled = adaptive_avg_pool_height(features, self.adaptive_pool_height);
        let seq = image_to_sequence(pooled).map(|x| self.dropout.forward(x));
        let seq = self.blstm.forward(seq).map(|x| self.dropout.forward(x));
        seq.map(|x| self.linear.forward(x))
    }
}

// ─── DortmundCtc ──────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct DortmundCtcConfig {
    /// Number of CTC output symbols, blank included
    pub num_outputs:          usize,
    #[config(default = 16)]
    pub adaptive_pool_height: usize,
    #[config(default = 128)]
    pub lstm_hidden_size:     usize,
    #[config(default = 1)]
    pub lstm_num_layers:      usize,
    #[config(default = 0.5)]
    pub dropout:              f64,
}

impl DortmundCtcConfig {
    pub fn validate(&self) -> Result<()> {
        validate_head(
            self.num_outputs,
            self.adaptive_pool_height,
            self.lstm_hidden_size,
            self.lstm_num_layers,
            self.dropout,
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> DortmundCtc<B> {
        DortmundCtc {
            conv: DortmundConvConfig::new().init(device),
            head: RecurrentHead::new(
                DORTMUND_OUTPUT_CHANNELS,
                self.adaptive_pool_height,
                self.lstm_hidden_size,
                self.lstm_num_layers,
                self.num_outputs,
                self.dropout,
                device,
            ),
        }
    }
}

#[derive(Module, Debug)]
pub struct DortmundCtc<B: Backend> {
    pub conv: DortmundConv<B>,
    pub head: RecurrentHead<B>,
}

impl<B: Backend> DortmundCtc<B> {
    /// images: [batch, 1, H, W] → logits [batch, ceil(W/4), num_outputs]
    pub fn forward(&self, images: Tensor<B, 4>) -> SequenceBatch<B> {
        self.forward_padded(PaddedImages::uniform(images))
    }

    /// Frame counts follow each image's real width.
    pub fn forward_padded(&self, images: PaddedImages<B>) -> SequenceBatch<B> {
        self.head.forward(self.conv.forward_padded(images))
    }
}

// ─── VggCtc ───────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct VggCtcConfig {
    pub num_filters:          Vec<usize>,
    pub maxpool_sizes:        Vec<usize>,
    pub adaptive_pool_height: usize,
    pub lstm_hidden_size:     usize,
    pub lstm_num_layers:      usize,
    pub num_outputs:          usize,
    #[config(default = 0.5)]
    pub dropout:              f64,
}

impl VggCtcConfig {
    fn conv_config(&self) -> VggConvConfig {
        VggConvConfig::new(self.num_filters.clone(), self.maxpool_sizes.clone())
    }

    pub fn validate(&self) -> Result<()> {
        self.conv_config().validate()?;
        validate_head(
            self.num_outputs,
            self.adaptive_pool_height,
            self.lstm_hidden_size,
            self.lstm_num_layers,
            self.dropout,
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> VggCtc<B> {
        let conv = self.conv_config().init(device);
        let head = RecurrentHead::new(
            conv.output_channels(),
            self.adaptive_pool_height,
            self.lstm_hidden_size,
            self.lstm_num_layers,
            self.num_outputs,
            self.dropout,
            device,
        );
        VggCtc { conv, head }
    }
}

#[derive(Module, Debug)]
pub struct VggCtc<B: Backend> {
    pub conv: VggConv<B>,
    pub head: RecurrentHead<B>,
}

impl<B: Backend> VggCtc<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> SequenceBatch<B> {
        self.forward_padded(PaddedImages::uniform(images))
    }

    pub fn forward_padded(&self, images: PaddedImages<B>) -> SequenceBatch<B> {
        self.head.forward(self.conv.forward_padded(images))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    fn small_vgg() -> VggCtcConfig {
        VggCtcConfig::new(vec![4, 8, 8], vec![2, 2], 2, 4, 2, 5)
    }

    #[test]
    fn dortmund_ctc_frames_follow_widths() {
        let device = Default::default();
        let model = DortmundCtcConfig::new(10)
            .with_adaptive_pool_height(2)
            .with_lstm_hidden_size(8)
            .init::<TestBackend>(&device);

        let images = vec![
            Tensor::<TestBackend, 3>::random([1, 16, 40], Distribution::Default, &device),
            Tensor::<TestBackend, 3>::random([1, 16, 24], Distribution::Default, &device),
        ];
        let logits = model.forward_padded(PaddedImages::collate(images).unwrap());

        assert_eq!(logits.data.dims(), [2, 10, 10]);
        assert_eq!(logits.lengths, vec![10, 6]);
    }

    #[test]
    fn dortmund_ctc_blstm_input_size() {
        let device = Default::default();
        let model = DortmundCtcConfig::new(10)
            .with_adaptive_pool_height(3)
            .with_lstm_hidden_size(8)
            .init::<TestBackend>(&device);
        assert_eq!(model.head.blstm.layers.len(), 1);
        assert_eq!(model.head.linear.weight.val().dims(), [16, 10]);
    }

    #[test]
    fn vgg_ctc_shapes() {
        let device = Default::default();
        let model = small_vgg().init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 4>::random([3, 1, 16, 32], Distribution::Default, &device);
        let logits = model.forward(x);
        assert_eq!(logits.data.dims(), [3, 8, 5]);
        assert_eq!(logits.lengths, vec![8, 8, 8]);
    }

    #[test]
    fn vgg_ctc_accepts_images_narrower_than_pooling() {
        let device = Default::default();
        let model = small_vgg().init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 4>::ones([1, 1, 8, 3], &device);
        let logits = model.forward(x);
        assert_eq!(logits.data.dims(), [1, 1, 5]);
        assert_eq!(logits.lengths, vec![1]);

        let images = vec![
            Tensor::<TestBackend, 3>::ones([1, 8, 3], &device),
            Tensor::<TestBackend, 3>::ones([1, 8, 12], &device),
        ];
        let logits = model.forward_padded(PaddedImages::collate(images).unwrap());
        assert_eq!(logits.data.dims(), [2, 3, 5]);
        assert_eq!(logits.lengths, vec![1, 3]);
    }

    #[test]
    fn vgg_ctc_inference_is_deterministic() {
        let device = Default::default();
        let model = small_vgg().init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 4>::random([1, 1, 8, 16], Distribution::Default, &device);
        let a = model.forward(x.clone()).data;
        let b = model.forward(x).data;
        let diff: f32 = (a - b).abs().sum().into_scalar();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn dropout_is_active_when_training() {
        let device = Default::default();
        let model = small_vgg()
            .with_dropout(0.9)
            .init::<Autodiff<TestBackend>>(&device);
        let x = Tensor::<Autodiff<TestBackend>, 4>::ones([1, 1, 8, 64], &device);
        let a = model.forward(x.clone()).data;
        let b = model.forward(x).data;
        let diff: f32 = (a - b).abs().sum().into_scalar();
        assert!(diff > 0.0);
    }

    #[test]
    fn validation_catches_bad_heads() {
        assert!(small_vgg().validate().is_ok());
        assert!(DortmundCtcConfig::new(0).validate().is_err());
        assert!(DortmundCtcConfig::new(5).with_lstm_num_layers(0).validate().is_err());
        assert!(DortmundCtcConfig::new(5).with_dropout(1.0).validate().is_err());
        assert!(VggCtcConfig::new(vec![], vec![], 2, 4, 1, 5).validate().is_err());
    }
}
