// ============================================================
// Layer 5 — Convolutional Feature Extractors
// ============================================================
// Two VGG-style conv stacks:
//
//   DortmundConv — the fixed 13-layer stack of the Dortmund
//                  PHOCNet, 3x3 convs + ReLU, with ceil-mode
//                  2x2 max pooling after conv1_2 and conv2_2:
//
//                  conv1_1  1→64     conv1_2  64→64    pool
//                  conv2_1  64→128   conv2_2  128→128  pool
//                  conv3_1  128→256  conv3_2..3_6  256→256
//                  conv4_1  256→512  conv4_2..4_3  512→512
//
//   VggConv      — a configurable stack: one 3x3 conv + leaky ReLU
//                  per filter count, with optional k x k max pooling
//                  after each block except the last.
//
// Both track the real image sizes of padded batches through the
// pooling layers, which the recurrent head needs for its frame
// counts.

use anyhow::{ensure, Result};
use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Initializer, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{leaky_relu, relu},
};

use crate::ml::pooling::{ceil_half, ceil_max_pool2d, floor_max_pool2d, floor_pooled};
use crate::ml::sequence::PaddedImages;

/// Word images are single-channel (grayscale).
pub const INPUT_CHANNELS: usize = 1;

/// Channels produced by the last Dortmund conv layer.
pub const DORTMUND_OUTPUT_CHANNELS: usize = 512;

const DORTMUND_LAYOUT: [(usize, usize); 13] = [
    (1, 64),    (64, 64),
    (64, 128),  (128, 128),
    (128, 256), (256, 256), (256, 256), (256, 256), (256, 256), (256, 256),
    (256, 512), (512, 512), (512, 512),
];

/// Conv indices followed by a max pooling layer (conv1_2, conv2_2).
const DORTMUND_POOL_AFTER: [usize; 2] = [1, 3];

const LEAKY_RELU_SLOPE: f64 = 0.01;

/// Caffe's "msra" filler: N(0, sqrt(2 / fan_in)).
pub(crate) fn caffe_initializer(fan_in: usize) -> Initializer {
    Initializer::Normal { mean: 0.0, std: (2.0 / fan_in as f64).sqrt() }
}

/// 3x3 convolution with padding 1, optionally Caffe-initialised
/// (weights from `caffe_initializer`, zero bias).
pub(crate) fn conv3x3<B: Backend>(
    in_channels:  usize,
    out_channels: usize,
    caffe_init:   bool,
    device:       &B::Device,
) -> Conv2d<B> {
    let config = Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_padding(PaddingConfig2d::Same);
    if !caffe_init {
        return config.init(device);
    }
    let mut conv = config
        .with_initializer(caffe_initializer(in_channels * 3 * 3))
        .init(device);
    conv.bias = Some(Param::from_tensor(Tensor::zeros([out_channels], device)));
    conv
}

/// Caffe-initialised fully connected layer.
pub(crate) fn caffe_linear<B: Backend>(
    d_input:  usize,
    d_output: usize,
    device:   &B::Device,
) -> Linear<B> {
    let mut linear = LinearConfig::new(d_input, d_output)
        .with_initializer(caffe_initializer(d_input))
        .init(device);
    linear.bias = Some(Param::from_tensor(Tensor::zeros([d_output], device)));
    linear
}

// ─── DortmundConv ─────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct DortmundConvConfig {
    /// Use Caffe-style initialisation instead of burn's defaults
    #[config(default = false)]
    pub caffe_init: bool,
}

impl DortmundConvConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DortmundConv<B> {
        let convs = DORTMUND_LAYOUT
            .iter()
            .map(|&(i, o)| conv3x3(i, o, self.caffe_init, device))
            .collect();
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        DortmundConv { convs, pool }
    }
}

#[derive(Module, Debug)]
pub struct DortmundConv<B: Backend> {
    pub convs: Vec<Conv2d<B>>,
    pub pool:  MaxPool2d,
}

impl<B: Backend> DortmundConv<B> {
    /// images: [batch, 1, H, W] → [batch, 512, ceil(H/4), ceil(W/4)]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = images;
        for (i, conv) in self.convs.iter().enumerate() {
            x = relu(conv.forward(x));
            if DORTMUND_POOL_AFTER.contains(&i) {
                x = ceil_max_pool2d(x, &self.pool);
            }
        }
        x
    }

    /// Forward a padded batch, carrying the real sizes through the pooling.
    pub fn forward_padded(&self, images: PaddedImages<B>) -> PaddedImages<B> {
        let sizes = images.sizes.iter().map(|&s| Self::size_after_conv(s)).collect();
        PaddedImages { data: self.forward(images.data), sizes }
    }

    /// Image size after the two ceil-mode poolings.
    pub fn size_after_conv([h, w]: [usize; 2]) -> [usize; 2] {
        [ceil_half(ceil_half(h)), ceil_half(ceil_half(w))]
    }

    pub fn output_channels(&self) -> usize {
        DORTMUND_OUTPUT_CHANNELS
    }
}

// ─── VggConv ──────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct VggConvConfig {
    /// Output channels of each conv block
    pub num_filters: Vec<usize>,

    /// Max pooling size after each block (0 = no pooling).
    /// Entries past the second-to-last block are ignored.
    pub maxpool_sizes: Vec<usize>,
}

impl VggConvConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.num_filters.is_empty(), "The conv stack needs at least one layer");
        ensure!(
            self.num_filters.iter().all(|&n| n > 0),
            "Conv filter counts must be positive, got {:?}",
            self.num_filters
        );
        Ok(())
    }

    /// Pooling size applied after block `index`, if any.
    fn pool_size(&self, index: usize) -> Option<usize> {
        let is_last = index + 1 == self.num_filters.len();
        self.maxpool_sizes
            .get(index)
            .copied()
            .filter(|&k| k > 0 && !is_last)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> VggConv<B> {
        let mut in_channels = INPUT_CHANNELS;
        let mut blocks = Vec::with_capacity(self.num_filters.len());
        for (i, &out_channels) in self.num_filters.iter().enumerate() {
            let conv = conv3x3(in_channels, out_channels, false, device);
            let pool_size = self.pool_size(i).unwrap_or(0);
            let pool = self.pool_size(i).map(|k| {
                MaxPool2dConfig::new([k, k]).with_strides([k, k]).init()
            });
            blocks.push(VggBlock { conv, pool, pool_size });
            in_channels = out_channels;
        }
        VggConv { blocks, output_channels: in_channels }
    }
}

#[derive(Module, Debug)]
pub struct VggBlock<B: Backend> {
    pub conv:      Conv2d<B>,
    pub pool:      Option<MaxPool2d>,
    pub pool_size: usize,
}

#[derive(Module, Debug)]
pub struct VggConv<B: Backend> {
    pub blocks:          Vec<VggBlock<B>>,
    pub output_channels: usize,
}

impl<B: Backend> VggConv<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = images;
        for block in &self.blocks {
            x = leaky_relu(block.conv.forward(x), LEAKY_RELU_SLOPE);
            if let Some(pool) = &block.pool {
                x = floor_max_pool2d(x, pool, block.pool_size);
            }
        }
        x
    }

    pub fn forward_padded(&self, images: PaddedImages<B>) -> PaddedImages<B> {
        let sizes = images.sizes.iter().map(|&s| self.size_after_conv(s)).collect();
        PaddedImages { data: self.forward(images.data), sizes }
    }

    /// Image size after all pooling layers (floor division, at least 1).
    pub fn size_after_conv(&self, size: [usize; 2]) -> [usize; 2] {
        self.blocks
            .iter()
            .filter(|b| b.pool_size > 0)
            .fold(size, |[h, w], b| [floor_pooled(h, b.pool_size), floor_pooled(w, b.pool_size)])
    }

    pub fn output_channels(&self) -> usize {
        self.output_channels
    }
}
