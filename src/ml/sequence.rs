// ============================================================
// Layer 5 — Padded Images and Sequence Batches
// ============================================================
// Word images in a batch have different sizes. They are stored
// zero-padded to the largest height/width, together with the
// real (height, width) of every sample:
//
//   PaddedImages   data  [N, C, H, W]   sizes  [(h_i, w_i); N]
//
// After the conv stack each image column becomes one frame of a
// sequence, so the recurrent layers see:
//
//   SequenceBatch  data  [N, T, F]      lengths  [t_i; N]
//
// SequenceBatch plays the role of a packed sequence: the BLSTM
// only reads the first t_i frames of sample i, and per-frame
// layers (dropout, linear) are applied through `map`, which
// keeps the lengths attached to the data.

use anyhow::{ensure, Result};
use burn::prelude::*;

/// A batch of zero-padded images with their real sizes.
#[derive(Debug, Clone)]
pub struct PaddedImages<B: Backend> {
    /// Image data — shape: [batch, channels, height, width]
    pub data: Tensor<B, 4>,

    /// Real (height, width) of each sample, in batch order
    pub sizes: Vec<[usize; 2]>,
}

impl<B: Backend> PaddedImages<B> {
    /// Wrap padded data and its per-sample sizes.
    /// Every size must be non-zero and fit inside the tensor.
    pub fn new(data: Tensor<B, 4>, sizes: Vec<[usize; 2]>) -> Result<Self> {
        let [batch, _, height, width] = data.dims();
        ensure!(
            sizes.len() == batch,
            "Got {} sizes for a batch of {} images",
            sizes.len(),
            batch
        );
        for (i, &[h, w]) in sizes.iter().enumerate() {
            ensure!(
                h > 0 && w > 0 && h <= height && w <= width,
                "Image {i} has size {h}x{w}, outside the padded {height}x{width} batch"
            );
        }
        Ok(Self { data, sizes })
    }

    /// A batch where every image uses the full tensor size.
    pub fn uniform(data: Tensor<B, 4>) -> Self {
        let [batch, _, height, width] = data.dims();
        Self { data, sizes: vec![[height, width]; batch] }
    }

    /// Stack `[channels, h, w]` images into one zero-padded batch.
    pub fn collate(images: Vec<Tensor<B, 3>>) -> Result<Self> {
        ensure!(!images.is_empty(), "Cannot collate an empty list of images");

        let channels = images[0].dims()[0];
        let sizes: Vec<[usize; 2]> = images
            .iter()
            .map(|img| {
                let [_, h, w] = img.dims();
                [h, w]
            })
            .collect();
        ensure!(
            images.iter().all(|img| img.dims()[0] == channels),
            "All images in a batch must have the same number of channels"
        );

        let height = sizes.iter().map(|s| s[0]).max().unwrap_or(0);
        let width  = sizes.iter().map(|s| s[1]).max().unwrap_or(0);

        let padded: Vec<Tensor<B, 4>> = images
            .into_iter()
            .map(|img| zero_pad_image(img.unsqueeze::<4>(), height, width))
            .collect();

        Self::new(Tensor::cat(padded, 0), sizes)
    }

    pub fn batch_size(&self) -> usize {
        self.sizes.len()
    }

    /// True when no sample carries any padding.
    pub fn is_uniform(&self) -> bool {
        let [_, _, height, width] = self.data.dims();
        self.sizes.iter().all(|&[h, w]| h == height && w == width)
    }

    /// The un-padded region of sample `index` — shape: [1, C, h_i, w_i]
    pub fn sample(&self, index: usize) -> Tensor<B, 4> {
        let [_, channels, _, _] = self.data.dims();
        let [h, w] = self.sizes[index];
        self.data
            .clone()
            .slice([index..index + 1, 0..channels, 0..h, 0..w])
    }
}

/// A batch-first batch of variable-length sequences.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Frame features — shape: [batch, max_len, features]
    pub data: Tensor<B, 3>,

    /// Number of valid frames per sample
    pub lengths: Vec<usize>,
}

impl<B: Backend> SequenceBatch<B> {
    pub fn new(data: Tensor<B, 3>, lengths: Vec<usize>) -> Result<Self> {
        let [batch, max_len, _] = data.dims();
        ensure!(
            lengths.len() == batch,
            "Got {} lengths for a batch of {} sequences",
            lengths.len(),
            batch
        );
        ensure!(
            lengths.iter().all(|&l| l > 0 && l <= max_len),
            "Sequence lengths must be in 1..={max_len}, got {lengths:?}"
        );
        Ok(Self { data, lengths })
    }

    /// A batch where every sequence uses all frames.
    pub fn full(data: Tensor<B, 3>) -> Self {
        let [batch, max_len, _] = data.dims();
        Self { data, lengths: vec![max_len; batch] }
    }

    /// Apply a frame-wise transformation, keeping the lengths.
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(Tensor<B, 3>) -> Tensor<B, 3>,
    {
        Self { data: f(self.data), lengths: self.lengths }
    }

    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }

    pub fn max_len(&self) -> usize {
        self.data.dims()[1]
    }

    pub fn feature_size(&self) -> usize {
        self.data.dims()[2]
    }

    /// The valid frames of sample `index` — shape: [len_i, features]
    pub fn frames(&self, index: usize) -> Tensor<B, 2> {
        let len      = self.lengths[index];
        let features = self.feature_size();
        self.data
            .clone()
            .slice([index..index + 1, 0..len, 0..features])
            .reshape([len, features])
    }
}

/// Collapse image columns into frames: [N, C, H, W] → [N, W, C*H].
///
/// Each frame holds the channel-major, then row-major, values of one
/// column. Sequence lengths are the real image widths.
pub fn image_to_sequence<B: Backend>(images: PaddedImages<B>) -> SequenceBatch<B> {
    let [batch, channels, height, width] = images.data.dims();
    let data = images
        .data
        .permute([0, 3, 1, 2])
        .reshape([batch, width, channels * height]);
    let lengths = images.sizes.iter().map(|&[_, w]| w).collect();
    SequenceBatch { data, lengths }
}

/// Zero-pad a [N, C, h, w] tensor at the bottom/right to [N, C, height, width].
pub(crate) fn zero_pad_image<B: Backend>(
    x:      Tensor<B, 4>,
    height: usize,
    width:  usize,
) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    let device = x.device();
    let x = if w < width {
        Tensor::cat(vec![x, Tensor::zeros([n, c, h, width - w], &device)], 3)
    } else {
        x
    };
    if h < height {
        Tensor::cat(vec![x, Tensor::zeros([n, c, height - h, width], &device)], 2)
    } else {
        x
    }
}

/// Zero-pad a [N, t, F] tensor along time to [N, max_len, F].
pub(crate) fn zero_pad_time<B: Backend>(x: Tensor<B, 3>, max_len: usize) -> Tensor<B, 3> {
    let [n, t, f] = x.dims();
    if t >= max_len {
        return x;
    }
    let padding = Tensor::zeros([n, max_len - t, f], &x.device());
    Tensor::cat(vec![x, padding], 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    fn device() -> <TestBackend as Backend>::Device {
        Default::default()
    }

    #[test]
    fn collate_pads_to_largest_image() {
        let device = device();
        let a = Tensor::<TestBackend, 3>::ones([1, 4, 6], &device);
        let b = Tensor::<TestBackend, 3>::ones([1, 5, 3], &device);

        let batch = PaddedImages::collate(vec![a, b]).unwrap();
        assert_eq!(batch.data.dims(), [2, 1, 5, 6]);
        assert_eq!(batch.sizes, vec![[4, 6], [5, 3]]);
        assert!(!batch.is_uniform());

        // Only the real pixels are ones, padding is zero
        let total: f32 = batch.data.clone().sum().into_scalar();
        assert_eq!(total, (4 * 6 + 5 * 3) as f32);
        assert_eq!(batch.sample(1).dims(), [1, 1, 5, 3]);
    }

    #[test]
    fn collate_rejects_mixed_channels() {
        let device = device();
        let a = Tensor::<TestBackend, 3>::ones([1, 4, 6], &device);
        let b = Tensor::<TestBackend, 3>::ones([3, 4, 6], &device);
        assert!(PaddedImages::collate(vec![a, b]).is_err());
        assert!(PaddedImages::<TestBackend>::collate(Vec::new()).is_err());
    }

    #[test]
    fn new_rejects_sizes_outside_tensor() {
        let data = Tensor::<TestBackend, 4>::zeros([2, 1, 4, 4], &device());
        assert!(PaddedImages::new(data.clone(), vec![[4, 4]]).is_err());
        assert!(PaddedImages::new(data.clone(), vec![[4, 4], [5, 1]]).is_err());
        assert!(PaddedImages::new(data.clone(), vec![[4, 4], [0, 1]]).is_err());
        assert!(PaddedImages::new(data, vec![[4, 4], [2, 3]]).is_ok());
    }

    #[test]
    fn image_to_sequence_orders_channel_then_row() {
        // One image, 2 channels, 2 rows, 3 columns, values 0..12
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let data = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(values, [1, 2, 2, 3]),
            &device(),
        );
        let images = PaddedImages::new(data, vec![[2, 2]]).unwrap();

        let seq = image_to_sequence(images);
        assert_eq!(seq.data.dims(), [1, 3, 4]);
        assert_eq!(seq.lengths, vec![2]);

        // Column 1: channel 0 rows (1, 4), channel 1 rows (7, 10)
        let frames = seq.frames(0).into_data().to_vec::<f32>().unwrap();
        assert_eq!(&frames[4..8], &[1.0, 4.0, 7.0, 10.0]);
        assert_eq!(frames.len(), 8);
    }

    #[test]
    fn map_keeps_lengths() {
        let data = Tensor::<TestBackend, 3>::ones([2, 5, 3], &device());
        let seq = SequenceBatch::new(data, vec![5, 2]).unwrap();
        let seq = seq.map(|x| x * 2.0);
        assert_eq!(seq.lengths, vec![5, 2]);
        assert_eq!(seq.frames(1).dims(), [2, 3]);
    }

    #[test]
    fn sequence_lengths_are_validated() {
        let data = Tensor::<TestBackend, 3>::ones([2, 5, 3], &device());
        assert!(SequenceBatch::new(data.clone(), vec![6, 1]).is_err());
        assert!(SequenceBatch::new(data.clone(), vec![0, 1]).is_err());
        assert!(SequenceBatch::new(data, vec![5]).is_err());
    }

    #[test]
    fn zero_pad_time_extends_with_zeros() {
        let x = Tensor::<TestBackend, 3>::ones([1, 2, 3], &device());
        let padded = zero_pad_time(x, 4);
        assert_eq!(padded.dims(), [1, 4, 3]);
        let total: f32 = padded.sum().into_scalar();
        assert_eq!(total, 6.0);
    }
}
