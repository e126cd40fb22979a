// ============================================================
// Layer 5 — Pooling Layers
// ============================================================
// Pooling operations that burn does not ship as modules:
//
//   ceil_max_pool2d            — 2x2 max pooling in "ceil mode"
//                                (odd trailing rows/columns are kept)
//   floor_max_pool2d           — k x k max pooling that never empties
//                                a dimension narrower than k
//   temporal_pyramid_max_pool  — TPP: max pooling over the full height
//                                and an increasing number of width bins,
//                                giving a fixed-size vector for any width
//   adaptive_avg_pool_height   — average pools every image to a fixed
//                                height and leaves the width alone
//
// The padded variants only look at the real region of each image,
// so padding never leaks into the pooled values.

use burn::{
    nn::pool::MaxPool2d,
    prelude::*,
    tensor::module::adaptive_avg_pool2d,
};

use crate::ml::sequence::{zero_pad_image, PaddedImages};

/// Output size of a stride-2 ceil-mode pooling: ceil(n / 2).
pub fn ceil_half(n: usize) -> usize {
    n.div_ceil(2)
}

/// Output size of a k x k / stride k pooling, never below one.
pub fn floor_pooled(n: usize, k: usize) -> usize {
    (n / k).max(1)
}

/// Number of bins in a temporal pyramid with `levels` levels: 1 + 2 + ... + L.
pub fn pyramid_bins(levels: usize) -> usize {
    levels * (levels + 1) / 2
}

/// 2x2 / stride 2 max pooling that keeps a trailing odd row or column.
///
/// `pool` must be a 2x2 kernel with stride 2.
pub fn ceil_max_pool2d<B: Backend>(x: Tensor<B, 4>, pool: &MaxPool2d) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    let device = x.device();

    let x = if w % 2 == 1 {
        let column = Tensor::full([n, c, h, 1], f32::NEG_INFINITY, &device);
        Tensor::cat(vec![x, column], 3)
    } else {
        x
    };
    let w = w + w % 2;
    let x = if h % 2 == 1 {
        let row = Tensor::full([n, c, 1, w], f32::NEG_INFINITY, &device);
        Tensor::cat(vec![x, row], 2)
    } else {
        x
    };

    pool.forward(x)
}

/// k x k / stride k max pooling that yields at least one row and column.
///
/// A map smaller than `k` along a dimension is padded with `-inf` up to `k`,
/// so that dimension pools to a single value over the real cells.
pub fn floor_max_pool2d<B: Backend>(x: Tensor<B, 4>, pool: &MaxPool2d, k: usize) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    let device = x.device();

    let x = if w < k {
        let columns = Tensor::full([n, c, h, k - w], f32::NEG_INFINITY, &device);
        Tensor::cat(vec![x, columns], 3)
    } else {
        x
    };
    let w = w.max(k);
    let x = if h < k {
        let rows = Tensor::full([n, c, k - h, w], f32::NEG_INFINITY, &device);
        Tensor::cat(vec![x, rows], 2)
    } else {
        x
    };

    pool.forward(x)
}

/// Bounds of bin `index` when `width` columns are split into `bins` bins.
/// Bins may overlap but are never empty.
fn adaptive_bin(index: usize, bins: usize, width: usize) -> (usize, usize) {
    let start = index * width / bins;
    let end   = ((index + 1) * width).div_ceil(bins);
    (start, end)
}

/// Temporal pyramid max pooling: [N, C, H, W] → [N, C * L(L+1)/2].
///
/// Level l splits the width into l bins; each bin is max-pooled over
/// the full height. Output is ordered by level, then channel, then bin.
pub fn temporal_pyramid_max_pool<B: Backend>(x: Tensor<B, 4>, levels: usize) -> Tensor<B, 2> {
    let [n, c, h, w] = x.dims();

    let pooled: Vec<Tensor<B, 2>> = (1..=levels)
        .map(|level| {
            let bins: Vec<Tensor<B, 3>> = (0..level)
                .map(|bin| {
                    let (start, end) = adaptive_bin(bin, level, w);
                    x.clone()
                        .slice([0..n, 0..c, 0..h, start..end])
                        .reshape([n, c, h * (end - start)])
                        .max_dim(2)
                })
                .collect();
            Tensor::cat(bins, 2).reshape([n, c * level])
        })
        .collect();

    Tensor::cat(pooled, 1)
}

/// Temporal pyramid max pooling over the real region of each image.
pub fn temporal_pyramid_max_pool_padded<B: Backend>(
    images: &PaddedImages<B>,
    levels: usize,
) -> Tensor<B, 2> {
    if images.is_uniform() {
        return temporal_pyramid_max_pool(images.data.clone(), levels);
    }
    let rows: Vec<Tensor<B, 2>> = (0..images.batch_size())
        .map(|i| temporal_pyramid_max_pool(images.sample(i), levels))
        .collect();
    Tensor::cat(rows, 0)
}

/// Average pool every image to `height` rows, keeping its width.
///
/// Each sample's real region is pooled to (height, w_i) and re-padded
/// with zeros to the batch width.
pub fn adaptive_avg_pool_height<B: Backend>(
    images: PaddedImages<B>,
    height: usize,
) -> PaddedImages<B> {
    let [_, _, _, width] = images.data.dims();

    let sizes: Vec<[usize; 2]> = images.sizes.iter().map(|&[_, w]| [height, w]).collect();

    let data = if images.is_uniform() {
        adaptive_avg_pool2d(images.data, [height, width])
    } else {
        let rows: Vec<Tensor<B, 4>> = images
            .sizes
            .iter()
            .enumerate()
            .map(|(i, &[_, w])| {
                let pooled = adaptive_avg_pool2d(images.sample(i), [height, w]);
                zero_pad_image(pooled, height, width)
            })
            .collect();
        Tensor::cat(rows, 0)
    };

    PaddedImages { data, sizes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::pool::MaxPool2dConfig;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    fn tensor4(values: Vec<f32>, shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    #[test]
    fn size_helpers() {
        assert_eq!(ceil_half(1), 1);
        assert_eq!(ceil_half(7), 4);
        assert_eq!(ceil_half(8), 4);
        assert_eq!(floor_pooled(7, 2), 3);
        assert_eq!(floor_pooled(1, 3), 1);
        assert_eq!(pyramid_bins(5), 15);
    }

    #[test]
    fn adaptive_bins_cover_width() {
        assert_eq!(adaptive_bin(0, 2, 5), (0, 3));
        assert_eq!(adaptive_bin(1, 2, 5), (2, 5));
        // More bins than columns still yields non-empty bins
        for i in 0..5 {
            let (s, e) = adaptive_bin(i, 5, 2);
            assert!(e > s);
        }
    }

    #[test]
    fn ceil_pool_keeps_odd_edges() {
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        // 3x3 image, values 1..9; the last row/column are pooled alone
        let x = tensor4((1..=9).map(|v| v as f32).collect(), [1, 1, 3, 3]);
        let y = ceil_max_pool2d(x, &pool);
        assert_eq!(y.dims(), [1, 1, 2, 2]);
        let values = y.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![5.0, 6.0, 8.0, 9.0]);
    }

    #[test]
    fn floor_pool_pads_maps_smaller_than_kernel() {
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        // 3 rows, 1 column: width pads to 2, height floors to 1
        let x = tensor4(vec![-4.0, -2.0, 7.0], [1, 1, 3, 1]);
        let y = floor_max_pool2d(x, &pool, 2);
        assert_eq!(y.dims(), [1, 1, floor_pooled(3, 2), floor_pooled(1, 2)]);
        let values = y.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![-2.0]);

        // Large enough maps pool as usual
        let x = tensor4((1..=8).map(|v| v as f32).collect(), [1, 1, 2, 4]);
        let values = floor_max_pool2d(x, &pool, 2).into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![6.0, 8.0]);
    }

    #[test]
    fn tpp_matches_manual_bins() {
        // 1 channel, 1 row, 5 columns
        let x = tensor4(vec![3.0, 1.0, 4.0, 1.0, 5.0], [1, 1, 1, 5]);
        let y = temporal_pyramid_max_pool(x, 2);
        assert_eq!(y.dims(), [1, 3]);
        let values = y.into_data().to_vec::<f32>().unwrap();
        // level 1: max(all) | level 2: max(0..3), max(2..5)
        assert_eq!(values, vec![5.0, 4.0, 5.0]);
    }

    #[test]
    fn tpp_padded_ignores_padding() {
        // Second image is 1x2 padded to 1x3 with a large padding value
        let data = tensor4(vec![1.0, 2.0, 3.0, 1.0, 2.0, 100.0], [2, 1, 1, 3]);
        let images = PaddedImages::new(data, vec![[1, 3], [1, 2]]).unwrap();
        let y = temporal_pyramid_max_pool_padded(&images, 1);
        let values = y.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![3.0, 2.0]);
    }

    #[test]
    fn adaptive_height_pooling_keeps_widths() {
        let data = Tensor::<TestBackend, 4>::ones([2, 3, 8, 10], &Default::default());
        let images = PaddedImages::new(data, vec![[8, 10], [6, 4]]).unwrap();
        let pooled = adaptive_avg_pool_height(images, 2);

        assert_eq!(pooled.data.dims(), [2, 3, 2, 10]);
        assert_eq!(pooled.sizes, vec![[2, 10], [2, 4]]);

        // Padding columns of the second image are zero again
        let total: f32 = pooled.data.sum().into_scalar();
        assert_eq!(total, (3 * 2 * 10 + 3 * 2 * 4) as f32);
    }
}
