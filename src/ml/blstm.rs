// ============================================================
// Layer 5 — Stacked Bidirectional LSTM
// ============================================================
// A stack of burn BiLstm layers with dropout between layers
// (never after the last one).
//
// Sequences in a batch have different lengths. The backward
// direction must start at each sample's last real frame, not at
// the padding, so samples are grouped by length and every group
// runs over exactly its own frames. Output frames past a sample's
// length are zero.

use std::collections::BTreeMap;

use burn::{
    nn::{
        lstm::{BiLstm, BiLstmConfig},
        Dropout, DropoutConfig,
    },
    prelude::*,
    tensor::TensorData,
};

use crate::ml::sequence::{zero_pad_time, SequenceBatch};

#[derive(Config, Debug)]
pub struct BlstmConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
    #[config(default = 1)]
    pub num_layers:  usize,
    /// Dropout applied between stacked layers
    #[config(default = 0.5)]
    pub dropout:     f64,
}

impl BlstmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Blstm<B> {
        let layers = (0..self.num_layers)
            .map(|i| {
                let d_input = if i == 0 { self.input_size } else { 2 * self.hidden_size };
                BiLstmConfig::new(d_input, self.hidden_size, true).init(device)
            })
            .collect();
        Blstm {
            layers,
            dropout:     DropoutConfig::new(self.dropout).init(),
            hidden_size: self.hidden_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct Blstm<B: Backend> {
    pub layers:      Vec<BiLstm<B>>,
    pub dropout:     Dropout,
    pub hidden_size: usize,
}

impl<B: Backend> Blstm<B> {
    /// [batch, T, input_size] → [batch, T, 2 * hidden_size], lengths unchanged
    pub fn forward(&self, input: SequenceBatch<B>) -> SequenceBatch<B> {
        let SequenceBatch { mut data, lengths } = input;
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                data = self.dropout.forward(data);
            }
            data = forward_packed(layer, data, &lengths);
        }
        SequenceBatch { data, lengths }
    }

    pub fn output_size(&self) -> usize {
        2 * self.hidden_size
    }
}

/// Run one BiLstm over the first `lengths[i]` frames of every sample.
fn forward_packed<B: Backend>(
    layer:   &BiLstm<B>,
    data:    Tensor<B, 3>,
    lengths: &[usize],
) -> Tensor<B, 3> {
    let [batch, max_len, features] = data.dims();
    if lengths.iter().all(|&len| len == max_len) {
        let (output, _) = layer.forward(data, None);
        return output;
    }

    let device = data.device();
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (sample, &len) in lengths.iter().enumerate() {
        groups.entry(len).or_default().push(sample);
    }

    let mut rows: Vec<Option<Tensor<B, 3>>> = vec![None; batch];
    for (len, samples) in groups {
        let indices: Vec<i64> = samples.iter().map(|&s| s as i64).collect();
        let indices = Tensor::<B, 1, Int>::from_data(
            TensorData::new(indices, [samples.len()]),
            &device,
        );
        let group = data
            .clone()
            .select(0, indices)
            .slice([0..samples.len(), 0..len, 0..features]);

        let (output, _) = layer.forward(group, None);
        let output = zero_pad_time(output, max_len);
        let out_features = output.dims()[2];

        for (row, &sample) in samples.iter().enumerate() {
            rows[sample] = Some(
                output
                    .clone()
                    .slice([row..row + 1, 0..max_len, 0..out_features]),
            );
        }
    }

    tracing::trace!("BLSTM ran {} samples over variable lengths", batch);
    Tensor::cat(rows.into_iter().flatten().collect(), 0)
}
