// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn model code lives here. Layers come from burn
// (Conv2d, MaxPool2d, BiLstm, Linear, Dropout); this layer
// composes them into the recognition models and adds the
// padding-aware glue burn does not provide.
//
//   sequence.rs   — padded image batches, sequence batches,
//                   image → sequence collapse
//   pooling.rs    — ceil-mode max pooling, temporal pyramid
//                   pooling, height-adaptive average pooling
//   conv.rs       — Dortmund and configurable VGG conv stacks
//   blstm.rs      — stacked bidirectional LSTM over
//                   variable-length sequences
//   phocnet.rs    — conv + TPP + fully connected PHOC head
//   ctc_model.rs  — conv + BLSTM + linear CTC models
//   decoder.rs    — greedy CTC decoding

/// Padded images and variable-length sequence batches
pub mod sequence;

/// Pooling layers missing from burn
pub mod pooling;

/// Convolutional feature extractors
pub mod conv;

/// Stacked BiLSTM with per-sample lengths
pub mod blstm;

/// PHOCNet word embedding model
pub mod phocnet;

/// CTC recognition models
pub mod ctc_model;

/// Best-path CTC decoding
pub mod decoder;
