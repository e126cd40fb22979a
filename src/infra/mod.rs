// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Filesystem concerns shared by the use cases:
//
//   checkpoint.rs — rotating weight checkpoints (burn binary
//                   records) and the architecture config JSON
//                   that lets a checkpoint be rebuilt.

/// Checkpoint rotation and architecture config persistence
pub mod checkpoint;
