// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for each CLI command:
//
//   architecture.rs  — the serialisable model family config
//   init_use_case    — build a model and save a checkpoint
//   probe_use_case   — reload a checkpoint and run images
//
// No printing happens here; results are returned to Layer 1.

/// Model family configuration (persisted as model.json)
pub mod architecture;

/// Build a model and write its checkpoint
pub mod init_use_case;

/// Reload a checkpoint and run it on probe images
pub mod probe_use_case;

/// Backend used by the command line tool
pub type CliBackend = burn::backend::Wgpu;
