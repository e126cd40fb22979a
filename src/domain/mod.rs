// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types for the text side of word recognition.
// Nothing here depends on burn.
//
//   symbols.rs — CTC symbols table (id ↔ character)
//   phoc.rs    — pyramidal histogram of characters, the target
//                representation of PHOCNet

/// CTC symbols table
pub mod symbols;

/// PHOC word representation
pub mod phoc;
