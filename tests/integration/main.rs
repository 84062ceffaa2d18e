//! Integration Tests
//!
//! Cross-crate tests through the `kifudb` re-exports:
//! - Lifecycle: post, read back, replace, delete
//! - Scale: records near the step limit, many records per owner

mod lifecycle;
mod scale;
