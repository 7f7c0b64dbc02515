//! Cross-crate integration tests for roomprobe.

mod ping;
mod signal;
