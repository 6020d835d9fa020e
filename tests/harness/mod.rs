//! In-memory registry chain for end-to-end history tests.

pub mod chain;

pub use chain::{history_over, record, FakeChain};
