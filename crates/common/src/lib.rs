//! Plumbing shared by the registry crates and the CLI: logging setup and bounded fan-out of
//! network reads.

pub mod fanout;
pub mod logging;
