//! Output abstraction layer that routes to plain, colored or JSON output.

pub mod context;

pub use context::{OutputContext, OutputMode};
