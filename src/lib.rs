pub mod engine;

#[doc(hidden)]
pub use tracing;
