pub mod cli;
pub mod compiler;
pub mod core;
pub mod error;
pub mod setup;
pub mod source;
pub mod types;
pub mod utils;
pub mod worker;

#[cfg(test)]
pub mod tests;

// Re-export commonly used items
pub use error::{VerifierError, VerifierResult};
