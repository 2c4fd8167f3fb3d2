//! Cooperative cancellation for in-flight runs.

mod token;

pub use token::CancellationToken;
