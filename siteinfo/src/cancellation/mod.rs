//! Request-scoped cancellation.
//!
//! One [`CancellationToken`] is created per extraction and shared by every
//! concurrent sub-lookup the request fans out to.

mod token;

pub use token::CancellationToken;
