//! Response structuring and email verification.

mod structurer;
mod verification;

pub use structurer::{ResponseStructurer, StructuredResponse};
#[cfg(feature = "http")]
pub use verification::HttpEmailVerifier;
#[cfg(test)]
pub use verification::MockEmailVerifier;
pub use verification::{is_email, partition_emails, Credential, EmailPartition, EmailVerifier};
