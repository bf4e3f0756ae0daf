//! # Siteinfo
//!
//! Heuristic extraction of business metadata from arbitrary websites.
//!
//! Given a URL, a search depth and an info request naming the wanted
//! fields, siteinfo crawls the site and returns:
//!
//! - **Identity**: the site's display name and logo/icon URLs
//! - **Contacts**: emails, phone numbers and postal addresses
//! - **Links**: every link, social-media profiles and guessed sub-pages
//!
//! Every field is best effort. A field that cannot be resolved comes back
//! empty and is listed in the response's `partial_failures`; it never fails
//! the request.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use siteinfo::prelude::*;
//!
//! let extractor = SiteInfoExtractor::http(ExtractorConfig::default())?;
//! let body = serde_json::json!({
//!     "web_url": "https://acme.com",
//!     "max_search_depth": 1,
//!     "info_request": {"name": true, "all_emails": true, "pages_url": ["about"]}
//! });
//! let response = extractor.extract_json(&body, None).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod extractors;
pub mod matching;
pub mod observability;
pub mod provider;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod response;
pub mod result;
pub mod testing;


pub use engine::SiteInfoExtractor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ExtractorConfig, VerificationConfig};
    pub use crate::engine::SiteInfoExtractor;
    pub use crate::errors::{
        ExtractionError, ProviderError, RequestValidationError, ResultShapeError, SiteInfoError,
        ValidationIssue, VerificationError,
    };
    pub use crate::provider::{
        CrawlConfig, CrawlingProvider, FetchConfig, FetchedPage, PageContentProvider,
        PageFetcher, RetryConfig, Tag, TagQuery,
    };
    #[cfg(feature = "http")]
    pub use crate::provider::HttpFetcher;
    pub use crate::registry::SocialPlatformRegistry;
    pub use crate::request::{
        ChoiceSet, ExtractionRequest, ExtractionTarget, FieldKey, FieldRequest, InfoRequestSpec,
    };
    #[cfg(feature = "http")]
    pub use crate::response::HttpEmailVerifier;
    pub use crate::response::{Credential, EmailVerifier, StructuredResponse};
    pub use crate::result::{FieldFailure, FieldValue, Leaf, RawResult};
}
