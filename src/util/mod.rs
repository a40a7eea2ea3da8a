//! Utility functions shared by configuration and crawling.
//!
//! - **URL validation**: feed URIs must be absolute http(s) URLs with a host

mod url_validator;

pub use url_validator::{validate_url, UrlValidationError};
