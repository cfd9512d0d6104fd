//! # TaskDesk Shared Library
//!
//! This crate contains the domain types shared by the TaskDesk client library
//! and the command-line front end.
//!
//! ## Module Organization
//!
//! - `models`: Users, tasks, comments, attachments and tenants as the API
//!   returns them, plus the payloads used to create and update them

pub mod models;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
