//! Core types and errors for authscope.
//!
//! This crate provides the foundational types shared by the engine and the CLI:
//!
//! - **Types**: the discovery data model ([`AuthorizationPoint`],
//!   [`AuthorizationEvent`], [`InteractionRecord`], [`RunState`]) and the
//!   report aggregate handed to the presentation layer
//! - **Errors**: a single error enum, [`AuthScopeError`]
//!
//! # Example
//!
//! ```rust
//! use authscope_core::{AuthType, AuthorizationPoint};
//!
//! let point = AuthorizationPoint::new(
//!     "security",
//!     "FileVault",
//!     "Privacy & Security > FileVault",
//!     AuthType::Admin,
//!     "Full disk encryption requires authentication",
//!     "filevault",
//! );
//! assert!(point.requires_auth);
//! ```

#![doc(html_root_url = "https://docs.rs/authscope-core/0.3.0")]

mod error;
pub mod types;

pub use error::{AuthScopeError, Result};
pub use types::*;
