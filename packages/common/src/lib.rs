//! # Tessera Common
//!
//! Shared data model for the section builder.
//!
//! A page is composed of ordered **sections**: raw HTML/CSS/JS blocks or
//! shortcode blocks. This crate owns the `Section` entity and its
//! validation rules; every other crate in the workspace speaks in these
//! types.

pub mod error;
pub mod section;

pub use error::*;
pub use section::*;
