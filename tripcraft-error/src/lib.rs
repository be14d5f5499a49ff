//! # tripcraft-error
//!
//! Unified error handling for tripcraft, in the style of OpenDAL's error handling.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., MissingInput, GeocodeNotFound)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use tripcraft_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::MissingInput, "missing input 'city_name'")
//!         .with_operation("catalog::render")
//!         .with_context("task", "search_places")
//!         .with_context("input", "city_name"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, tripcraft_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using tripcraft Error
pub type Result<T> = std::result::Result<T, Error>;
