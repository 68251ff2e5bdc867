//! Conformance validators.
//!
//! Each validator exposes a `validate`-style function returning issues;
//! the unified analyze entry point composes them by call. There is no
//! validator base trait on purpose.

pub mod contrast;
pub mod fonts;
pub mod matterhorn;
pub mod pdfa;
pub mod wcag;

pub use matterhorn::{validate_matterhorn, MatterhornValidator, CHECKPOINTS};
pub use pdfa::{validate_pdfa, PdfaValidationResult};
pub use wcag::WcagValidator;
