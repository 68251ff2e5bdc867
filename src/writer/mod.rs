//! PDF serialization.
//!
//! Writes a [`PdfDocument`](crate::document::PdfDocument) back to disk as
//! a complete (non-incremental) revision with a classic xref table.

mod object_serializer;
mod pdf_writer;

pub use object_serializer::ObjectSerializer;
pub use pdf_writer::save_document;
