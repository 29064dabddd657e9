pub mod ooxml;

pub use ooxml::{zip_parts, OoxmlPackage, COMMENTS_PART, DOCUMENT_PART};
