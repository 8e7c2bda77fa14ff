pub mod document_helpers;
pub mod hydrate;
pub mod resolve;
