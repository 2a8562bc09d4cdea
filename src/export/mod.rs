//! Export functionality: the canonical XML document.

pub mod document;
