//! `mailsift` — tolerant email ingestion.
//!
//! This crate parses single messages, MBOX archives and Apple Mail EMLX
//! files into normalized header fields and a MIME part forest, and renders
//! each message as a canonical XML document.
//!
//! Parsing never panics on bad input: every import yields a
//! [`model::message::Message`], whose diagnostic tells whether it is complete.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod store;

pub use model::message::Message;
pub use parser::eml::{import_single, parse_text};
pub use parser::emlx::import_per_message_file_archive;
pub use parser::mbox::import_mailbox_archive;
