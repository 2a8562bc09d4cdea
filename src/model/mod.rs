//! Core data model types: messages, addresses, dates and the MIME part tree.

pub mod address;
pub mod date;
pub mod message;
pub mod part;
