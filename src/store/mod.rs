//! Line-addressable text buffers that all parsers read from.

pub mod lines;
