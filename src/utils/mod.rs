//! Text utilities used by the synthesis and alignment paths.

pub mod chunker;
pub mod srt;

pub use chunker::{SimpleTextChunker, TextChunker};
