pub mod splitter;

pub use splitter::Chunker;
