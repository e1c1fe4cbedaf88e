pub mod chunk_source;
