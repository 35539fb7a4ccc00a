pub mod encoding;
pub mod dictionary;
pub mod segment_index;
