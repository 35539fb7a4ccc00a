pub mod layout;
pub mod metadata;
pub mod segment;
pub mod file;
pub mod archive;
