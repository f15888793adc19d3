mod relationship_store_fs;

pub use relationship_store_fs::*;
