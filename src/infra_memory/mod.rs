mod relationship_store_memory;

pub use relationship_store_memory::*;
