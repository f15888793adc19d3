// store

mod relationship_store;

pub use relationship_store::*;
