mod auth_service_fake;
mod auth_service_gateway;
mod relationship_engine;
mod relationship_service_impl;

pub use auth_service_fake::*;
pub use auth_service_gateway::*;
pub use relationship_service_impl::*;
