mod friend;
mod relationship;
mod request;
mod user;

pub use friend::*;
pub use relationship::*;
pub use request::*;
pub use user::*;
