mod error;
mod handler;
mod router;

pub use error::{ApiErrorCode, recover_error};
pub use router::{CALLER_ID_HEADER, CALLER_NAME_HEADER, routes};
