use crate::domain_model::{CallerContext, IdentifierError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("token invalid")]
    TokenInvalid,
    #[error("invalid identity: {0}")]
    InvalidIdentity(#[from] IdentifierError),
}

/// Raw identity material taken off an inbound request.
#[derive(Debug, Clone, Default)]
pub struct CallerCredentials {
    pub authorization: Option<String>,
    pub caller_id: Option<String>,
    pub caller_name: Option<String>,
}

/// Turns credentials vouched for by the external identity provider into a
/// [`CallerContext`]. Implementations never contact the provider themselves.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn resolve_caller(&self, credentials: CallerCredentials)
    -> Result<CallerContext, AuthError>;
}
