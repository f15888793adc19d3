use crate::application_port::*;
use crate::domain_model::CallerContext;

/// Trusts the identity headers set by the upstream gateway that already
/// authenticated the session. Must never be exposed without that gateway in
/// front of it.
#[derive(Debug, Default)]
pub struct GatewayAuthService;

impl GatewayAuthService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl AuthService for GatewayAuthService {
    async fn resolve_caller(
        &self,
        credentials: CallerCredentials,
    ) -> Result<CallerContext, AuthError> {
        let (Some(user_id), Some(display_name)) = (credentials.caller_id, credentials.caller_name)
        else {
            return Err(AuthError::MissingCredentials);
        };
        Ok(CallerContext::new(user_id.parse()?, display_name.parse()?))
    }
}
