use crate::application_port::*;
use crate::domain_model::CallerContext;

const FAKE_TOKEN_PREFIX: &str = "fake-access-token:";

#[derive(Debug, Default)]
pub struct FakeAuthService;

impl FakeAuthService {
    pub fn new() -> Self {
        Self
    }

    pub fn token_for(caller: &CallerContext) -> String {
        format!(
            "{FAKE_TOKEN_PREFIX}{}:{}",
            caller.user_id, caller.display_name
        )
    }
}

// Development only: the bearer token spells out the identity it grants,
// `fake-access-token:<user id>:<display name>`.
#[async_trait::async_trait]
impl AuthService for FakeAuthService {
    async fn resolve_caller(
        &self,
        credentials: CallerCredentials,
    ) -> Result<CallerContext, AuthError> {
        let header = credentials
            .authorization
            .ok_or(AuthError::MissingCredentials)?;
        let token = header
            .strip_prefix("Bearer ")
            .and_then(|t| t.strip_prefix(FAKE_TOKEN_PREFIX))
            .ok_or(AuthError::TokenInvalid)?;
        let (user_id, display_name) = token.split_once(':').ok_or(AuthError::TokenInvalid)?;

        Ok(CallerContext::new(user_id.parse()?, display_name.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bearer(value: &str) -> CallerCredentials {
        CallerCredentials {
            authorization: Some(value.to_owned()),
            ..CallerCredentials::default()
        }
    }

    #[tokio::test]
    async fn token_round_trips_identity() {
        let caller = CallerContext::new("42".parse().unwrap(), "Cayde:6".parse().unwrap());
        let token = FakeAuthService::token_for(&caller);
        let resolved = FakeAuthService::new()
            .resolve_caller(bearer(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(resolved, caller);
    }

    #[tokio::test]
    async fn rejects_missing_and_foreign_tokens() {
        let service = FakeAuthService::new();
        assert!(matches!(
            service.resolve_caller(CallerCredentials::default()).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            service.resolve_caller(bearer("Bearer abc.def.ghi")).await,
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            service
                .resolve_caller(bearer("Bearer fake-access-token:a b:name"))
                .await,
            Err(AuthError::InvalidIdentity(_))
        ));
    }
}
