use super::error::*;
use super::handler;
use crate::application_port::{AuthService, CallerCredentials};
use crate::domain_model::CallerContext;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use warp::{Filter, http, reject};

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_NAME_HEADER: &str = "x-caller-name";

const MAX_BODY_BYTES: u64 = 64 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let relationships = warp::path("relationships")
        .and(warp::get())
        .and(warp::path::end())
        .and(with_caller(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and(with_timeout(server.request_timeout))
        .and_then(handler::list_relationships);

    let send_request = warp::path("friend_requests")
        .and(warp::post())
        .and(warp::path::end())
        .and(json_body::<handler::SendRequestBody>())
        .and(with_caller(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and(with_timeout(server.request_timeout))
        .and_then(handler::send_request);

    let respond = warp::path("friend_requests")
        .and(warp::path("respond"))
        .and(warp::post())
        .and(warp::path::end())
        .and(json_body::<handler::RespondBody>())
        .and(with_caller(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and(with_timeout(server.request_timeout))
        .and_then(handler::respond_to_request);

    let remove_friend = warp::path("remove_friend")
        .and(warp::post())
        .and(warp::path::end())
        .and(json_body::<handler::RemoveFriendBody>())
        .and(with_caller(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and(with_timeout(server.request_timeout))
        .and_then(handler::remove_friend);

    let candidates = warp::path("candidates")
        .and(warp::post())
        .and(warp::path::end())
        .and(json_body::<handler::CandidatesBody>())
        .and(with_caller(server.auth_service.clone()))
        .and(with(server.relationship_service.clone()))
        .and(with_timeout(server.request_timeout))
        .and_then(handler::lookup_candidates);

    relationships
        .or(send_request)
        .or(respond)
        .or(remove_friend)
        .or(candidates)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_timeout(timeout: Duration) -> impl Filter<Extract = (Duration,), Error = Infallible> + Clone {
    warp::any().map(move || timeout)
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn with_caller(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (CallerContext,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str())
        .and(warp::header::optional::<String>(CALLER_ID_HEADER))
        .and(warp::header::optional::<String>(CALLER_NAME_HEADER))
        .and_then(
            move |authorization: Option<String>,
                  caller_id: Option<String>,
                  caller_name: Option<String>| {
                let auth_service = auth_service.clone();
                async move {
                    let credentials = CallerCredentials {
                        authorization,
                        caller_id,
                        caller_name,
                    };
                    auth_service
                        .resolve_caller(credentials)
                        .await
                        .map_err(ApiFailure::from)
                        .map_err(reject::custom)
                }
            },
        )
}
