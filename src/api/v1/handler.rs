use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use warp::{self, Rejection, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(kind: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                kind,
                message: message.into(),
            }),
        }
    }
}

/// Runs `op` in its own task and bounds only the wait for it. A timed-out
/// operation still finishes (including any rollback) in the background.
async fn run_bounded<T, Fut>(timeout: Duration, op: Fut) -> Result<T, Rejection>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, RelationError>> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::spawn(op)).await {
        Ok(Ok(result)) => result.map_err(ApiFailure::from).map_err(reject::custom),
        Ok(Err(join_error)) => Err(reject::custom(ApiFailure::internal(join_error))),
        Err(_) => Err(reject::custom(ApiFailure::timeout())),
    }
}

pub async fn list_relationships(
    caller: CallerContext,
    relationship_service: Arc<dyn RelationshipService>,
    timeout: Duration,
) -> Result<impl warp::Reply, Rejection> {
    let record = run_bounded(timeout, async move {
        relationship_service.list_relationships(&caller).await
    })
    .await?;

    Ok(warp::reply::json(&ApiResponse::ok(record)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequestBody {
    pub target_id: UserId,
    pub target_display_name: DisplayName,
}

pub async fn send_request(
    body: SendRequestBody,
    caller: CallerContext,
    relationship_service: Arc<dyn RelationshipService>,
    timeout: Duration,
) -> Result<impl warp::Reply, Rejection> {
    let outcome = run_bounded(timeout, async move {
        relationship_service
            .send_request(&caller, body.target_id, body.target_display_name)
            .await
    })
    .await?;

    Ok(warp::reply::json(&ApiResponse::ok(outcome)))
}

/// Carries exactly one of `requestId` / `requesterId`; anything else fails
/// to deserialize and is answered like any other malformed body.
#[derive(Debug, Deserialize)]
#[serde(try_from = "RespondFields")]
pub struct RespondBody {
    pub selector: RequestSelector,
    pub accept: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RespondFields {
    request_id: Option<RequestId>,
    requester_id: Option<UserId>,
    accept: bool,
}

impl TryFrom<RespondFields> for RespondBody {
    type Error = String;

    fn try_from(fields: RespondFields) -> Result<Self, Self::Error> {
        let selector = match (fields.request_id, fields.requester_id) {
            (Some(id), None) => RequestSelector::Id(id),
            (None, Some(requester)) => RequestSelector::Requester(requester),
            _ => return Err("exactly one of requestId or requesterId is required".to_owned()),
        };
        Ok(RespondBody {
            selector,
            accept: fields.accept,
        })
    }
}

pub async fn respond_to_request(
    body: RespondBody,
    caller: CallerContext,
    relationship_service: Arc<dyn RelationshipService>,
    timeout: Duration,
) -> Result<impl warp::Reply, Rejection> {
    let outcome = run_bounded(timeout, async move {
        relationship_service
            .respond_to_request(&caller, body.selector, body.accept)
            .await
    })
    .await?;

    Ok(warp::reply::json(&ApiResponse::ok(outcome)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFriendBody {
    pub target_id: UserId,
}

pub async fn remove_friend(
    body: RemoveFriendBody,
    caller: CallerContext,
    relationship_service: Arc<dyn RelationshipService>,
    timeout: Duration,
) -> Result<impl warp::Reply, Rejection> {
    let removed = run_bounded(timeout, async move {
        relationship_service
            .remove_friend(&caller, body.target_id)
            .await
    })
    .await?;

    Ok(warp::reply::json(&ApiResponse::ok(removed)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatesBody {
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub exclude_self: bool,
}

pub async fn lookup_candidates(
    body: CandidatesBody,
    caller: CallerContext,
    relationship_service: Arc<dyn RelationshipService>,
    timeout: Duration,
) -> Result<impl warp::Reply, Rejection> {
    let views = run_bounded(timeout, async move {
        relationship_service
            .lookup_candidates(&caller, body.exclude_self, body.candidates)
            .await
    })
    .await?;

    Ok(warp::reply::json(&ApiResponse::ok(views)))
}
