//! Pure relationship logic over in-memory records.
//!
//! Every operation is split in two: a `plan_*`/`locate_*` step that inspects
//! the loaded records and rejects bad preconditions, and an `apply_*` step
//! that mutates both halves of the edge. Nothing here touches the store.

use crate::application_port::{RelationError, RespondOutcome};
use crate::domain_model::*;
use chrono::{DateTime, Utc};

pub enum SendPlan {
    Request,
    /// The target already asked the caller.
    AutoAccept(IncomingRequest),
}

fn conflict(message: impl Into<String>) -> RelationError {
    RelationError::ConflictingState(message.into())
}

/// Decides what a send from `caller` to `target_id` does, looking at both
/// records.
///
/// A crossed request is answered first, so a retry of a half-written
/// auto-accept (target already lists the caller) still converges. An
/// outgoing request whose incoming half is missing on the target, or carries
/// another id, is not a duplicate: the send re-issues it under a fresh id.
pub fn plan_send(
    caller: &CallerContext,
    caller_record: &RelationshipRecord,
    target_id: &UserId,
    target_record: &RelationshipRecord,
) -> Result<SendPlan, RelationError> {
    if *target_id == caller.user_id {
        return Err(RelationError::InvalidArgument(
            "cannot send a friend request to yourself".to_owned(),
        ));
    }
    if caller_record.is_friend(target_id) {
        return Err(RelationError::AlreadyFriends);
    }

    if let Some(incoming) = caller_record.incoming_from(target_id) {
        if target_record
            .outgoing_to(&caller.user_id)
            .is_some_and(|outgoing| outgoing.id != incoming.id)
        {
            return Err(conflict(format!(
                "the pending request from {target_id} does not match their side, \
                 decline it or ask them to send it again"
            )));
        }
        return Ok(SendPlan::AutoAccept(incoming.clone()));
    }

    if target_record.is_friend(&caller.user_id) {
        return Err(conflict(format!(
            "{target_id} lists you as a friend but you do not list them"
        )));
    }

    if let Some(outgoing) = caller_record.outgoing_to(target_id) {
        let delivered = target_record
            .incoming_from(&caller.user_id)
            .is_some_and(|incoming| incoming.id == outgoing.id);
        return if delivered {
            Err(RelationError::DuplicateRequest)
        } else {
            Ok(SendPlan::Request)
        };
    }

    if target_record.outgoing_to(&caller.user_id).is_some() {
        return Err(conflict(format!(
            "{target_id} has a request to you that never arrived, ask them to send it again"
        )));
    }
    Ok(SendPlan::Request)
}

/// Adds both halves of a new request under one freshly generated id. Stale
/// halves on either side are replaced so the two ids agree again.
pub fn apply_request(
    caller: &CallerContext,
    caller_record: &mut RelationshipRecord,
    target_id: &UserId,
    target_name: &DisplayName,
    target_record: &mut RelationshipRecord,
    now: DateTime<Utc>,
) -> OutgoingRequest {
    let id = RequestId::generate();
    let request = OutgoingRequest {
        id,
        target_id: target_id.clone(),
        target_display_name: target_name.clone(),
        sent_at: now,
    };
    caller_record.put_outgoing(request.clone());
    target_record.put_incoming(IncomingRequest {
        id,
        requester_id: caller.user_id.clone(),
        requester_display_name: caller.display_name.clone(),
        created_at: now,
    });
    request
}

pub fn locate_incoming(
    caller_record: &RelationshipRecord,
    selector: &RequestSelector,
) -> Result<IncomingRequest, RelationError> {
    caller_record
        .find_incoming(selector)
        .cloned()
        .ok_or(RelationError::RequestNotFound)
}

/// Answers `incoming` on both records.
///
/// The requester's outgoing half may already be gone when a previous attempt
/// wrote the requester but not the caller; that is treated as converged
/// state.
pub fn apply_respond(
    caller: &CallerContext,
    caller_record: &mut RelationshipRecord,
    incoming: &IncomingRequest,
    requester_record: &mut RelationshipRecord,
    accept: bool,
    now: DateTime<Utc>,
) -> Result<RespondOutcome, RelationError> {
    if accept {
        let friend = apply_accept(caller, caller_record, incoming, requester_record, now)?;
        Ok(RespondOutcome::Accepted { friend })
    } else {
        apply_decline(caller, caller_record, incoming, requester_record)?;
        Ok(RespondOutcome::Declined {
            request_id: incoming.id,
        })
    }
}

/// Returns the caller's entry for the new friend. An existing entry (from an
/// earlier partially written attempt) is kept as is. An outgoing half with a
/// different id is a conflicting request and is rejected.
pub fn apply_accept(
    caller: &CallerContext,
    caller_record: &mut RelationshipRecord,
    incoming: &IncomingRequest,
    requester_record: &mut RelationshipRecord,
    now: DateTime<Utc>,
) -> Result<FriendEntry, RelationError> {
    reject_own_request(caller, incoming)?;
    let requester = &incoming.requester_id;
    if requester_record
        .outgoing_to(&caller.user_id)
        .is_some_and(|outgoing| outgoing.id != incoming.id)
    {
        return Err(RelationError::RequestNotFound);
    }

    caller_record.take_incoming(&RequestSelector::Id(incoming.id));
    requester_record.remove_outgoing(&caller.user_id);
    // a crossed request in the other direction is absorbed by the friendship
    caller_record.remove_outgoing(requester);
    requester_record.take_incoming(&RequestSelector::Requester(caller.user_id.clone()));

    let friend = FriendEntry {
        id: requester.clone(),
        display_name: incoming.requester_display_name.clone(),
        added_at: now,
    };
    caller_record.add_friend(friend.clone());
    requester_record.add_friend(FriendEntry {
        id: caller.user_id.clone(),
        display_name: caller.display_name.clone(),
        added_at: now,
    });

    Ok(caller_record.friend(requester).cloned().unwrap_or(friend))
}

/// Drops the caller's incoming entry. The requester's outgoing half goes with
/// it only when the ids agree; one with another id belongs to a request the
/// caller never saw and stays where it is.
fn apply_decline(
    caller: &CallerContext,
    caller_record: &mut RelationshipRecord,
    incoming: &IncomingRequest,
    requester_record: &mut RelationshipRecord,
) -> Result<(), RelationError> {
    reject_own_request(caller, incoming)?;
    if requester_record.is_friend(&caller.user_id) {
        return Err(conflict(format!(
            "{} already counts this request as accepted, accept it to finish",
            incoming.requester_id
        )));
    }

    caller_record.take_incoming(&RequestSelector::Id(incoming.id));
    if requester_record
        .outgoing_to(&caller.user_id)
        .is_some_and(|outgoing| outgoing.id == incoming.id)
    {
        requester_record.remove_outgoing(&caller.user_id);
    }
    Ok(())
}

fn reject_own_request(
    caller: &CallerContext,
    incoming: &IncomingRequest,
) -> Result<(), RelationError> {
    if incoming.requester_id == caller.user_id {
        return Err(RelationError::InvalidArgument(
            "cannot answer a friend request from yourself".to_owned(),
        ));
    }
    Ok(())
}

/// The target may already have dropped the caller (a retried removal); a
/// pending request between the two while the caller lists a friendship is
/// refused.
pub fn plan_remove(
    caller_id: &UserId,
    caller_record: &RelationshipRecord,
    target_id: &UserId,
    target_record: &RelationshipRecord,
) -> Result<(), RelationError> {
    if target_id == caller_id {
        return Err(RelationError::InvalidArgument(
            "cannot remove yourself".to_owned(),
        ));
    }
    if !caller_record.is_friend(target_id) {
        return Err(RelationError::NotFriends);
    }
    if target_record.outgoing_to(caller_id).is_some() || target_record.incoming_from(caller_id).is_some()
    {
        return Err(conflict(format!(
            "{target_id} still has a pending request with you, answer it first"
        )));
    }
    Ok(())
}

pub fn apply_remove(
    caller_id: &UserId,
    caller_record: &mut RelationshipRecord,
    target_id: &UserId,
    target_record: &mut RelationshipRecord,
) -> Result<FriendEntry, RelationError> {
    let removed = caller_record
        .remove_friend(target_id)
        .ok_or(RelationError::NotFriends)?;
    target_record.remove_friend(caller_id);
    Ok(removed)
}

/// Last gate before anything is written: both mutated records must satisfy
/// the single-record invariants.
pub fn verify_records(records: [(&UserId, &RelationshipRecord); 2]) -> Result<(), RelationError> {
    for (owner, record) in records {
        record
            .check(owner)
            .map_err(|violation| conflict(violation.to_string()))?;
    }
    Ok(())
}

pub fn annotate_candidates(
    caller_id: &UserId,
    caller_record: &RelationshipRecord,
    candidates: Vec<Candidate>,
    exclude_self: bool,
) -> Vec<CandidateView> {
    candidates
        .into_iter()
        .filter(|c| !(exclude_self && c.id == *caller_id))
        .map(|c| CandidateView {
            is_friend: caller_record.is_friend(&c.id),
            request_sent: caller_record.outgoing_to(&c.id).is_some(),
            id: c.id,
            display_name: c.display_name,
        })
        .collect()
}
