use crate::domain_model::*;
use serde::{Deserialize, Serialize};

/// Everything one user knows about its peers. Created empty on first access
/// and never deleted as a whole.
///
/// The three collections behave as sets keyed by counterpart id: every
/// mutator below replaces or ignores an existing entry for the same
/// counterpart instead of appending a second one.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipRecord {
    pub friends: Vec<FriendEntry>,
    pub outgoing_requests: Vec<OutgoingRequest>,
    pub incoming_requests: Vec<IncomingRequest>,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum RecordViolation {
    #[error("record of {0} references its owner")]
    SelfEdge(UserId),
    #[error("{0} is both a friend and a pending request")]
    FriendAndPending(UserId),
    #[error("{0} appears more than once in the same set")]
    DuplicateEntry(UserId),
}

impl RelationshipRecord {
    pub fn is_empty(&self) -> bool {
        self.friends.is_empty()
            && self.outgoing_requests.is_empty()
            && self.incoming_requests.is_empty()
    }

    pub fn friend(&self, id: &UserId) -> Option<&FriendEntry> {
        self.friends.iter().find(|f| f.id == *id)
    }

    pub fn is_friend(&self, id: &UserId) -> bool {
        self.friend(id).is_some()
    }

    pub fn outgoing_to(&self, target: &UserId) -> Option<&OutgoingRequest> {
        self.outgoing_requests.iter().find(|r| r.target_id == *target)
    }

    pub fn incoming_from(&self, requester: &UserId) -> Option<&IncomingRequest> {
        self.incoming_requests
            .iter()
            .find(|r| r.requester_id == *requester)
    }

    pub fn find_incoming(&self, selector: &RequestSelector) -> Option<&IncomingRequest> {
        self.incoming_requests.iter().find(|r| selector.matches(r))
    }

    /// Returns false when the counterpart is already a friend; the existing
    /// entry (and its timestamp) wins.
    pub fn add_friend(&mut self, entry: FriendEntry) -> bool {
        if self.is_friend(&entry.id) {
            return false;
        }
        self.friends.push(entry);
        true
    }

    pub fn remove_friend(&mut self, id: &UserId) -> Option<FriendEntry> {
        let pos = self.friends.iter().position(|f| f.id == *id)?;
        Some(self.friends.remove(pos))
    }

    /// Inserts or replaces the request to `request.target_id`.
    pub fn put_outgoing(&mut self, request: OutgoingRequest) -> Option<OutgoingRequest> {
        let replaced = self.remove_outgoing(&request.target_id);
        self.outgoing_requests.push(request);
        replaced
    }

    /// Inserts or replaces the request from `request.requester_id`.
    pub fn put_incoming(&mut self, request: IncomingRequest) -> Option<IncomingRequest> {
        let replaced = self.take_incoming(&RequestSelector::Requester(request.requester_id.clone()));
        self.incoming_requests.push(request);
        replaced
    }

    pub fn remove_outgoing(&mut self, target: &UserId) -> Option<OutgoingRequest> {
        let pos = self
            .outgoing_requests
            .iter()
            .position(|r| r.target_id == *target)?;
        Some(self.outgoing_requests.remove(pos))
    }

    pub fn take_incoming(&mut self, selector: &RequestSelector) -> Option<IncomingRequest> {
        let pos = self
            .incoming_requests
            .iter()
            .position(|r| selector.matches(r))?;
        Some(self.incoming_requests.remove(pos))
    }

    /// Single-record invariants: no self-edges, no duplicates within a set,
    /// and no counterpart that is both a friend and pending.
    pub fn check(&self, owner: &UserId) -> Result<(), RecordViolation> {
        let friend_ids = self.friends.iter().map(|f| &f.id);
        let outgoing_ids = self.outgoing_requests.iter().map(|r| &r.target_id);
        let incoming_ids = self.incoming_requests.iter().map(|r| &r.requester_id);

        for ids in [
            friend_ids.collect::<Vec<_>>(),
            outgoing_ids.collect::<Vec<_>>(),
            incoming_ids.collect::<Vec<_>>(),
        ] {
            let mut seen = std::collections::HashSet::new();
            for id in ids {
                if id == owner {
                    return Err(RecordViolation::SelfEdge(owner.clone()));
                }
                if !seen.insert(id) {
                    return Err(RecordViolation::DuplicateEntry(id.clone()));
                }
            }
        }

        for friend in &self.friends {
            if self.outgoing_to(&friend.id).is_some() || self.incoming_from(&friend.id).is_some() {
                return Err(RecordViolation::FriendAndPending(friend.id.clone()));
            }
        }

        Ok(())
    }
}

/// State of the edge between two users, derived from both halves.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EdgeState {
    None,
    Pending {
        from: UserId,
        to: UserId,
        id: RequestId,
    },
    Friends,
    /// The two halves disagree; needs out-of-band repair.
    Inconsistent,
}

pub fn edge_state(
    a: &UserId,
    a_record: &RelationshipRecord,
    b: &UserId,
    b_record: &RelationshipRecord,
) -> EdgeState {
    let a_friend = a_record.is_friend(b);
    let b_friend = b_record.is_friend(a);
    let a_out = a_record.outgoing_to(b);
    let a_in = a_record.incoming_from(b);
    let b_out = b_record.outgoing_to(a);
    let b_in = b_record.incoming_from(a);

    match (a_friend, b_friend, a_out, a_in, b_out, b_in) {
        (false, false, None, None, None, None) => EdgeState::None,
        (true, true, None, None, None, None) => EdgeState::Friends,
        (false, false, Some(out), None, None, Some(inc)) if out.id == inc.id => {
            EdgeState::Pending {
                from: a.clone(),
                to: b.clone(),
                id: out.id,
            }
        }
        (false, false, None, Some(inc), Some(out), None) if out.id == inc.id => {
            EdgeState::Pending {
                from: b.clone(),
                to: a.clone(),
                id: out.id,
            }
        }
        _ => EdgeState::Inconsistent,
    }
}
