use crate::application_impl::relationship_engine::{self as engine, SendPlan};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::RelationshipStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct RealRelationshipService {
    store: Arc<dyn RelationshipStore>,
}

impl RealRelationshipService {
    pub fn new(store: Arc<dyn RelationshipStore>) -> Self {
        Self { store }
    }

    async fn load(&self, user_id: &UserId) -> Result<RelationshipRecord, RelationError> {
        self.store.load(user_id).await.map_err(|source| {
            warn!(key = %user_id, error = %source, "relationship record read failed");
            RelationError::StoreRead {
                key: user_id.clone(),
                source,
            }
        })
    }

    /// Writes `first` then `second`. If `second` fails, `first` is restored
    /// to `first_before`; the outcome of that single rollback attempt decides
    /// between a clean write failure and an inconsistency.
    async fn write_with_rollback(
        &self,
        first: (&UserId, &RelationshipRecord),
        first_before: &RelationshipRecord,
        second: (&UserId, &RelationshipRecord),
    ) -> Result<(), RelationError> {
        let (first_id, first_record) = first;
        let (second_id, second_record) = second;

        if let Err(source) = self.store.save(first_id, first_record).await {
            warn!(key = %first_id, error = %source, "relationship record write failed");
            return Err(RelationError::StoreWrite {
                key: first_id.clone(),
                rolled_back: false,
                source,
            });
        }

        let Err(source) = self.store.save(second_id, second_record).await else {
            return Ok(());
        };

        match self.store.save(first_id, first_before).await {
            Ok(()) => {
                warn!(
                    key = %second_id,
                    rolled_back = %first_id,
                    error = %source,
                    "relationship record write failed, counterpart rolled back"
                );
                Err(RelationError::StoreWrite {
                    key: second_id.clone(),
                    rolled_back: true,
                    source,
                })
            }
            Err(rollback) => {
                error!(
                    written = %first_id,
                    failed = %second_id,
                    error = %source,
                    rollback_error = %rollback,
                    "relationship edge left inconsistent, needs repair"
                );
                Err(RelationError::PartialWriteInconsistency {
                    written: first_id.clone(),
                    failed: second_id.clone(),
                    source,
                    rollback,
                })
            }
        }
    }

    /// Writes the requester's half before the responder's. The responder's
    /// incoming entry is what a retry looks up, so it is only dropped once
    /// the requester's half is durable; no rollback is needed.
    async fn write_response(
        &self,
        requester: (&UserId, &RelationshipRecord),
        responder: (&UserId, &RelationshipRecord),
    ) -> Result<(), RelationError> {
        for (user_id, record) in [requester, responder] {
            if let Err(source) = self.store.save(user_id, record).await {
                warn!(key = %user_id, error = %source, "relationship record write failed");
                return Err(RelationError::StoreWrite {
                    key: user_id.clone(),
                    rolled_back: false,
                    source,
                });
            }
        }
        Ok(())
    }
}

fn refused(caller: &CallerContext, counterpart: &UserId, error: &RelationError) {
    if let RelationError::ConflictingState(detail) = error {
        warn!(caller = %caller.user_id, counterpart = %counterpart, %detail, "operation refused on conflicting pair state");
    }
}

fn verify(
    caller_id: &UserId,
    caller_record: &RelationshipRecord,
    counterpart_id: &UserId,
    counterpart_record: &RelationshipRecord,
) -> Result<(), RelationError> {
    engine::verify_records([
        (caller_id, caller_record),
        (counterpart_id, counterpart_record),
    ])
    .inspect_err(|e| {
        warn!(caller = %caller_id, counterpart = %counterpart_id, error = %e, "mutation would break record invariants, nothing written");
    })
}

#[async_trait::async_trait]
impl RelationshipService for RealRelationshipService {
    async fn list_relationships(
        &self,
        caller: &CallerContext,
    ) -> Result<RelationshipRecord, RelationError> {
        self.load(&caller.user_id).await
    }

    async fn send_request(
        &self,
        caller: &CallerContext,
        target_id: UserId,
        target_name: DisplayName,
    ) -> Result<SendOutcome, RelationError> {
        let mut caller_record = self.load(&caller.user_id).await?;
        let mut target_record = self.load(&target_id).await?;
        let plan = engine::plan_send(caller, &caller_record, &target_id, &target_record)
            .inspect_err(|e| refused(caller, &target_id, e))?;
        let now = Utc::now();

        match plan {
            SendPlan::Request => {
                let before = caller_record.clone();
                let request = engine::apply_request(
                    caller,
                    &mut caller_record,
                    &target_id,
                    &target_name,
                    &mut target_record,
                    now,
                );
                verify(&caller.user_id, &caller_record, &target_id, &target_record)?;
                self.write_with_rollback(
                    (&caller.user_id, &caller_record),
                    &before,
                    (&target_id, &target_record),
                )
                .await?;

                info!(caller = %caller.user_id, target = %target_id, request = %request.id, "friend request sent");
                Ok(SendOutcome::Requested { request })
            }
            SendPlan::AutoAccept(incoming) => {
                let friend = engine::apply_accept(
                    caller,
                    &mut caller_record,
                    &incoming,
                    &mut target_record,
                    now,
                )?;
                verify(&caller.user_id, &caller_record, &target_id, &target_record)?;
                self.write_response(
                    (&target_id, &target_record),
                    (&caller.user_id, &caller_record),
                )
                .await?;

                info!(caller = %caller.user_id, target = %target_id, request = %incoming.id, "crossed friend requests collapsed");
                Ok(SendOutcome::AutoAccepted { friend })
            }
        }
    }

    async fn respond_to_request(
        &self,
        caller: &CallerContext,
        selector: RequestSelector,
        accept: bool,
    ) -> Result<RespondOutcome, RelationError> {
        let mut caller_record = self.load(&caller.user_id).await?;
        let incoming = engine::locate_incoming(&caller_record, &selector)?;
        let requester_id = incoming.requester_id.clone();
        let mut requester_record = self.load(&requester_id).await?;

        let outcome = engine::apply_respond(
            caller,
            &mut caller_record,
            &incoming,
            &mut requester_record,
            accept,
            Utc::now(),
        )
        .inspect_err(|e| refused(caller, &requester_id, e))?;
        verify(&caller.user_id, &caller_record, &requester_id, &requester_record)?;
        self.write_response(
            (&requester_id, &requester_record),
            (&caller.user_id, &caller_record),
        )
        .await?;

        info!(caller = %caller.user_id, requester = %requester_id, request = %incoming.id, accept, "friend request answered");
        Ok(outcome)
    }

    async fn remove_friend(
        &self,
        caller: &CallerContext,
        target_id: UserId,
    ) -> Result<FriendEntry, RelationError> {
        let mut caller_record = self.load(&caller.user_id).await?;
        let mut target_record = self.load(&target_id).await?;
        engine::plan_remove(&caller.user_id, &caller_record, &target_id, &target_record)
            .inspect_err(|e| refused(caller, &target_id, e))?;

        let before = caller_record.clone();
        let removed = engine::apply_remove(
            &caller.user_id,
            &mut caller_record,
            &target_id,
            &mut target_record,
        )?;
        verify(&caller.user_id, &caller_record, &target_id, &target_record)?;
        self.write_with_rollback(
            (&caller.user_id, &caller_record),
            &before,
            (&target_id, &target_record),
        )
        .await?;

        info!(caller = %caller.user_id, target = %target_id, "friend removed");
        Ok(removed)
    }

    async fn lookup_candidates(
        &self,
        caller: &CallerContext,
        exclude_self: bool,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<CandidateView>, RelationError> {
        let caller_record = self.load(&caller.user_id).await?;
        Ok(engine::annotate_candidates(
            &caller.user_id,
            &caller_record,
            candidates,
            exclude_self,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::StoreError;
    use crate::infra_memory::MemoryRelationshipStore;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Fails the saves whose 0-based call index is listed, and every load of
    /// the listed keys.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryRelationshipStore,
        save_calls: Mutex<usize>,
        failing_saves: HashSet<usize>,
        failing_loads: HashSet<UserId>,
    }

    impl FlakyStore {
        fn failing_saves(calls: &[usize]) -> Self {
            Self {
                failing_saves: calls.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn reset(&self) {
            *self.save_calls.lock().unwrap() = 0;
        }
    }

    #[async_trait::async_trait]
    impl RelationshipStore for FlakyStore {
        async fn load(&self, user_id: &UserId) -> Result<RelationshipRecord, StoreError> {
            if self.failing_loads.contains(user_id) {
                return Err(StoreError::Backend("injected read failure".to_owned()));
            }
            self.inner.load(user_id).await
        }

        async fn save(
            &self,
            user_id: &UserId,
            record: &RelationshipRecord,
        ) -> Result<(), StoreError> {
            let call = {
                let mut calls = self.save_calls.lock().unwrap();
                let call = *calls;
                *calls += 1;
                call
            };
            if self.failing_saves.contains(&call) {
                return Err(StoreError::Backend("injected write failure".to_owned()));
            }
            self.inner.save(user_id, record).await
        }
    }

    fn user(id: &str) -> CallerContext {
        CallerContext::new(id.parse().unwrap(), format!("Guardian {id}").parse().unwrap())
    }

    async fn seed_friends(store: &FlakyStore, a: &CallerContext, b: &CallerContext) {
        let now = Utc::now();
        let mut ra = store.inner.load(&a.user_id).await.unwrap();
        let mut rb = store.inner.load(&b.user_id).await.unwrap();
        ra.add_friend(FriendEntry {
            id: b.user_id.clone(),
            display_name: b.display_name.clone(),
            added_at: now,
        });
        rb.add_friend(FriendEntry {
            id: a.user_id.clone(),
            display_name: a.display_name.clone(),
            added_at: now,
        });
        store.inner.save(&a.user_id, &ra).await.unwrap();
        store.inner.save(&b.user_id, &rb).await.unwrap();
    }

    #[tokio::test]
    async fn send_rolls_back_caller_when_target_write_fails() {
        let store = Arc::new(FlakyStore::failing_saves(&[1]));
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));

        let before = store.inner.load(&a.user_id).await.unwrap();
        let err = service
            .send_request(&a, b.user_id.clone(), b.display_name.clone())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreWriteFailure);
        assert!(matches!(err, RelationError::StoreWrite { rolled_back: true, .. }));
        assert_eq!(store.inner.load(&a.user_id).await.unwrap(), before);
        assert!(store.inner.load(&b.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_reports_inconsistency_when_rollback_fails() {
        let store = Arc::new(FlakyStore::failing_saves(&[1, 2]));
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));

        let err = service
            .send_request(&a, b.user_id.clone(), b.display_name.clone())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PartialWriteInconsistency);
        let RelationError::PartialWriteInconsistency { written, failed, .. } = err else {
            panic!("expected inconsistency");
        };
        assert_eq!(written, a.user_id);
        assert_eq!(failed, b.user_id);
    }

    #[tokio::test]
    async fn send_first_write_failure_changes_nothing() {
        let store = Arc::new(FlakyStore::failing_saves(&[0]));
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));

        let err = service
            .send_request(&a, b.user_id.clone(), b.display_name.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, RelationError::StoreWrite { rolled_back: false, .. }));
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn remove_rolls_back_caller_when_target_write_fails() {
        let store = Arc::new(FlakyStore::failing_saves(&[1]));
        let (a, b) = (user("a"), user("b"));
        seed_friends(&store, &a, &b).await;
        let service = RealRelationshipService::new(store.clone());

        let before = store.inner.load(&a.user_id).await.unwrap();
        let err = service
            .remove_friend(&a, b.user_id.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, RelationError::StoreWrite { rolled_back: true, .. }));
        assert_eq!(store.inner.load(&a.user_id).await.unwrap(), before);
        assert!(store.inner.load(&b.user_id).await.unwrap().is_friend(&a.user_id));
    }

    #[tokio::test]
    async fn accept_retry_after_partial_write_converges() {
        // save #0 is the request's caller half, #1 its target half,
        // #2 the requester half of the accept, #3 the responder half
        let store = Arc::new(FlakyStore::failing_saves(&[3]));
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));

        let SendOutcome::Requested { request } = service
            .send_request(&a, b.user_id.clone(), b.display_name.clone())
            .await
            .unwrap()
        else {
            panic!("expected request");
        };

        let err = service
            .respond_to_request(&b, RequestSelector::Id(request.id), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreWriteFailure);

        service
            .respond_to_request(&b, RequestSelector::Id(request.id), true)
            .await
            .unwrap();

        let ra = store.inner.load(&a.user_id).await.unwrap();
        let rb = store.inner.load(&b.user_id).await.unwrap();
        assert_eq!(edge_state(&a.user_id, &ra, &b.user_id, &rb), EdgeState::Friends);
        assert_eq!(ra.friends.len(), 1);
        assert_eq!(rb.friends.len(), 1);
    }

    #[tokio::test]
    async fn accept_failing_on_requester_half_leaves_request_answerable() {
        let store = Arc::new(FlakyStore::failing_saves(&[2]));
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));

        service
            .send_request(&a, b.user_id.clone(), b.display_name.clone())
            .await
            .unwrap();
        let pending_b = store.inner.load(&b.user_id).await.unwrap();

        let err = service
            .respond_to_request(&b, RequestSelector::Requester(a.user_id.clone()), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreWriteFailure);
        assert_eq!(store.inner.load(&b.user_id).await.unwrap(), pending_b);

        store.reset();
        service
            .respond_to_request(&b, RequestSelector::Requester(a.user_id.clone()), true)
            .await
            .unwrap();
        assert!(store.inner.load(&a.user_id).await.unwrap().is_friend(&b.user_id));
    }

    #[tokio::test]
    async fn read_failure_is_reported_before_any_write() {
        let (a, b) = (user("a"), user("b"));
        let store = Arc::new(FlakyStore {
            failing_loads: [b.user_id.clone()].into_iter().collect(),
            ..FlakyStore::default()
        });
        let service = RealRelationshipService::new(store.clone());

        let err = service
            .send_request(&a, b.user_id.clone(), b.display_name.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreReadFailure);
        assert!(matches!(err, RelationError::StoreRead { ref key, .. } if *key == b.user_id));
        assert!(store.inner.is_empty());
    }

    async fn send(
        service: &RealRelationshipService,
        from: &CallerContext,
        to: &CallerContext,
    ) -> Result<SendOutcome, RelationError> {
        service
            .send_request(from, to.user_id.clone(), to.display_name.clone())
            .await
    }

    #[tokio::test]
    async fn remove_reports_inconsistency_when_rollback_fails() {
        let store = Arc::new(FlakyStore::failing_saves(&[1, 2]));
        let (a, b) = (user("a"), user("b"));
        seed_friends(&store, &a, &b).await;
        let service = RealRelationshipService::new(store.clone());

        let err = service
            .remove_friend(&a, b.user_id.clone())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PartialWriteInconsistency);
        let RelationError::PartialWriteInconsistency { written, failed, .. } = err else {
            panic!("expected inconsistency");
        };
        assert_eq!(written, a.user_id);
        assert_eq!(failed, b.user_id);
        assert!(!store.inner.load(&a.user_id).await.unwrap().is_friend(&b.user_id));
        assert!(store.inner.load(&b.user_id).await.unwrap().is_friend(&a.user_id));

        // the other side removing converges the pair
        service.remove_friend(&b, a.user_id.clone()).await.unwrap();
        let ra = store.inner.load(&a.user_id).await.unwrap();
        let rb = store.inner.load(&b.user_id).await.unwrap();
        assert_eq!(edge_state(&a.user_id, &ra, &b.user_id, &rb), EdgeState::None);
    }

    #[tokio::test]
    async fn auto_accept_retry_after_partial_write_converges() {
        // #0/#1 are the request, #2 the requester half of the collapse,
        // #3 the responder half
        let store = Arc::new(FlakyStore::failing_saves(&[3]));
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));

        send(&service, &a, &b).await.unwrap();
        let err = send(&service, &b, &a).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreWriteFailure);
        assert!(store.inner.load(&a.user_id).await.unwrap().is_friend(&b.user_id));

        let outcome = send(&service, &b, &a).await.unwrap();
        assert!(matches!(outcome, SendOutcome::AutoAccepted { ref friend } if friend.id == a.user_id));

        let ra = store.inner.load(&a.user_id).await.unwrap();
        let rb = store.inner.load(&b.user_id).await.unwrap();
        assert_eq!(edge_state(&a.user_id, &ra, &b.user_id, &rb), EdgeState::Friends);
        assert_eq!(ra.friends.len(), 1);
        assert_eq!(rb.friends.len(), 1);
    }

    #[tokio::test]
    async fn decline_retry_after_partial_write_converges() {
        let store = Arc::new(FlakyStore::failing_saves(&[3]));
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));

        send(&service, &a, &b).await.unwrap();
        let selector = RequestSelector::Requester(a.user_id.clone());
        let err = service
            .respond_to_request(&b, selector.clone(), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreWriteFailure);

        let outcome = service
            .respond_to_request(&b, selector, false)
            .await
            .unwrap();
        assert!(matches!(outcome, RespondOutcome::Declined { .. }));

        let ra = store.inner.load(&a.user_id).await.unwrap();
        let rb = store.inner.load(&b.user_id).await.unwrap();
        assert_eq!(edge_state(&a.user_id, &ra, &b.user_id, &rb), EdgeState::None);
    }

    #[tokio::test]
    async fn send_to_target_listing_caller_as_friend_is_refused() {
        let store = Arc::new(FlakyStore::default());
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));
        let mut rb = RelationshipRecord::default();
        rb.add_friend(FriendEntry {
            id: a.user_id.clone(),
            display_name: a.display_name.clone(),
            added_at: Utc::now(),
        });
        store.inner.save(&b.user_id, &rb).await.unwrap();

        let err = send(&service, &a, &b).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(matches!(err, RelationError::ConflictingState(_)));
        assert!(store.inner.load(&a.user_id).await.unwrap().is_empty());
        let rb_after = store.inner.load(&b.user_id).await.unwrap();
        assert_eq!(rb_after, rb);
        rb_after.check(&b.user_id).unwrap();
    }

    #[tokio::test]
    async fn mutation_breaking_record_invariants_is_not_written() {
        let store = Arc::new(FlakyStore::default());
        let service = RealRelationshipService::new(store.clone());
        let (a, b, c) = (user("a"), user("b"), user("c"));
        let entry = FriendEntry {
            id: c.user_id.clone(),
            display_name: c.display_name.clone(),
            added_at: Utc::now(),
        };
        let ra = RelationshipRecord {
            friends: vec![entry.clone(), entry],
            ..RelationshipRecord::default()
        };
        store.inner.save(&a.user_id, &ra).await.unwrap();

        let err = send(&service, &a, &b).await.unwrap_err();
        assert!(matches!(err, RelationError::ConflictingState(_)));
        assert_eq!(store.inner.load(&a.user_id).await.unwrap(), ra);
        assert!(store.inner.load(&b.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pair_with_mismatched_request_ids_can_be_recovered() {
        let store = Arc::new(FlakyStore::default());
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));

        send(&service, &a, &b).await.unwrap();
        // a lost update left a's outgoing half under another id
        let mut ra = store.inner.load(&a.user_id).await.unwrap();
        ra.outgoing_requests[0].id = RequestId::generate();
        store.inner.save(&a.user_id, &ra).await.unwrap();
        let by_requester = RequestSelector::Requester(a.user_id.clone());

        let err = service
            .respond_to_request(&b, by_requester.clone(), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestNotFound);
        let err = send(&service, &b, &a).await.unwrap_err();
        assert!(matches!(err, RelationError::ConflictingState(_)));

        service
            .respond_to_request(&b, by_requester, false)
            .await
            .unwrap();
        assert!(store.inner.load(&b.user_id).await.unwrap().is_empty());
        assert_eq!(store.inner.load(&a.user_id).await.unwrap(), ra);

        // the requester re-sending repairs the pair
        let SendOutcome::Requested { request } = send(&service, &a, &b).await.unwrap() else {
            panic!("expected a re-issued request");
        };
        service
            .respond_to_request(&b, RequestSelector::Id(request.id), true)
            .await
            .unwrap();
        let ra = store.inner.load(&a.user_id).await.unwrap();
        let rb = store.inner.load(&b.user_id).await.unwrap();
        assert_eq!(edge_state(&a.user_id, &ra, &b.user_id, &rb), EdgeState::Friends);
    }

    #[tokio::test]
    async fn requester_resend_repairs_mismatched_ids_directly() {
        let store = Arc::new(FlakyStore::default());
        let service = RealRelationshipService::new(store.clone());
        let (a, b) = (user("a"), user("b"));

        send(&service, &a, &b).await.unwrap();
        let mut ra = store.inner.load(&a.user_id).await.unwrap();
        ra.outgoing_requests[0].id = RequestId::generate();
        store.inner.save(&a.user_id, &ra).await.unwrap();

        assert!(matches!(
            send(&service, &a, &b).await.unwrap(),
            SendOutcome::Requested { .. }
        ));
        let ra = store.inner.load(&a.user_id).await.unwrap();
        let rb = store.inner.load(&b.user_id).await.unwrap();
        assert!(matches!(
            edge_state(&a.user_id, &ra, &b.user_id, &rb),
            EdgeState::Pending { .. }
        ));
        assert_eq!(rb.incoming_requests.len(), 1);
    }
}
