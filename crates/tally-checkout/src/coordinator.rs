//! # Sale Submission Coordinator
//!
//! Shares one [`CartSession`] between register actions and the async
//! submission, with the backend call as the only suspension point.
//!
//! ## Lock Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  confirm_submit()                                                       │
//! │                                                                         │
//! │   lock ── begin_submit() ── unlock       (Idle → Submitting)            │
//! │                │                                                        │
//! │                ▼                                                        │
//! │        recorder.record_sale().await      (no lock held; other actions   │
//! │                │                          see Submitting and back off)  │
//! │                ▼                                                        │
//! │   lock ── finish_submit() ── unlock      (→ Settled | Failed)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tally_core::SaleReceipt;

use crate::client::SaleRecorder;
use crate::error::CheckoutResult;
use crate::session::CartSession;

/// Session handle plus the sale recording backend.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SubmissionCoordinator {
    session: Arc<Mutex<CartSession>>,
    recorder: Arc<dyn SaleRecorder>,
}

impl SubmissionCoordinator {
    pub fn new(session: CartSession, recorder: Arc<dyn SaleRecorder>) -> Self {
        SubmissionCoordinator {
            session: Arc::new(Mutex::new(session)),
            recorder,
        }
    }

    /// Executes a function with read access to the session.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = coordinator.with_session(|s| s.totals())?;
    /// ```
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CartSession) -> R,
    {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&session)
    }

    /// Executes a function with write access to the session.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// coordinator.with_session_mut(|s| s.add_inventory_item(&item))?;
    /// ```
    pub fn with_session_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CartSession) -> R,
    {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }

    /// Submits the current draft if it is settled.
    ///
    /// A second call while the first is awaiting the backend returns
    /// `SubmissionInProgress` without contacting the backend.
    pub async fn confirm_submit(&self) -> CheckoutResult<SaleReceipt> {
        let pending = self.with_session_mut(|s| s.begin_submit(Utc::now()))?;

        let result = self.recorder.record_sale(&pending.request).await;

        self.with_session_mut(|s| s.finish_submit(pending, result))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckoutError;
    use crate::session::tests::{currencies, product, receipt_for};
    use crate::session::SubmissionState;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tally_core::{NewTender, SaleRequest};
    use tokio::sync::Notify;

    /// Replays scripted outcomes; optionally parks until released.
    #[derive(Default)]
    struct ScriptedRecorder {
        outcomes: Mutex<VecDeque<Result<i64, CheckoutError>>>,
        requests: Mutex<Vec<SaleRequest>>,
        calls: AtomicUsize,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl ScriptedRecorder {
        fn with(outcomes: Vec<Result<i64, CheckoutError>>) -> Self {
            ScriptedRecorder {
                outcomes: Mutex::new(outcomes.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SaleRecorder for ScriptedRecorder {
        async fn record_sale(&self, request: &SaleRequest) -> CheckoutResult<SaleReceipt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }

            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CheckoutError::Network("no scripted outcome".into())));
            outcome.map(|id| receipt_for(request, id))
        }
    }

    fn settled_session() -> CartSession {
        let mut session = CartSession::new(currencies(), 1).unwrap();
        session.add_inventory_item(&product(1, dec!(25))).unwrap();
        session.add_payment(NewTender::new(dec!(25), 1)).unwrap();
        session
    }

    #[tokio::test]
    async fn test_empty_cart_makes_no_network_call() {
        let recorder = Arc::new(ScriptedRecorder::with(vec![Ok(1)]));
        let coordinator = SubmissionCoordinator::new(
            CartSession::new(currencies(), 1).unwrap(),
            recorder.clone(),
        );

        let err = coordinator.confirm_submit().await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(recorder.calls(), 0);
    }

    #[tokio::test]
    async fn test_amount_owed_makes_no_network_call() {
        let recorder = Arc::new(ScriptedRecorder::with(vec![Ok(1)]));
        let mut session = CartSession::new(currencies(), 1).unwrap();
        session.add_inventory_item(&product(1, dec!(100))).unwrap();
        session.add_payment(NewTender::new(dec!(60), 1)).unwrap();
        let coordinator = SubmissionCoordinator::new(session, recorder.clone());

        let err = coordinator.confirm_submit().await.unwrap_err();
        assert!(matches!(err, CheckoutError::SettlementIncomplete { .. }));
        assert_eq!(recorder.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_submission_resets_draft() {
        let recorder = Arc::new(ScriptedRecorder::with(vec![Ok(77)]));
        let coordinator = SubmissionCoordinator::new(settled_session(), recorder.clone());
        let old_id = coordinator.with_session(|s| s.draft().id().to_string());

        let receipt = coordinator.confirm_submit().await.unwrap();
        assert_eq!(receipt.id, 77);
        assert_eq!(receipt.receipt_id, old_id);

        let sent = recorder.requests.lock().unwrap()[0].clone();
        assert_eq!(sent.receipt_id, old_id);
        assert_eq!(sent.payments[0].amount, dec!(25));

        coordinator.with_session(|s| {
            assert!(s.draft().is_empty());
            assert!(s.draft().payments().is_empty());
            assert_ne!(s.draft().id(), old_id);
            assert!(matches!(s.state(), SubmissionState::Settled { .. }));
        });
    }

    #[tokio::test]
    async fn test_failure_preserves_draft_for_retry() {
        let recorder = Arc::new(ScriptedRecorder::with(vec![
            Err(CheckoutError::Http {
                status: 503,
                message: "maintenance".into(),
            }),
            Ok(12),
        ]));
        let coordinator = SubmissionCoordinator::new(settled_session(), recorder.clone());
        let draft_id = coordinator.with_session(|s| s.draft().id().to_string());

        let err = coordinator.confirm_submit().await.unwrap_err();
        assert!(err.is_retryable());
        coordinator.with_session(|s| {
            assert_eq!(s.draft().id(), draft_id);
            assert_eq!(s.draft().items().len(), 1);
            assert!(matches!(s.state(), SubmissionState::Failed { .. }));
        });

        let receipt = coordinator.confirm_submit().await.unwrap();
        assert_eq!(receipt.receipt_id, draft_id);

        // Both attempts carried the same receipt id
        let requests = recorder.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].receipt_id, requests[1].receipt_id);
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_rejected() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let recorder = Arc::new(ScriptedRecorder {
            outcomes: Mutex::new(VecDeque::from([Ok(5)])),
            gate: Some((entered.clone(), release.clone())),
            ..Default::default()
        });
        let coordinator = SubmissionCoordinator::new(settled_session(), recorder.clone());

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.confirm_submit().await }
        });
        entered.notified().await;

        let second = coordinator.confirm_submit().await;
        assert!(matches!(second, Err(CheckoutError::SubmissionInProgress)));

        let edit = coordinator.with_session_mut(|s| s.set_discount_amount(dec!(1)));
        assert!(matches!(edit, Err(CheckoutError::SubmissionInProgress)));

        release.notify_one();
        let receipt = first.await.unwrap().unwrap();
        assert_eq!(receipt.id, 5);
        assert_eq!(recorder.calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_during_flight_keeps_new_draft() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let recorder = Arc::new(ScriptedRecorder {
            outcomes: Mutex::new(VecDeque::from([Ok(9)])),
            gate: Some((entered.clone(), release.clone())),
            ..Default::default()
        });
        let coordinator = SubmissionCoordinator::new(settled_session(), recorder.clone());

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.confirm_submit().await }
        });
        entered.notified().await;

        let new_id = coordinator.with_session_mut(|s| {
            s.clear();
            s.add_inventory_item(&product(3, dec!(4))).unwrap();
            s.draft().id().to_string()
        });

        release.notify_one();
        // The sale exists server-side, so the receipt still comes back
        assert_eq!(first.await.unwrap().unwrap().id, 9);

        coordinator.with_session(|s| {
            assert_eq!(s.draft().id(), new_id);
            assert_eq!(s.draft().items().len(), 1);
            assert_eq!(s.state(), &SubmissionState::Idle);
        });
    }
}
