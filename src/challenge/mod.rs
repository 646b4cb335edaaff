//! Per-realm challenge handling
//!
//! Each protected realm gets one [`ChallengeHandler`] that serializes
//! challenge delivery: one request is active at a time, later arrivals park
//! in a waiting queue until the active one resolves. The authentication
//! delegate is always invoked outside the handler lock, so a delegate may
//! answer synchronously from inside the callback.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;


/// Challenge and answer payloads are free-form JSON objects
pub type ChallengeData = Map<String, Value>;

/// Hooks an in-flight request exposes to the challenge machinery.
///
/// `remove_expected_answer` tells a request its realm no longer expects
/// anything from it; requests resume transparently when released this way.
pub trait AuthorizationRequest: Send + Sync {
    /// Deliver the answer for a realm challenge
    fn submit_answer(&self, realm: &str, answer: &ChallengeData);

    /// Release the request: the realm is done with it
    fn remove_expected_answer(&self, realm: &str);

    /// The request failed the challenge and should not be retried
    fn request_failed(&self, info: Option<&ChallengeData>);
}

/// Application-supplied authenticator for one realm
pub trait AuthenticationDelegate: Send + Sync {
    /// A challenge arrived; answer it through the context
    fn on_challenge_received(&self, context: &ChallengeContext, challenge: &ChallengeData);

    /// The realm reported the last answer as accepted
    fn on_success(&self, info: &ChallengeData);

    /// The realm reported an unrecoverable failure
    fn on_failure(&self, info: &ChallengeData);
}

/// Handle a delegate uses to resolve the challenge it was given
pub struct ChallengeContext {
    handler: Arc<ChallengeHandler>,
}

impl ChallengeContext {
    /// Realm this challenge belongs to
    pub fn realm(&self) -> &str {
        self.handler.realm()
    }

    /// Answer the active challenge, or cancel it with `None`
    pub fn submit_challenge_answer(&self, answer: Option<ChallengeData>) {
        self.handler.submit_challenge_answer(answer);
    }

    /// Report the challenge as completed successfully
    pub fn submit_success(&self) {
        self.handler.submit_success();
    }

    /// Report the challenge as failed
    pub fn submit_failure(&self, info: Option<&ChallengeData>) {
        self.handler.submit_failure(info);
    }
}

struct HandlerState {
    active: Option<Arc<dyn AuthorizationRequest>>,
    waiting: Vec<Arc<dyn AuthorizationRequest>>,
}

/// Serializes challenge traffic for a single realm.
///
/// The first request to hit a challenge becomes active and is surfaced to
/// the delegate; concurrent requests for the same realm queue up and are
/// released without delegate involvement once the active one resolves.
pub struct ChallengeHandler {
    realm: String,
    delegate: Arc<dyn AuthenticationDelegate>,
    state: Mutex<HandlerState>,
}

impl ChallengeHandler {
    /// Create a handler for `realm` backed by `delegate`
    pub fn new(realm: impl Into<String>, delegate: Arc<dyn AuthenticationDelegate>) -> Self {
        Self {
            realm: realm.into(),
            delegate,
            state: Mutex::new(HandlerState {
                active: None,
                waiting: Vec::new(),
            }),
        }
    }

    /// Realm this handler serves
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Route an incoming challenge for `request`.
    ///
    /// If no request is active, `request` becomes active and the delegate is
    /// invoked with the challenge. Otherwise the request joins the waiting
    /// queue and sees nothing until the active one resolves.
    pub fn handle_challenge(
        self: &Arc<Self>,
        request: Arc<dyn AuthorizationRequest>,
        challenge: &ChallengeData,
    ) {
        let became_active = {
            let mut state = self.state.lock();
            if state.active.is_none() {
                state.active = Some(request);
                true
            } else {
                state.waiting.push(request);
                false
            }
        };

        if became_active {
            debug!(realm = %self.realm, "delivering challenge to delegate");
            let context = ChallengeContext {
                handler: self.clone(),
            };
            // outside the lock: the delegate may answer synchronously
            self.delegate.on_challenge_received(&context, challenge);
        } else {
            debug!(realm = %self.realm, "challenge queued behind active request");
        }
    }

    /// Forward the delegate's answer to the active request.
    ///
    /// `Some` submits the answer, `None` cancels by releasing the request.
    /// Either way the active slot is cleared; waiting requests stay queued
    /// until the realm reports success or failure.
    pub fn submit_challenge_answer(&self, answer: Option<ChallengeData>) {
        let active = self.state.lock().active.take();
        let Some(request) = active else {
            debug!(realm = %self.realm, "answer submitted with no active request");
            return;
        };

        match answer {
            Some(answer) => request.submit_answer(&self.realm, &answer),
            None => request.remove_expected_answer(&self.realm),
        }
    }

    /// The delegate resolved the challenge without the realm round trip:
    /// release the active request and everything waiting behind it.
    pub fn submit_success(&self) {
        let (active, waiting) = self.take_all();
        if let Some(request) = active {
            request.remove_expected_answer(&self.realm);
        }
        release(&self.realm, waiting);
    }

    /// The delegate gave up on the challenge. The active request is failed;
    /// waiting requests are released to proceed and fail on their own terms.
    pub fn submit_failure(&self, info: Option<&ChallengeData>) {
        let (active, waiting) = self.take_all();
        if let Some(request) = active {
            request.request_failed(info);
        }
        release(&self.realm, waiting);
    }

    /// The realm accepted the last answer: notify the delegate and release
    /// every parked request.
    pub fn handle_success(&self, info: &ChallengeData) {
        let (_, waiting) = self.take_all();
        self.delegate.on_success(info);
        release(&self.realm, waiting);
    }

    /// The realm rejected the exchange: notify the delegate and drop all
    /// state. Waiting requests are discarded, not released, so they do not
    /// retry against a realm that just refused.
    pub fn handle_failure(&self, info: &ChallengeData) {
        {
            let mut state = self.state.lock();
            state.active = None;
            state.waiting.clear();
        }
        self.delegate.on_failure(info);
    }

    /// True when no request is active or waiting
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.active.is_none() && state.waiting.is_empty()
    }

    /// Number of requests parked behind the active one
    pub fn waiting_count(&self) -> usize {
        self.state.lock().waiting.len()
    }

    fn take_all(
        &self,
    ) -> (
        Option<Arc<dyn AuthorizationRequest>>,
        Vec<Arc<dyn AuthorizationRequest>>,
    ) {
        let mut state = self.state.lock();
        (state.active.take(), std::mem::take(&mut state.waiting))
    }
}

fn release(realm: &str, waiting: Vec<Arc<dyn AuthorizationRequest>>) {
    if !waiting.is_empty() {
        debug!(realm = %realm, count = waiting.len(), "releasing waiting requests");
    }
    for request in waiting {
        request.remove_expected_answer(realm);
    }
}
