//! In-memory payment gateway for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::SessionId;

use super::{
    CheckoutSession, CreateSessionRequest, GatewayError, PaymentGateway, PaymentStatus,
};

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    sessions: HashMap<SessionId, CheckoutSession>,
    requests: Vec<CreateSessionRequest>,
    next_id: u32,
    create_calls: usize,
    retrieve_calls: usize,
    fail_on_create: bool,
    fail_on_retrieve: bool,
    auto_pay: bool,
}

/// In-memory payment gateway.
///
/// Sessions start `unpaid`; tests flip them with [`InMemoryGateway::mark_paid`],
/// or enable auto-pay so every new session is immediately paid.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway whose sessions are paid as soon as they're created.
    pub fn auto_paying() -> Self {
        let gateway = Self::new();
        gateway.state.write().unwrap().auto_pay = true;
        gateway
    }

    /// Configures the gateway to fail on session creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the gateway to fail on session retrieval.
    pub fn set_fail_on_retrieve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_retrieve = fail;
    }

    /// Marks a session as paid. Returns false if the session is unknown.
    pub fn mark_paid(&self, session_id: &SessionId) -> bool {
        self.set_payment_status(session_id, PaymentStatus::Paid)
    }

    /// Sets a session's payment status. Returns false if the session is unknown.
    pub fn set_payment_status(&self, session_id: &SessionId, status: PaymentStatus) -> bool {
        let mut state = self.state.write().unwrap();
        match state.sessions.get_mut(session_id) {
            Some(session) => {
                session.payment_status = status;
                true
            }
            None => false,
        }
    }

    /// Inserts or replaces a session as-is.
    pub fn insert_session(&self, session: CheckoutSession) {
        self.state
            .write()
            .unwrap()
            .sessions
            .insert(session.id.clone(), session);
    }

    /// Returns the number of create calls received, including failed ones.
    pub fn create_count(&self) -> usize {
        self.state.read().unwrap().create_calls
    }

    /// Returns the number of retrieve calls received, including failed ones.
    pub fn retrieve_count(&self) -> usize {
        self.state.read().unwrap().retrieve_calls
    }

    /// Returns the most recent session creation request.
    pub fn last_request(&self) -> Option<CreateSessionRequest> {
        self.state.read().unwrap().requests.last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state.write().unwrap();
        state.create_calls += 1;

        if state.fail_on_create {
            return Err(GatewayError::Api {
                status: 502,
                message: "Gateway unavailable".to_string(),
            });
        }

        state.next_id += 1;
        let id = SessionId::new(format!("cs_test_{:04}", state.next_id));
        let session = CheckoutSession {
            url: Some(format!("https://checkout.test/pay/{id}")),
            payment_status: if state.auto_pay {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Unpaid
            },
            amount_total: Some(request.amount_total()),
            metadata: request.metadata.clone(),
            id,
        };

        state.requests.push(request);
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &SessionId,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state.write().unwrap();
        state.retrieve_calls += 1;

        if state.fail_on_retrieve {
            return Err(GatewayError::Api {
                status: 502,
                message: "Gateway unavailable".to_string(),
            });
        }

        state
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.clone()))
    }
}
