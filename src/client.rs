//! The public `HttpRequest` instance: one constructor plus `perform()`,
//! `cancel()`, and `state()`, wired to the Transport Driver.

use std::future::Future;
use std::sync::OnceLock;

use tokio::sync::watch;
use uuid::Uuid;

use crate::config::RequestConfig;
use crate::driver;
use crate::error::{RequestError, StateError};
use crate::response::HttpResponse;
use crate::state::{ClientState, StateCell};

type Settlement = Option<Result<HttpResponse, RequestError>>;

struct Inner {
    result_rx: watch::Receiver<Settlement>,
    cancel_tx: watch::Sender<bool>,
    cancel_ack_rx: watch::Receiver<Option<bool>>,
}

/// One outbound request and its lifecycle. Constructed via
/// [`RequestConfig`]; drives to a terminal state exactly once.
pub struct HttpRequest {
    config: RequestConfig,
    request_id: Uuid,
    state: StateCell,
    inner: OnceLock<Inner>,
}

impl HttpRequest {
    pub fn new(config: RequestConfig) -> Self {
        Self {
            config,
            request_id: Uuid::new_v4(),
            state: StateCell::new(),
            inner: OnceLock::new(),
        }
    }

    /// The instance's current lifecycle state, observable synchronously
    /// from any task.
    pub fn state(&self) -> ClientState {
        self.state.get()
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Drive the request to completion. Idempotent while `REQUESTING`:
    /// every caller observes the same settlement. Fails synchronously
    /// with [`StateError::MakeRequestUnavailable`] outside
    /// `CREATED`/`REQUESTING`.
    pub fn perform(&self) -> Result<impl Future<Output = Result<HttpResponse, RequestError>> + '_, StateError> {
        match self.state.get() {
            ClientState::Created => {
                if self.state.try_transition(ClientState::Created, ClientState::Requesting) {
                    tracing::debug!(request_id = %self.request_id, from = "CREATED", to = "REQUESTING", "state transition");
                }
                let inner = self.inner.get_or_init(|| self.spawn());
                Ok(Self::watch_result(inner.result_rx.clone(), self.config.origin()))
            }
            ClientState::Requesting => {
                let inner = self.inner.get_or_init(|| self.spawn());
                Ok(Self::watch_result(inner.result_rx.clone(), self.config.origin()))
            }
            _ => Err(StateError::MakeRequestUnavailable),
        }
    }

    /// Abort the request in flight. Idempotent while `CANCELLING`.
    /// Fails synchronously with [`StateError::CancelRequestUnavailable`]
    /// outside `REQUESTING`/`CANCELLING`.
    pub fn cancel(&self) -> Result<impl Future<Output = bool> + '_, StateError> {
        match self.state.get() {
            ClientState::Requesting => {
                if self
                    .state
                    .try_transition(ClientState::Requesting, ClientState::Cancelling)
                {
                    tracing::debug!(request_id = %self.request_id, from = "REQUESTING", to = "CANCELLING", "state transition");
                }
                if let Some(inner) = self.inner.get() {
                    let _ = inner.cancel_tx.send(true);
                }
                Ok(self.watch_cancel_ack())
            }
            ClientState::Cancelling => Ok(self.watch_cancel_ack()),
            _ => Err(StateError::CancelRequestUnavailable),
        }
    }

    fn spawn(&self) -> Inner {
        let (result_tx, result_rx) = watch::channel::<Settlement>(None);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (cancel_ack_tx, cancel_ack_rx) = watch::channel(None);

        let config = self.config.clone();
        let request_id = self.request_id;
        let state = self.state.clone();
        tokio::spawn(driver::run(config, request_id, state, result_tx, cancel_rx, cancel_ack_tx));

        Inner {
            result_rx,
            cancel_tx,
            cancel_ack_rx,
        }
    }

    async fn watch_result(mut rx: watch::Receiver<Settlement>, origin: String) -> Result<HttpResponse, RequestError> {
        loop {
            if let Some(settled) = rx.borrow_and_update().clone() {
                return settled;
            }
            if rx.changed().await.is_err() {
                return Err(RequestError::unknown(origin, "driver task ended without settling"));
            }
        }
    }

    async fn watch_cancel_ack(&self) -> bool {
        // Only reachable once `inner` is set: both branches that return
        // this future require the state to already be CANCELLING, which
        // only happens after a successful REQUESTING transition that
        // itself requires `inner` to exist.
        let Some(inner) = self.inner.get() else {
            return false;
        };
        let mut rx = inner.cancel_ack_rx.clone();
        loop {
            if let Some(ack) = *rx.borrow_and_update() {
                return ack;
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    }
}
