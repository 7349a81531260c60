//! The Transport Driver: the single-task state-machine loop that owns
//! one instance's transport handle, timers, and accumulated buffers
//! from `perform()` to teardown.

use tokio::sync::watch;

use crate::body;
use crate::config::RequestConfig;
use crate::error::RequestError;
use crate::response::{self, HttpResponse};
use crate::state::{ClientState, StateCell};
use crate::timeout::{TimeoutController, TimerKind};
use crate::transport::{self, TcpTransport, Transport, WRITE_CHUNK_SIZE};

/// What ended the drive loop. Distinct from `RequestError` because a
/// successful response and a cancellation both need to flow through
/// the same settlement path as an error would.
enum Cause {
    Ok(HttpResponse),
    Cancelled,
    Error(RequestError),
}

/// Runs the whole lifecycle of one request: connect, write, read,
/// assemble, then settle the perform/cancel channels exactly once.
/// Spawned as its own task per instance; `request_id`/`method` are
/// attached to every event in the span for correlation.
#[tracing::instrument(skip_all, fields(request_id = %request_id, method = %config.method))]
pub async fn run(
    config: RequestConfig,
    request_id: uuid::Uuid,
    state: StateCell,
    result_tx: watch::Sender<Option<Result<HttpResponse, RequestError>>>,
    mut cancel_rx: watch::Receiver<bool>,
    cancel_ack_tx: watch::Sender<Option<bool>>,
) {
    let origin = config.origin();
    let cause = drive(&config, &origin, &mut cancel_rx).await;

    // Mandated scheduler yield between teardown (the transport and
    // timers are already dropped by the time `drive` returns) and
    // settlement, so no caller can observe a terminal state and an
    // unsettled future in the same poll.
    tokio::task::yield_now().await;

    // `cancel()` may have already moved the state to CANCELLING while
    // `drive()` was mid-flight. If the transport operation itself won
    // that race (a completed read/write beats the cancel signal under
    // `race()`'s `biased` select), `cause` still reports Ok/Error even
    // though the externally observed state is already CANCELLING. Only
    // the CAS from REQUESTING decides which cause actually gets to
    // settle; losing it here means cancellation won and this finalizes
    // as CANCELLED regardless of what `drive()` returned.
    match cause {
        Cause::Ok(response) => {
            if state.try_transition(ClientState::Requesting, ClientState::Fulfilled) {
                tracing::info!(status = response.status_code, "request fulfilled");
                let _ = result_tx.send(Some(Ok(response)));
            } else {
                finalize_cancelled(&state, &result_tx, &cancel_ack_tx, origin);
            }
        }
        Cause::Error(err) => {
            if state.try_transition(ClientState::Requesting, ClientState::Failed) {
                tracing::error!(error = %err, "request failed");
                let _ = result_tx.send(Some(Err(err)));
            } else {
                finalize_cancelled(&state, &result_tx, &cancel_ack_tx, origin);
            }
        }
        Cause::Cancelled => {
            finalize_cancelled(&state, &result_tx, &cancel_ack_tx, origin);
        }
    }
}

/// Settle as CANCELLED: the one path reachable whenever the state is
/// already CANCELLING by the time the drive loop ends, whether that's
/// because `drive()` itself observed the cancel signal or because
/// cancellation won the race against an operation that finished
/// underneath it.
fn finalize_cancelled(
    state: &StateCell,
    result_tx: &watch::Sender<Option<Result<HttpResponse, RequestError>>>,
    cancel_ack_tx: &watch::Sender<Option<bool>>,
    origin: String,
) {
    state.set(ClientState::Cancelled);
    tracing::warn!("request cancelled");
    let _ = result_tx.send(Some(Err(RequestError::HttpRequestCancelled { origin })));
    let _ = cancel_ack_tx.send(Some(true));
}

async fn drive(config: &RequestConfig, origin: &str, cancel_rx: &mut watch::Receiver<bool>) -> Cause {
    let mut timeouts = TimeoutController::new(config.timeout());

    let mut transport: Box<dyn Transport> = tokio::select! {
        biased;
        res = TcpTransport::connect(config, origin) => match res {
            Ok(t) => Box::new(t),
            Err(e) => return Cause::Error(e),
        },
        _ = wait_for_cancel(cancel_rx) => return Cause::Cancelled,
    };

    let body_bytes = match body::encode(config.body.as_ref(), config.body_encoding, origin) {
        Ok(b) => b,
        Err(e) => return Cause::Error(e),
    };
    let content_length = body_bytes.as_ref().map(Vec::len).unwrap_or(0);
    let head = transport::build_request_head(config, Some(content_length));

    timeouts.arm_request();

    match race(transport.write_head(&head, origin), cancel_rx, &timeouts).await {
        RaceOutcome::Done(Ok(())) => {}
        RaceOutcome::Done(Err(e)) => return Cause::Error(e),
        RaceOutcome::Cancelled => return Cause::Cancelled,
        RaceOutcome::TimedOut(kind) => return Cause::Error(timeout_error(kind, origin, config)),
    }
    tracing::trace!(bytes = head.len(), "wrote request head");

    if let Some(bytes) = body_bytes {
        for chunk in bytes.chunks(WRITE_CHUNK_SIZE) {
            match race(transport.write_body_chunk(chunk, origin), cancel_rx, &timeouts).await {
                RaceOutcome::Done(Ok(())) => {
                    timeouts.refresh_request();
                    tracing::trace!(bytes = chunk.len(), "wrote request body chunk");
                }
                RaceOutcome::Done(Err(e)) => return Cause::Error(e),
                RaceOutcome::Cancelled => return Cause::Cancelled,
                RaceOutcome::TimedOut(kind) => return Cause::Error(timeout_error(kind, origin, config)),
            }
        }
    }

    match race(transport.finish_write(origin), cancel_rx, &timeouts).await {
        RaceOutcome::Done(Ok(())) => {}
        RaceOutcome::Done(Err(e)) => return Cause::Error(e),
        RaceOutcome::Cancelled => return Cause::Cancelled,
        RaceOutcome::TimedOut(kind) => return Cause::Error(timeout_error(kind, origin, config)),
    }

    timeouts.clear_request_arm_response();

    let head = match race(transport.read_head(origin), cancel_rx, &timeouts).await {
        RaceOutcome::Done(Ok(head)) => head,
        RaceOutcome::Done(Err(e)) => return Cause::Error(e),
        RaceOutcome::Cancelled => return Cause::Cancelled,
        RaceOutcome::TimedOut(kind) => return Cause::Error(timeout_error(kind, origin, config)),
    };
    tracing::trace!(status = head.status_code, "received response head");

    let mut body = Vec::new();
    loop {
        let chunk = match race(transport.read_body_chunk(origin), cancel_rx, &timeouts).await {
            RaceOutcome::Done(Ok(chunk)) => chunk,
            RaceOutcome::Done(Err(e)) => return Cause::Error(e),
            RaceOutcome::Cancelled => return Cause::Cancelled,
            RaceOutcome::TimedOut(kind) => return Cause::Error(timeout_error(kind, origin, config)),
        };
        if chunk.is_empty() {
            break;
        }
        tracing::trace!(bytes = chunk.len(), "read response body chunk");
        body.extend_from_slice(&chunk);
        timeouts.refresh_response();
    }

    timeouts.clear();

    match response::assemble(
        head.status_code,
        head.status_message,
        head.headers,
        body,
        config.auto_json_response_parse,
        origin,
    ) {
        Ok(response) => Cause::Ok(response),
        Err(e) => Cause::Error(e),
    }
}

enum RaceOutcome<T> {
    Done(T),
    Cancelled,
    TimedOut(TimerKind),
}

/// Race a transport operation against cancellation and the currently
/// armed timer. A completed operation wins a simultaneous wakeup over
/// either the cancel signal or the timer, per the tie-break rule.
async fn race<T>(
    op: impl std::future::Future<Output = T>,
    cancel_rx: &mut watch::Receiver<bool>,
    timeouts: &TimeoutController,
) -> RaceOutcome<T> {
    tokio::select! {
        biased;
        res = op => RaceOutcome::Done(res),
        _ = wait_for_cancel(cancel_rx) => RaceOutcome::Cancelled,
        kind = timeouts.fired() => RaceOutcome::TimedOut(kind),
    }
}

/// Resolves once a cancellation has been signalled; never resolves
/// otherwise, including if the sender side is dropped without ever
/// cancelling (the instance simply runs to natural completion).
async fn wait_for_cancel(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn timeout_error(kind: TimerKind, origin: &str, config: &RequestConfig) -> RequestError {
    match kind {
        TimerKind::Request => RequestError::HttpRequestTimedOut {
            origin: origin.to_string(),
            timeout_ms: config.timeout_ms,
        },
        TimerKind::Response => RequestError::HttpResponseTimedOut {
            origin: origin.to_string(),
            timeout_ms: config.timeout_ms,
        },
    }
}
