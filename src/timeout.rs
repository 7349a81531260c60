//! The two mutually-exclusive idle timers that bound the pre-response
//! and post-response phases of one request.

use std::time::Duration;

use tokio::time::{sleep_until, Instant, Sleep};

/// Which of the two timers fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Request,
    Response,
}

#[derive(Clone, Copy)]
enum Armed {
    Idle,
    Request(Instant),
    Response(Instant),
}

/// Owns at most one armed deadline at a time. `arm_request`/`arm_response`
/// assert the prior state, since the driver is the only caller and the
/// component design guarantees the two timers never overlap.
pub struct TimeoutController {
    timeout: Duration,
    armed: Armed,
}

impl TimeoutController {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            armed: Armed::Idle,
        }
    }

    pub fn arm_request(&mut self) {
        debug_assert!(matches!(self.armed, Armed::Idle));
        self.armed = Armed::Request(Instant::now() + self.timeout);
    }

    pub fn refresh_request(&mut self) {
        if matches!(self.armed, Armed::Request(_)) {
            self.armed = Armed::Request(Instant::now() + self.timeout);
        }
    }

    /// Clear the request-phase timer and immediately arm the
    /// response-phase one, so there is never an observable instant with
    /// neither timer armed while the request is in flight.
    pub fn clear_request_arm_response(&mut self) {
        debug_assert!(matches!(self.armed, Armed::Request(_)));
        self.armed = Armed::Response(Instant::now() + self.timeout);
    }

    pub fn refresh_response(&mut self) {
        if matches!(self.armed, Armed::Response(_)) {
            self.armed = Armed::Response(Instant::now() + self.timeout);
        }
    }

    pub fn clear(&mut self) {
        self.armed = Armed::Idle;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.armed, Armed::Idle)
    }

    /// Resolve when the currently-armed timer fires. Never resolves if
    /// idle — the driver only ever polls this inside a `select!` branch
    /// alongside transport events, so an idle controller simply never
    /// wins the race.
    pub async fn fired(&self) -> TimerKind {
        match self.armed {
            Armed::Idle => std::future::pending().await,
            Armed::Request(deadline) => {
                sleep_for(deadline).await;
                TimerKind::Request
            }
            Armed::Response(deadline) => {
                sleep_for(deadline).await;
                TimerKind::Response
            }
        }
    }
}

fn sleep_for(deadline: Instant) -> Sleep {
    sleep_until(deadline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn idle_never_fires() {
        let controller = TimeoutController::new(Duration::from_millis(10));
        tokio::select! {
            _ = controller.fired() => panic!("idle timer must never fire"),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }
    }

    #[tokio::test]
    async fn request_timer_fires_after_deadline() {
        let mut controller = TimeoutController::new(Duration::from_millis(20));
        controller.arm_request();
        let kind = controller.fired().await;
        assert_eq!(kind, TimerKind::Request);
    }

    #[tokio::test]
    async fn refresh_postpones_firing() {
        let mut controller = TimeoutController::new(Duration::from_millis(30));
        controller.arm_request();
        tokio::time::sleep(Duration::from_millis(15)).await;
        controller.refresh_request();
        tokio::select! {
            _ = controller.fired() => panic!("timer fired before refreshed deadline"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
    }

    #[test]
    fn exclusive_by_construction() {
        let mut controller = TimeoutController::new(Duration::from_millis(10));
        assert!(controller.is_idle());
        controller.arm_request();
        assert!(!controller.is_idle());
        controller.clear_request_arm_response();
        assert!(matches!(controller.armed, Armed::Response(_)));
        controller.clear();
        assert!(controller.is_idle());
    }
}
