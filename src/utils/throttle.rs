#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use log::debug;
use poem::{Endpoint, Middleware, Request, Result};

// ***************************************************************************
//                             Throttle Middleware
// ***************************************************************************
/** Delay every request passing through the wrapped endpoint by the minimum
 * spacing implied by a requests-per-minute ceiling.
 *
 * The delay only holds up the task serving the request.  Requests served
 * concurrently by other tasks are not serialized against each other, so the
 * ceiling limits each handler's pace rather than the server's aggregate
 * throughput.  No per-client state is kept.
 */
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    spacing: Duration,
}

impl Throttle {
    /** A zero ceiling disables throttling. */
    pub fn per_minute(max_per_minute: u32) -> Self {
        let spacing = if max_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(60.0 / max_per_minute as f64)
        };
        Self {spacing}
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }
}

impl<E: Endpoint> Middleware<E> for Throttle {
    type Output = ThrottleEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        ThrottleEndpoint {inner: ep, spacing: self.spacing}
    }
}

pub struct ThrottleEndpoint<E> {
    inner: E,
    spacing: Duration,
}

impl<E: Endpoint> Endpoint for ThrottleEndpoint<E> {
    type Output = E::Output;

    async fn call(&self, req: Request) -> Result<Self::Output> {
        if !self.spacing.is_zero() {
            let start = Instant::now();
            tokio::time::sleep(self.spacing).await;
            debug!("Throttled {} {} for {:?}.", req.method(), req.uri().path(), start.elapsed());
        }
        self.inner.call(req).await
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use poem::{handler, test::TestClient, EndpointExt};

    #[test]
    fn spacing_from_ceiling() {
        assert_eq!(Throttle::per_minute(120).spacing(), Duration::from_millis(500));
        assert_eq!(Throttle::per_minute(60).spacing(), Duration::from_secs(1));
        assert_eq!(Throttle::per_minute(0).spacing(), Duration::ZERO);
    }

    #[handler]
    fn ping() -> &'static str {
        "pong"
    }

    #[tokio::test]
    async fn delays_before_the_handler() {
        let cli = TestClient::new(ping.with(Throttle::per_minute(600)));
        let start = Instant::now();
        let resp = cli.get("/").send().await;
        resp.assert_status_is_ok();
        resp.assert_text("pong").await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
