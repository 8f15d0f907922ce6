//! Indefinite connect retry with a fixed back-off
//!
//! Connect failures at startup are never fatal: the encoder keeps retrying
//! every half second until the session comes up or a stop is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::session::{ConnectParams, Connector, Session};

pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Retry `connector.connect` until it succeeds or `stop` is set.
///
/// Returns `None` only when stopped.
pub async fn connect_with_retry(
    connector: &dyn Connector,
    params: &ConnectParams,
    stop: &AtomicBool,
) -> Option<Arc<dyn Session>> {
    loop {
        if stop.load(Ordering::SeqCst) {
            return None;
        }

        match connector.connect(params).await {
            Ok(session) => return Some(session),
            Err(err) => {
                tracing::warn!(
                    host = %params.host,
                    port = params.port,
                    "failed to establish an SRT connection: {err}. Retrying..."
                );
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }
}
