//! Bridge worker: blocking vendor call to async channel.
//!
//! The vendor call blocks for the full duration of generation, so it runs
//! on a dedicated blocking task. Frames, the terminal sentinel and the
//! error marker all travel through one unbounded channel; nothing else
//! crosses the boundary.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::app::{AppClient, AppFrame, AppRequest};
use crate::error::{ChatError, Result};

/// One item relayed from the worker to the consumer loop.
#[derive(Debug)]
pub enum BridgeMessage {
    Frame(AppFrame),
    /// Vendor stream exhausted normally.
    Done,
    /// Call failed and retries (if any were allowed) are spent.
    Failed(ChatError),
}

/// Retry policy for the vendor call.
///
/// Retrying is only safe before any frame has been delivered: partial
/// output has already reached the client, and a second call would repeat
/// visible text.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Start the vendor call on a blocking task and return the consumer end of
/// the channel.
///
/// The worker is never cancelled: if the consumer drops the receiver early
/// the call runs to completion in the background and its sends go nowhere.
pub fn spawn_bridge(
    client: Arc<dyn AppClient>,
    request: AppRequest,
    config: BridgeConfig,
) -> mpsc::UnboundedReceiver<BridgeMessage> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || {
        for attempt in 0..=config.max_retries {
            let mut delivered = false;
            match run_call(client.as_ref(), &request, &tx, &mut delivered) {
                Ok(()) => {
                    let _ = tx.send(BridgeMessage::Done);
                    return;
                }
                Err(err) => {
                    if !delivered && attempt < config.max_retries {
                        tracing::warn!(
                            provider = client.name(),
                            attempt = attempt + 1,
                            error = %err,
                            "Vendor call failed before first frame, retrying"
                        );
                        std::thread::sleep(config.retry_delay);
                        continue;
                    }

                    tracing::error!(
                        provider = client.name(),
                        attempt = attempt + 1,
                        delivered,
                        error = %err,
                        "Vendor call failed"
                    );
                    let _ = tx.send(BridgeMessage::Failed(err));
                    return;
                }
            }
        }
    });

    rx
}

fn run_call(
    client: &dyn AppClient,
    request: &AppRequest,
    tx: &mpsc::UnboundedSender<BridgeMessage>,
    delivered: &mut bool,
) -> Result<()> {
    let frames = client.call(request)?;
    for frame in frames {
        let frame = frame?;
        *delivered = true;
        let _ = tx.send(BridgeMessage::Frame(frame));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::mock::{MockAppClient, MockCall, MockStep};

    fn fast_config() -> BridgeConfig {
        BridgeConfig {
            max_retries: 2,
            retry_delay: Duration::from_millis(1),
        }
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<BridgeMessage>) -> Vec<BridgeMessage> {
        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn frames_then_done_sentinel() {
        let client = Arc::new(MockAppClient::single(vec![
            MockStep::text("He"),
            MockStep::text("Hello"),
        ]));
        let rx = spawn_bridge(client, AppRequest::new("q", None), fast_config());

        let messages = drain(rx).await;
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], BridgeMessage::Frame(_)));
        assert!(matches!(messages[2], BridgeMessage::Done));
    }

    #[tokio::test]
    async fn retries_before_first_frame() {
        let client = Arc::new(MockAppClient::new(vec![
            MockCall::ConnectError("boom".to_string()),
            MockCall::ConnectError("boom again".to_string()),
            MockCall::Frames(vec![MockStep::text("ok")]),
        ]));
        let rx = spawn_bridge(client.clone(), AppRequest::new("q", None), fast_config());

        let messages = drain(rx).await;
        assert!(matches!(messages[0], BridgeMessage::Frame(_)));
        assert!(matches!(messages[1], BridgeMessage::Done));
        assert_eq!(client.remaining_calls(), 0);
    }

    #[tokio::test]
    async fn gives_up_when_retries_are_spent() {
        let client = Arc::new(MockAppClient::new(vec![
            MockCall::ConnectError("1".to_string()),
            MockCall::ConnectError("2".to_string()),
            MockCall::ConnectError("3".to_string()),
            MockCall::Frames(vec![MockStep::text("never reached")]),
        ]));
        let rx = spawn_bridge(client.clone(), AppRequest::new("q", None), fast_config());

        let messages = drain(rx).await;
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], BridgeMessage::Failed(_)));
        // the fourth scripted call must remain untouched
        assert_eq!(client.remaining_calls(), 1);
    }

    #[tokio::test]
    async fn no_retry_after_first_frame() {
        let client = Arc::new(MockAppClient::new(vec![
            MockCall::Frames(vec![
                MockStep::text("partial"),
                MockStep::StreamError("connection reset".to_string()),
            ]),
            MockCall::Frames(vec![MockStep::text("would duplicate")]),
        ]));
        let rx = spawn_bridge(client.clone(), AppRequest::new("q", None), fast_config());

        let messages = drain(rx).await;
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], BridgeMessage::Frame(_)));
        assert!(matches!(messages[1], BridgeMessage::Failed(_)));
        assert_eq!(client.remaining_calls(), 1);
    }
}
