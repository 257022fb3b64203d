//! Message channel between the embedded tool and its host page.
//!
//! Carries two logical services: `config` (a JSON-encoded configuration
//! delivered once, host → tool) and `resize` (a stringified pixel height,
//! tool → host). This is the in-process stand-in for the original
//! cross-frame transport; both ends hold the same `HostChannel` and read
//! from the receiver for their direction.

use tokio::sync::mpsc;
use tracing::info;
use voterinfo_core::ChannelError;

/// Services carried over the host channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Config,
    Resize,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Config => "config",
            Service::Resize => "resize",
        }
    }
}

/// Duplex channel between host page and embedded tool.
pub struct HostChannel {
    config_tx: tokio::sync::Mutex<Option<mpsc::Sender<String>>>,
    resize_tx: tokio::sync::Mutex<Option<mpsc::Sender<String>>>,
}

impl Default for HostChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl HostChannel {
    pub fn new() -> Self {
        Self {
            config_tx: tokio::sync::Mutex::new(None),
            resize_tx: tokio::sync::Mutex::new(None),
        }
    }

    /// Open the tool-side end of the `config` service. Payloads injected by
    /// the host arrive on the returned receiver.
    pub async fn open_config(&self) -> mpsc::Receiver<String> {
        info!(service = Service::Config.as_str(), "Host channel service opened");
        let (tx, rx) = mpsc::channel(8);
        *self.config_tx.lock().await = Some(tx);
        rx
    }

    /// Open the host-side end of the `resize` service. Height reports sent
    /// by the tool arrive on the returned receiver.
    pub async fn open_resize(&self) -> mpsc::Receiver<String> {
        info!(service = Service::Resize.as_str(), "Host channel service opened");
        let (tx, rx) = mpsc::channel(8);
        *self.resize_tx.lock().await = Some(tx);
        rx
    }

    /// Host side: deliver a JSON configuration payload to the tool.
    pub async fn inject_config(&self, payload: &str) -> Result<(), ChannelError> {
        self.send(&self.config_tx, Service::Config, payload.to_string())
            .await
    }

    /// Tool side: report the current content height to the host.
    pub async fn send_resize(&self, height: u32) -> Result<(), ChannelError> {
        self.send(&self.resize_tx, Service::Resize, height.to_string())
            .await
    }

    async fn send(
        &self,
        slot: &tokio::sync::Mutex<Option<mpsc::Sender<String>>>,
        service: Service,
        payload: String,
    ) -> Result<(), ChannelError> {
        let guard = slot.lock().await;
        let Some(tx) = guard.as_ref() else {
            return Err(ChannelError::NotConnected(service.as_str().into()));
        };
        tx.send(payload)
            .await
            .map_err(|_| ChannelError::DeliveryFailed {
                service: service.as_str().into(),
                reason: "receiver dropped".into(),
            })
    }

    /// Tear down both services.
    pub async fn close(&self) {
        info!("Host channel closing");
        *self.config_tx.lock().await = None;
        *self.resize_tx.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn config_payload_flows_host_to_tool() {
        let channel = HostChannel::new();
        let mut rx = channel.open_config().await;

        channel.inject_config(r#"{"election_id": "5000"}"#).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), r#"{"election_id": "5000"}"#);
    }

    #[tokio::test]
    async fn resize_report_flows_tool_to_host() {
        let channel = HostChannel::new();
        let mut rx = channel.open_resize().await;

        channel.send_resize(768).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "768");
    }

    #[tokio::test]
    async fn send_before_open_reports_not_connected() {
        let channel = HostChannel::new();
        let result = channel.send_resize(100).await;
        assert!(matches!(result, Err(ChannelError::NotConnected(_))));
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let channel = HostChannel::new();
        let _rx = channel.open_resize().await;
        channel.close().await;
        assert!(channel.send_resize(100).await.is_err());
    }

    #[tokio::test]
    async fn dropped_receiver_reports_delivery_failure() {
        let channel = HostChannel::new();
        let rx = channel.open_config().await;
        drop(rx);
        let result = channel.inject_config("{}").await;
        assert!(matches!(
            result,
            Err(ChannelError::DeliveryFailed { .. })
        ));
    }
}
