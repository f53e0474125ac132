use futures_util::future::BoxFuture;
use sentinel_cam_common::config::NotifyConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("push service returned status {0}")]
    Status(u16),
}

/// Outbound push-notification capability. Best-effort: callers spawn the
/// returned future and log failures, nothing in the pipeline waits on it.
pub trait Notifier: Send + Sync {
    fn send(&self, message: String, title: String) -> BoxFuture<'static, Result<(), NotifyError>>;
}

/// Pushover-style notifier: one JSON POST per message, bounded timeout.
pub struct PushNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
    user_key: String,
}

impl PushNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(NotifyError::ClientBuild)?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            user_key: config.user_key.clone(),
        })
    }
}

impl Notifier for PushNotifier {
    fn send(&self, message: String, title: String) -> BoxFuture<'static, Result<(), NotifyError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let payload = serde_json::json!({
            "token": self.api_token,
            "user": self.user_key,
            "title": title,
            "message": message,
        });
        Box::pin(async move {
            let response = client.post(&endpoint).json(&payload).send().await?;
            if !response.status().is_success() {
                return Err(NotifyError::Status(response.status().as_u16()));
            }
            Ok(())
        })
    }
}

/// Notifier used when no push credentials are configured.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, message: String, title: String) -> BoxFuture<'static, Result<(), NotifyError>> {
        tracing::debug!(title, message, "notifications disabled, dropping");
        Box::pin(async { Ok(()) })
    }
}

/// Build the configured notifier. Falls back to [`NullNotifier`] when
/// credentials are missing.
pub fn build_notifier(config: &NotifyConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    if config.api_token.is_empty() || config.user_key.is_empty() {
        info!("push credentials not configured, notifications disabled");
        return Ok(Arc::new(NullNotifier));
    }
    info!(endpoint = config.endpoint, "push notifications enabled");
    Ok(Arc::new(PushNotifier::new(config)?))
}

/// Fire-and-forget dispatch used by the device controller and snapshot path.
/// A failed send is logged and swallowed; it never affects pipeline state.
pub fn send_detached(notifier: &Arc<dyn Notifier>, message: String, title: String) {
    let future = notifier.send(message, title.clone());
    tokio::spawn(async move {
        if let Err(e) = future.await {
            warn!(error = %e, title, "push notification failed");
        }
    });
}
