//! Webhook-backed chat notification channel.
//!
//! Posts alerts as JSON to a configured webhook endpoint (e.g. a Slack or
//! Discord incoming webhook).

use crate::{AlertError, ChannelKind, NotificationChannel};
use async_trait::async_trait;
use deployer_types::Alert;
use reqwest::Client;
use std::time::Duration;

/// Chat channel that delivers alerts through an HTTP webhook.
pub struct WebhookChatChannel {
	client: Client,
	url: String,
}

impl WebhookChatChannel {
	/// Creates a channel posting to the given webhook URL.
	pub fn new(url: impl Into<String>) -> Result<Self, AlertError> {
		let client = Client::builder()
			.timeout(Duration::from_secs(10))
			.build()
			.map_err(|e| AlertError::Dispatch(format!("Failed to create HTTP client: {}", e)))?;

		Ok(Self {
			client,
			url: url.into(),
		})
	}
}

#[async_trait]
impl NotificationChannel for WebhookChatChannel {
	fn kind(&self) -> ChannelKind {
		ChannelKind::Chat
	}

	async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
		let payload = serde_json::json!({
			"text": format!("[{}] {}: {}", alert.level, alert.title, alert.description),
			"source": alert.source,
			"alert_id": alert.id,
			"metadata": alert.metadata,
		});

		let response = self
			.client
			.post(&self.url)
			.json(&payload)
			.send()
			.await
			.map_err(|e| AlertError::Dispatch(format!("webhook request failed: {}", e)))?;

		if !response.status().is_success() {
			return Err(AlertError::Dispatch(format!(
				"webhook returned status {}",
				response.status()
			)));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_builds_channel() {
		let channel = WebhookChatChannel::new("http://localhost:9999/hook").unwrap();
		assert_eq!(channel.kind(), ChannelKind::Chat);
	}
}
