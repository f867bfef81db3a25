//! Log-backed notification channels.
//!
//! Default channel implementations that emit alerts to the tracing
//! subscriber. Used in development and as a stand-in wherever a real
//! email/SMS gateway is not configured.

use crate::{AlertError, ChannelKind, NotificationChannel};
use async_trait::async_trait;
use deployer_types::Alert;

/// A channel that writes alerts to the log.
pub struct LogChannel {
	kind: ChannelKind,
}

impl LogChannel {
	/// A log-backed email channel.
	pub fn email() -> Self {
		Self {
			kind: ChannelKind::Email,
		}
	}

	/// A log-backed chat channel.
	pub fn chat() -> Self {
		Self {
			kind: ChannelKind::Chat,
		}
	}

	/// A log-backed SMS channel.
	pub fn sms() -> Self {
		Self {
			kind: ChannelKind::Sms,
		}
	}
}

#[async_trait]
impl NotificationChannel for LogChannel {
	fn kind(&self) -> ChannelKind {
		self.kind
	}

	async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
		tracing::info!(
			channel = %self.kind,
			alert_id = %alert.id,
			level = %alert.level,
			source = %alert.source,
			title = %alert.title,
			"{}",
			alert.description
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use deployer_types::AlertLevel;

	#[tokio::test]
	async fn test_log_channel_always_succeeds() {
		let alert = Alert::new("t", "d", AlertLevel::Info, "s", None);
		assert!(LogChannel::chat().send(&alert).await.is_ok());
		assert_eq!(LogChannel::email().kind(), ChannelKind::Email);
		assert_eq!(LogChannel::sms().kind(), ChannelKind::Sms);
	}
}
