//! Secure string type for handling sensitive data.
//!
//! Wraps secrets such as signer private keys so they never appear in
//! `Debug` output or logs. Access to the raw value goes through
//! [`SecretString::with_exposed`].

use serde::{Deserialize, Serialize};

/// A string whose contents are redacted from all formatting output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
	/// Wraps a sensitive value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Runs `f` with the exposed secret value.
	pub fn with_exposed<R>(&self, f: impl FnOnce(&str) -> R) -> R {
		f(&self.0)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl std::fmt::Debug for SecretString {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("SecretString(***)")
	}
}

impl std::fmt::Display for SecretString {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("***")
	}
}
