//! Webhook receiver configuration.

/// Shared secret used to authenticate chain monitors.
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    secret: Option<Box<[u8]>>,
}

impl WebhookConfig {
    /// An empty secret means signature verification is disabled.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            secret: (!secret.is_empty()).then(|| Box::from(secret)),
        }
    }

    pub fn disabled() -> Self {
        Self { secret: None }
    }

    /// Get the secret key bytes for HMAC verification, if configured.
    pub fn secret_bytes(&self) -> Option<&[u8]> {
        self.secret.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_disables_verification() {
        assert!(WebhookConfig::new("").secret_bytes().is_none());
        assert_eq!(WebhookConfig::new("k").secret_bytes(), Some(&b"k"[..]));
        assert!(WebhookConfig::disabled().secret_bytes().is_none());
    }
}
