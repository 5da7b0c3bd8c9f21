use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;

/// Outbound email. Delivery is best effort: `send` reports success as a
/// bool and never fails the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Mailbox used for operator notifications, if any
    fn sender(&self) -> Option<String>;

    async fn send(&self, to: &str, subject: &str, body: &str) -> bool;
}

/// Sends a notification to the configured operator mailbox.
pub async fn send_to_self(mailer: &dyn Mailer, subject: &str, body: &str) -> bool {
    match mailer.sender() {
        Some(to) => mailer.send(&to, subject, body).await,
        None => {
            warn!(subject, "No sender mailbox configured; notification dropped");
            false
        }
    }
}

/// Payload posted to the mail relay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// HMAC signature generator for relay requests
pub struct SignatureGenerator {
    secret: String,
}

impl SignatureGenerator {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Hex HMAC-SHA256 over `"{timestamp}.{body}"`
    pub fn sign_payload(&self, timestamp: &str, body: &str) -> Option<String> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        let signed_payload = format!("{}.{}", timestamp, body);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(signed_payload.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Mail delivery through an HTTP relay with retries
#[derive(Clone)]
pub struct HttpMailRelay {
    client: reqwest::Client,
    relay_url: String,
    sender: String,
    signature_generator: Option<Arc<SignatureGenerator>>,
    max_retries: u32,
    backoff_base: Duration,
}

impl HttpMailRelay {
    pub fn new(
        relay_url: String,
        sender: String,
        secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            relay_url,
            sender,
            signature_generator: secret.map(|secret| Arc::new(SignatureGenerator::new(secret))),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Overrides the retry policy
    pub fn with_retries(mut self, max_retries: u32, backoff_base: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.backoff_base = backoff_base;
        self
    }
}

#[async_trait]
impl Mailer for HttpMailRelay {
    fn sender(&self) -> Option<String> {
        Some(self.sender.clone())
    }

    #[instrument(skip(self, body))]
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        let message = MailMessage {
            from: self.sender.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize mail message: {}", e);
                return false;
            }
        };

        let timestamp = chrono::Utc::now().to_rfc3339();
        let signature = self
            .signature_generator
            .as_ref()
            .and_then(|gen| gen.sign_payload(&timestamp, &payload));

        for attempt in 1..=self.max_retries {
            let mut request = self
                .client
                .post(&self.relay_url)
                .header("Content-Type", "application/json")
                .header("Timestamp", &timestamp)
                .body(payload.clone());

            if let Some(ref sig) = signature {
                request = request.header("Relay-Signature", sig);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    info!("Mail '{}' delivered to {}", subject, to);
                    return true;
                }
                Ok(response) => warn!(
                    "Mail relay rejected message with status: {} (attempt {}/{})",
                    response.status(),
                    attempt,
                    self.max_retries
                ),
                Err(e) => warn!(
                    "Mail relay error: {} (attempt {}/{})",
                    e, attempt, self.max_retries
                ),
            }

            if attempt < self.max_retries {
                tokio::time::sleep(self.backoff_base * 2_u32.pow(attempt - 1)).await;
            }
        }

        error!(
            "Mail '{}' to {} failed after {} attempts",
            subject, to, self.max_retries
        );
        false
    }
}

/// Fallback when no relay is configured: the message is logged and reported as not sent.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn sender(&self) -> Option<String> {
        None
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        warn!(to, subject, body, "Mail relay is not configured; message not sent");
        false
    }
}

/// Picks the mailer described by the configuration.
pub fn mailer_from_config(config: &AppConfig) -> Arc<dyn Mailer> {
    match (&config.mail_relay_url, &config.mail_sender) {
        (Some(url), Some(sender)) => match HttpMailRelay::new(
            url.clone(),
            sender.clone(),
            config.mail_relay_secret.clone(),
            Duration::from_secs(config.mail_timeout_secs),
        ) {
            Ok(relay) => Arc::new(relay),
            Err(e) => {
                error!("Failed to build mail relay client, falling back to logging: {}", e);
                Arc::new(LogMailer)
            }
        },
        _ => {
            warn!("Mail relay not configured; notifications will only be logged");
            Arc::new(LogMailer)
        }
    }
}
