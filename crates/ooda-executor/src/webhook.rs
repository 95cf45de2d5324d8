//! Outbound JSON webhooks.
//!
//! Lifecycle events (decision approved/rejected, trade executed/failed/closed,
//! kill switch) are POSTed to a single configured URL. Delivery retries with
//! exponential backoff; `max_retries` counts total attempts. Delivery never
//! fails the caller: the outcome is returned as a [`WebhookDelivery`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ooda_core::{AssetPair, BoxFuture, Decision, DecisionId, TradeAction};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::error::{ExecutorError, ExecutorResult};

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Delivery target. Webhooks are disabled when unset.
    #[serde(default)]
    pub url: Option<String>,
    /// Total delivery attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl WebhookConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

// ============================================================================
// Payload
// ============================================================================

/// JSON body sent to the webhook endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<DecisionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_pair: Option<AssetPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<TradeAction>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl WebhookPayload {
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            decision_id: None,
            asset_pair: None,
            action: None,
            timestamp: Utc::now(),
            details: serde_json::Map::new(),
        }
    }

    /// Payload carrying the identifying fields of `decision`.
    #[must_use]
    pub fn for_decision(event_type: impl Into<String>, decision: &Decision) -> Self {
        let mut payload = Self::new(event_type);
        payload.decision_id = Some(decision.id.clone());
        payload.asset_pair = Some(decision.asset_pair.clone());
        payload.action = Some(decision.action);
        payload
            .with_detail("confidence", decision.confidence)
            .with_detail("position_size", decision.recommended_position_size.to_string())
            .with_detail("entry_price", decision.entry_price.to_string())
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeliveryError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out")]
    Timeout,
}

/// Single POST of a payload.
pub trait WebhookTransport: Send + Sync {
    fn post<'a>(
        &'a self,
        url: &'a str,
        body: &'a WebhookPayload,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), DeliveryError>>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> ExecutorResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ExecutorError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

impl WebhookTransport for ReqwestTransport {
    fn post<'a>(
        &'a self,
        url: &'a str,
        body: &'a WebhookPayload,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(url)
                .timeout(timeout)
                .json(body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        DeliveryError::Timeout
                    } else {
                        DeliveryError::Transport(e.to_string())
                    }
                })?;
            let status = resp.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(DeliveryError::Status(status.as_u16()))
            }
        })
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Result of delivering one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookDelivery {
    pub success: bool,
    pub attempts: u32,
    pub last_error: Option<DeliveryError>,
}

pub struct WebhookNotifier {
    config: WebhookConfig,
    transport: Arc<dyn WebhookTransport>,
}

impl WebhookNotifier {
    /// Notifier over HTTP.
    pub fn new(config: WebhookConfig) -> ExecutorResult<Self> {
        let transport = ReqwestTransport::new()?;
        if config.is_enabled() {
            info!("Webhook notifications enabled");
        }
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    #[must_use]
    pub fn with_transport(config: WebhookConfig, transport: Arc<dyn WebhookTransport>) -> Self {
        Self { config, transport }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Deliver `payload`, retrying with backoff. A disabled notifier
    /// reports zero attempts and no success.
    pub async fn deliver(&self, payload: &WebhookPayload) -> WebhookDelivery {
        let Some(url) = self.config.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return WebhookDelivery {
                success: false,
                attempts: 0,
                last_error: None,
            };
        };

        let max_attempts = self.config.max_retries.max(1);
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.transport.post(url, payload, timeout).await {
                Ok(()) => {
                    debug!(event_type = %payload.event_type, attempt, "Webhook delivered");
                    return WebhookDelivery {
                        success: true,
                        attempts: attempt,
                        last_error: None,
                    };
                }
                Err(e) => {
                    warn!(
                        event_type = %payload.event_type,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Webhook delivery failed"
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        error!(
            event_type = %payload.event_type,
            attempts = max_attempts,
            "Webhook delivery gave up"
        );
        WebhookDelivery {
            success: false,
            attempts: max_attempts,
            last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Transport that replays scripted results, then succeeds.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<(), DeliveryError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn with(results: Vec<Result<(), DeliveryError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(results.into()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl WebhookTransport for ScriptedTransport {
        fn post<'a>(
            &'a self,
            _url: &'a str,
            body: &'a WebhookPayload,
            _timeout: Duration,
        ) -> BoxFuture<'a, Result<(), DeliveryError>> {
            self.calls.lock().push(body.event_type.clone());
            let next = self.script.lock().pop_front().unwrap_or(Ok(()));
            Box::pin(async move { next })
        }
    }

    fn config(max_retries: u32) -> WebhookConfig {
        WebhookConfig {
            url: Some("http://hooks.test/ooda".to_string()),
            max_retries,
            base_delay_ms: 5,
            max_delay_ms: 20,
            timeout_ms: 100,
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let transport = ScriptedTransport::with(vec![
            Err(DeliveryError::Status(500)),
            Err(DeliveryError::Timeout),
            Ok(()),
        ]);
        let notifier = WebhookNotifier::with_transport(config(3), transport.clone());

        let delivery = notifier.deliver(&WebhookPayload::new("trade_executed")).await;
        assert!(delivery.success);
        assert_eq!(delivery.attempts, 3);
        assert_eq!(transport.calls.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let transport = ScriptedTransport::with(vec![
            Err(DeliveryError::Status(502)),
            Err(DeliveryError::Status(502)),
            Err(DeliveryError::Status(502)),
            Ok(()),
        ]);
        let notifier = WebhookNotifier::with_transport(config(3), transport.clone());

        let delivery = notifier.deliver(&WebhookPayload::new("kill_switch")).await;
        assert!(!delivery.success);
        assert_eq!(delivery.attempts, 3);
        assert_eq!(delivery.last_error, Some(DeliveryError::Status(502)));
        assert_eq!(transport.calls.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_disabled_without_url() {
        let transport = ScriptedTransport::with(Vec::new());
        let notifier = WebhookNotifier::with_transport(WebhookConfig::default(), transport.clone());

        assert!(!notifier.is_enabled());
        let delivery = notifier.deliver(&WebhookPayload::new("trade_closed")).await;
        assert_eq!(delivery.attempts, 0);
        assert!(transport.calls.lock().is_empty());
    }

    #[test]
    fn test_backoff_is_capped() {
        let cfg = WebhookConfig::default();
        assert_eq!(cfg.backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(cfg.backoff_delay(2), Duration::from_millis(2_000));
        assert_eq!(cfg.backoff_delay(5), Duration::from_millis(10_000));
    }

    #[test]
    fn test_payload_flattens_details() {
        let payload = WebhookPayload::new("decision_rejected")
            .with_detail("reason", "var")
            .with_detail("gate", "var");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event_type"], "decision_rejected");
        assert_eq!(json["reason"], "var");
        assert!(json.get("decision_id").is_none());
    }
}
