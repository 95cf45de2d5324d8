//! HTTP decision provider.
//!
//! POSTs `{"asset_pair": "BTC-USD"}` and expects either `null` or a decision
//! object. The response is validated before it reaches the agent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ooda_core::{
    AssetPair, BoxFuture, CoreError, Decision, DecisionId, DecisionProvider, Price, Result, Size,
    TradeAction,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct DecisionRequest<'a> {
    asset_pair: &'a AssetPair,
}

/// Decision as sent by the provider. The id and pair may be omitted.
#[derive(Debug, Deserialize)]
struct WireDecision {
    #[serde(default)]
    id: Option<DecisionId>,
    #[serde(default)]
    asset_pair: Option<AssetPair>,
    action: TradeAction,
    confidence: f64,
    recommended_position_size: Size,
    entry_price: Price,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl WireDecision {
    fn into_decision(self, requested: &AssetPair) -> Result<Decision> {
        let asset_pair = self.asset_pair.unwrap_or_else(|| requested.clone());
        if &asset_pair != requested {
            return Err(CoreError::Malformed(format!(
                "asked for {requested}, got a decision for {asset_pair}"
            )));
        }
        let decision = Decision {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(DecisionId::generate),
            asset_pair,
            action: self.action,
            confidence: self.confidence,
            recommended_position_size: self.recommended_position_size,
            entry_price: self.entry_price,
            reasoning: self.reasoning,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        };
        decision.validate()?;
        Ok(decision)
    }
}

/// Parse a provider response body.
fn parse_response(body: &[u8], requested: &AssetPair) -> Result<Option<Decision>> {
    let wire: Option<WireDecision> = serde_json::from_slice(body)
        .map_err(|e| CoreError::Malformed(format!("decision body: {e}")))?;
    wire.map(|w| w.into_decision(requested)).transpose()
}

/// `DecisionProvider` over HTTP.
pub struct HttpDecisionProvider {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpDecisionProvider {
    pub fn new(config: &ProviderConfig) -> AppResult<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| AppError::Config("provider.url is required".to_string()))?;
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            url,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}

impl DecisionProvider for HttpDecisionProvider {
    fn generate_decision<'a>(
        &'a self,
        asset_pair: &'a AssetPair,
    ) -> BoxFuture<'a, Result<Option<Decision>>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(&DecisionRequest { asset_pair })
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        CoreError::Timeout(self.timeout.as_millis() as u64)
                    } else {
                        CoreError::Transient(e.to_string())
                    }
                })?;

            let status = resp.status();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(CoreError::Transient(format!("provider returned {status}")));
            }
            if !status.is_success() {
                return Err(CoreError::Rejected(format!("provider returned {status}")));
            }

            let body = resp
                .bytes()
                .await
                .map_err(|e| CoreError::Transient(e.to_string()))?;
            let decision = parse_response(&body, asset_pair)?;
            debug!(
                %asset_pair,
                action = ?decision.as_ref().map(|d| d.action),
                "Provider answered"
            );
            Ok(decision)
        })
    }
}
