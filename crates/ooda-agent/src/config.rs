//! Application configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ooda_core::{AssetPair, Price};
use ooda_dashboard::DashboardConfig;
use ooda_executor::{ExposureConfig, RetryConfig, WebhookConfig};
use ooda_position::TradeMonitorConfig;
use ooda_risk::{KillSwitchConfig, RiskGatekeeperConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

// ============================================================================
// [agent]
// ============================================================================

/// Control loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Asset pairs analysed each sweep.
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<AssetPair>,
    /// Pairs analysed per OODA pass. A sweep over the watchlist takes
    /// `ceil(len / max_assets_per_cycle)` passes.
    #[serde(default = "default_max_assets_per_cycle")]
    pub max_assets_per_cycle: usize,
    /// Wait between sweeps (ms). Default: 60,000.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// Maximum age of portfolio data accepted by PERCEPTION (seconds).
    #[serde(default = "default_data_freshness_secs")]
    pub data_freshness_secs: u64,
    /// Back-off after an unexpected cycle error (ms). Default: 5,000.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Open positions kept by startup recovery.
    #[serde(default = "default_max_concurrent_trades")]
    pub max_concurrent_trades: usize,
    /// Deadline for the whole startup recovery (ms).
    #[serde(default = "default_recovery_timeout_ms")]
    pub recovery_timeout_ms: u64,
    /// How long a rejected pair is kept out of REASONING (seconds).
    #[serde(default = "default_rejection_cooldown_secs")]
    pub rejection_cooldown_secs: u64,
    /// Status polls before a pending order is treated as orphaned.
    #[serde(default = "default_max_status_checks")]
    pub max_status_checks: u32,
    /// Platform label stored on pending orders.
    #[serde(default = "default_platform_name")]
    pub platform_name: String,
}

fn default_watchlist() -> Vec<AssetPair> {
    ["BTC-USD", "ETH-USD"]
        .iter()
        .filter_map(|p| AssetPair::new(p).ok())
        .collect()
}

fn default_max_assets_per_cycle() -> usize {
    5
}

fn default_cycle_interval_ms() -> u64 {
    60_000
}

fn default_data_freshness_secs() -> u64 {
    300
}

fn default_error_backoff_ms() -> u64 {
    5_000
}

fn default_max_concurrent_trades() -> usize {
    2
}

fn default_recovery_timeout_ms() -> u64 {
    30_000
}

fn default_rejection_cooldown_secs() -> u64 {
    300
}

fn default_max_status_checks() -> u32 {
    10
}

fn default_platform_name() -> String {
    "paper".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            watchlist: default_watchlist(),
            max_assets_per_cycle: default_max_assets_per_cycle(),
            cycle_interval_ms: default_cycle_interval_ms(),
            data_freshness_secs: default_data_freshness_secs(),
            error_backoff_ms: default_error_backoff_ms(),
            max_concurrent_trades: default_max_concurrent_trades(),
            recovery_timeout_ms: default_recovery_timeout_ms(),
            rejection_cooldown_secs: default_rejection_cooldown_secs(),
            max_status_checks: default_max_status_checks(),
            platform_name: default_platform_name(),
        }
    }
}

impl AgentConfig {
    #[must_use]
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    #[must_use]
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    #[must_use]
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }

    #[must_use]
    pub fn rejection_cooldown(&self) -> Duration {
        Duration::from_secs(self.rejection_cooldown_secs)
    }
}

// ============================================================================
// [paper]
// ============================================================================

/// In-memory paper trading platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Use the paper platform. It is the only built-in platform.
    #[serde(default = "default_paper_enabled")]
    pub enabled: bool,
    /// Starting cash (USD).
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Decimal,
    /// Static marks per pair. Unlisted pairs are marked at entry.
    #[serde(default)]
    pub marks: HashMap<AssetPair, Price>,
}

fn default_paper_enabled() -> bool {
    true
}

fn default_initial_balance() -> Decimal {
    Decimal::from(10_000)
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            enabled: default_paper_enabled(),
            initial_balance: default_initial_balance(),
            marks: HashMap::new(),
        }
    }
}

// ============================================================================
// [provider]
// ============================================================================

/// HTTP decision provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Endpoint receiving `{"asset_pair": ...}` POSTs.
    #[serde(default)]
    pub url: Option<String>,
    /// Request timeout (ms). Default: 30,000.
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_provider_timeout_ms() -> u64 {
    30_000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_provider_timeout_ms(),
        }
    }
}

// ============================================================================
// [persistence]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Root directory for outcome journals and snapshots.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl PersistenceConfig {
    #[must_use]
    pub fn outcomes_dir(&self) -> PathBuf {
        self.data_dir.join("outcomes")
    }

    #[must_use]
    pub fn pending_orders_path(&self) -> PathBuf {
        self.data_dir.join("pending_orders.json")
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub kill_switch: KillSwitchConfig,
    #[serde(default)]
    pub risk: RiskGatekeeperConfig,
    #[serde(default)]
    pub exposure: ExposureConfig,
    #[serde(default)]
    pub monitor: TradeMonitorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Reject configurations the agent cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        let agent = &self.agent;
        if agent.watchlist.is_empty() {
            return Err(AppError::Config("agent.watchlist is empty".to_string()));
        }
        if agent.max_assets_per_cycle == 0 {
            return Err(AppError::Config(
                "agent.max_assets_per_cycle must be at least 1".to_string(),
            ));
        }
        if agent.max_concurrent_trades == 0 || self.monitor.max_concurrent_trackers == 0 {
            return Err(AppError::Config(
                "concurrency limits must be at least 1".to_string(),
            ));
        }
        if self.exposure.max_concurrent_per_pair == 0 {
            return Err(AppError::Config(
                "exposure.max_concurrent_per_pair must be at least 1".to_string(),
            ));
        }
        let intervals = [
            ("agent.cycle_interval_ms", agent.cycle_interval_ms),
            ("agent.recovery_timeout_ms", agent.recovery_timeout_ms),
            ("monitor.detection_interval_ms", self.monitor.detection_interval_ms),
            ("monitor.poll_interval_ms", self.monitor.poll_interval_ms),
            ("retry.call_timeout_ms", self.retry.call_timeout_ms),
            ("provider.timeout_ms", self.provider.timeout_ms),
            ("dashboard.update_interval_ms", self.dashboard.update_interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(AppError::Config(format!("{name} must be positive")));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.webhook.is_enabled() && self.webhook.max_retries == 0 {
            return Err(AppError::Config(
                "webhook.max_retries must be at least 1".to_string(),
            ));
        }
        self.risk.validate()?;
        Ok(())
    }
}
