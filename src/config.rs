//! アプリケーション設定
//!
//! 読み込み順（後のものが優先）：`config/default.toml`、`config/{RUN_MODE}.toml`、
//! 環境変数`LIBRARY__*`（例：`LIBRARY__DATABASE__URL`）。

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{loan::LOAN_PERIOD_DAYS, reservation::RESERVATION_HOLD_DAYS};

/// アプリケーション設定
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub circulation: CirculationPolicy,
}

/// データベース設定
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 接続URL
    pub url: String,
    /// プールの最大接続数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// 期限切れ予約の一括失効の実行間隔
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// すべての操作で共通の貸出ルール
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CirculationPolicy {
    /// 返却期限の指定がない貸出の貸出期間（日数）
    #[serde(default = "default_loan_period_days")]
    pub loan_period_days: i64,
    /// Pending予約の有効期間（日数）
    #[serde(default = "default_reservation_hold_days")]
    pub reservation_hold_days: i64,
    /// 延滞1日（端数切り上げ）あたりの延滞料
    #[serde(default = "default_fine_rate_per_day")]
    pub fine_rate_per_day: Decimal,
    /// 返却された冊を最も古いPending予約に渡すか
    #[serde(default = "default_fulfill_on_return")]
    pub fulfill_on_return: bool,
}

fn default_loan_period_days() -> i64 {
    LOAN_PERIOD_DAYS
}

fn default_reservation_hold_days() -> i64 {
    RESERVATION_HOLD_DAYS
}

fn default_fine_rate_per_day() -> Decimal {
    Decimal::new(50, 2)
}

fn default_fulfill_on_return() -> bool {
    true
}

impl Default for CirculationPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: default_loan_period_days(),
            reservation_hold_days: default_reservation_hold_days(),
            fine_rate_per_day: default_fine_rate_per_day(),
            fulfill_on_return: default_fulfill_on_return(),
        }
    }
}

/// 期間の上限（日数）
pub const MAX_PERIOD_DAYS: i64 = 3650;

/// 設定値の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("loan_period_days must be between 1 and 3650, got {0}")]
    LoanPeriodOutOfRange(i64),

    #[error("reservation_hold_days must be between 1 and 3650, got {0}")]
    HoldPeriodOutOfRange(i64),

    #[error("fine_rate_per_day must not be negative, got {0}")]
    NegativeFineRate(Decimal),

    #[error("sweep.interval_secs must be greater than 0")]
    ZeroSweepInterval,
}

impl CirculationPolicy {
    /// 貸出ルールを検証する
    ///
    /// 期間は1日以上`MAX_PERIOD_DAYS`日以下、延滞料の日額は0以上。
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(1..=MAX_PERIOD_DAYS).contains(&self.loan_period_days) {
            return Err(ConfigValidationError::LoanPeriodOutOfRange(
                self.loan_period_days,
            ));
        }
        if !(1..=MAX_PERIOD_DAYS).contains(&self.reservation_hold_days) {
            return Err(ConfigValidationError::HoldPeriodOutOfRange(
                self.reservation_hold_days,
            ));
        }
        if self.fine_rate_per_day < Decimal::ZERO {
            return Err(ConfigValidationError::NegativeFineRate(
                self.fine_rate_per_day,
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// 設定ファイルと環境変数から設定を読み込み、検証する
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config: Self = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LIBRARY").separator("__"))
            .build()?
            .try_deserialize()?;

        config
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.sweep.interval_secs == 0 {
            return Err(ConfigValidationError::ZeroSweepInterval);
        }
        self.circulation.validate()
    }
}
