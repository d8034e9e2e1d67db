//! PostgreSQL 시그널 저장소.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use scanner_core::{DatabaseConfig, Signal};

use crate::error::{DataError, Result};
use crate::store::{SignalQuery, SignalStore};

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 새로운 데이터베이스 연결 풀을 생성합니다.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| DataError::ConnectionError("database.url is not configured".into()))?;

        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// 기존 연결 풀에서 생성합니다.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 데이터베이스 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DataError::MigrationError(e.to_string()))?;

        info!("Migrations completed successfully");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Signal Repository
// =============================================================================

/// `signals` 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct SignalRecord {
    pub id: Uuid,
    pub symbol: String,
    pub timeframe: String,
    pub pattern_type: String,
    pub direction: String,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit_1: Decimal,
    pub take_profit_2: Decimal,
    pub leverage: i32,
    pub risk_reward_ratio: f64,
    pub entry_score: f64,
    pub confidence: f64,
    pub action: String,
    pub atr_percent: f64,
    pub factors: serde_json::Value,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SignalRecord {
    pub fn from_signal(signal: &Signal) -> Result<Self> {
        Ok(Self {
            id: signal.id,
            symbol: signal.symbol.clone(),
            timeframe: signal.timeframe.to_string(),
            pattern_type: signal.pattern_type.as_str().to_string(),
            direction: signal.direction.as_str().to_string(),
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            take_profit_1: signal.take_profit_1,
            take_profit_2: signal.take_profit_2,
            leverage: i32::try_from(signal.leverage)
                .map_err(|_| DataError::InvalidData(format!("leverage {}", signal.leverage)))?,
            risk_reward_ratio: signal.risk_reward_ratio,
            entry_score: signal.entry_score,
            confidence: signal.confidence,
            action: signal.action.as_str().to_string(),
            atr_percent: signal.atr_percent,
            factors: serde_json::to_value(signal.factors)?,
            context: serde_json::to_value(&signal.context)?,
            created_at: signal.created_at,
        })
    }
}

impl TryFrom<SignalRecord> for Signal {
    type Error = DataError;

    fn try_from(record: SignalRecord) -> Result<Self> {
        let invalid = |field: &str, e: String| DataError::InvalidData(format!("{}: {}", field, e));

        Ok(Signal {
            id: record.id,
            timeframe: record.timeframe.parse().map_err(|e| invalid("timeframe", e))?,
            pattern_type: record
                .pattern_type
                .parse()
                .map_err(|e| invalid("pattern_type", e))?,
            direction: record.direction.parse().map_err(|e| invalid("direction", e))?,
            action: record.action.parse().map_err(|e| invalid("action", e))?,
            leverage: u32::try_from(record.leverage)
                .map_err(|e| invalid("leverage", e.to_string()))?,
            factors: serde_json::from_value(record.factors)?,
            context: serde_json::from_value(record.context)?,
            symbol: record.symbol,
            entry_price: record.entry_price,
            stop_loss: record.stop_loss,
            take_profit_1: record.take_profit_1,
            take_profit_2: record.take_profit_2,
            risk_reward_ratio: record.risk_reward_ratio,
            entry_score: record.entry_score,
            confidence: record.confidence,
            atr_percent: record.atr_percent,
            created_at: record.created_at,
        })
    }
}

/// PostgreSQL 기반 [`SignalStore`].
#[derive(Clone)]
pub struct PgSignalStore {
    db: Database,
}

impl PgSignalStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl SignalStore for PgSignalStore {
    fn name(&self) -> &str {
        "postgres"
    }

    #[instrument(skip(self, signal), fields(id = %signal.id, symbol = %signal.symbol))]
    async fn insert(&self, signal: &Signal) -> Result<bool> {
        let record = SignalRecord::from_signal(signal)?;

        let result = sqlx::query(
            r#"
            INSERT INTO signals (
                id, symbol, timeframe, pattern_type, direction,
                entry_price, stop_loss, take_profit_1, take_profit_2,
                leverage, risk_reward_ratio, entry_score, confidence, action,
                atr_percent, factors, context, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.symbol)
        .bind(&record.timeframe)
        .bind(&record.pattern_type)
        .bind(&record.direction)
        .bind(record.entry_price)
        .bind(record.stop_loss)
        .bind(record.take_profit_1)
        .bind(record.take_profit_2)
        .bind(record.leverage)
        .bind(record.risk_reward_ratio)
        .bind(record.entry_score)
        .bind(record.confidence)
        .bind(&record.action)
        .bind(record.atr_percent)
        .bind(&record.factors)
        .bind(&record.context)
        .bind(record.created_at)
        .execute(self.db.pool())
        .await?;

        let inserted = result.rows_affected() == 1;
        debug!(inserted, "Signal persisted");
        Ok(inserted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Signal>> {
        let record: Option<SignalRecord> = sqlx::query_as("SELECT * FROM signals WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        record.map(Signal::try_from).transpose()
    }

    async fn query(&self, query: &SignalQuery) -> Result<Vec<Signal>> {
        let records: Vec<SignalRecord> = sqlx::query_as(
            r#"
            SELECT * FROM signals
            WHERE ($1::text IS NULL OR symbol = $1)
              AND ($2::text IS NULL OR timeframe = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
            ORDER BY created_at DESC, id
            LIMIT $4
            "#,
        )
        .bind(query.normalized_symbol())
        .bind(query.timeframe.map(|tf| tf.to_string()))
        .bind(query.since)
        .bind(query.effective_limit() as i64)
        .fetch_all(self.db.pool())
        .await?;

        records.into_iter().map(Signal::try_from).collect()
    }

    async fn health_check(&self) -> Result<()> {
        self.db.health_check().await
    }
}
