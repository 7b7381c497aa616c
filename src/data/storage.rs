use {
    crate::{
        config::{PERSISTENCE, Price, PriceLike, StopPrice, TargetPrice},
        data::{OpportunityNotifier, RateSource},
        domain::{CurrencyPair, PairId, RateSample},
        models::{
            Consolidation, Opportunity, OpportunityOutcome, SignalType, Strategy, TrendDirection,
            TrendState,
        },
        utils::ms_to_datetime,
    },
    anyhow::{Context, Result, anyhow},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::{
        ConnectOptions, Executor, Pool, QueryBuilder, Row, Sqlite,
        sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
            SqliteSynchronous,
        },
    },
    std::{str::FromStr, sync::Arc, time::Duration},
};

#[cfg(debug_assertions)]
use crate::config::DF;

#[async_trait]
pub trait PairRegistry: Send + Sync {
    async fn get_active_pairs(&self) -> Result<Vec<CurrencyPair>>;
    async fn get_pair(&self, pair_id: PairId) -> Result<Option<CurrencyPair>>;
    async fn update_trend_state(&self, pair_id: PairId, state: &TrendState) -> Result<()>;
}

#[async_trait]
pub trait ConsolidationStore: Send + Sync {
    async fn find_consolidations_by_pair(&self, pair_id: PairId) -> Result<Vec<Consolidation>>;
    async fn create_consolidation(&self, consolidation: Consolidation) -> Result<Consolidation>;
    /// Stores a consolidation and the opportunity it spawned as one unit: either both
    /// rows are written or neither is. The opportunity is linked to the new
    /// consolidation and the notification hook fires after commit.
    async fn create_consolidation_with_opportunity(
        &self,
        consolidation: Consolidation,
        opportunity: Option<Opportunity>,
    ) -> Result<(Consolidation, Option<Opportunity>)>;
}

#[async_trait]
pub trait OpportunityStore: Send + Sync {
    /// Stores the opportunity, then fires the notification hook.
    async fn create_opportunity(&self, opportunity: Opportunity) -> Result<Opportunity>;
}

#[async_trait]
pub trait StrategyRegistry: Send + Sync {
    async fn find_strategy_by_name(&self, name: &str) -> Result<Option<Strategy>>;
}

/// Everything the engine reads from or writes to.
pub trait Collaborators:
    RateSource + PairRegistry + ConsolidationStore + OpportunityStore + StrategyRegistry
{
}

impl<T> Collaborators for T where
    T: RateSource + PairRegistry + ConsolidationStore + OpportunityStore + StrategyRegistry
{
}

pub struct SqliteStorage {
    pool: Pool<Sqlite>,
    notifier: Option<Arc<dyn OpportunityNotifier>>,
}

impl SqliteStorage {
    pub async fn new(db_path: &str) -> Result<Self> {
        let db = &PERSISTENCE.database;
        let connection_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(db.busy_timeout_secs))
            .synchronous(SqliteSynchronous::Normal)
            .log_slow_statements(
                log::LevelFilter::Warn,
                Duration::from_secs(db.slow_statement_secs),
            );

        let pool = SqlitePoolOptions::new()
            .max_connections(db.max_connections)
            .connect_with(connection_options)
            .await
            .with_context(|| format!("Failed to open database {}", db_path))?;

        let storage = Self {
            pool,
            notifier: None,
        };
        storage.initialize().await?;
        Ok(storage)
    }

    /// Private in-memory database. A single long-lived connection keeps it alive.
    pub async fn in_memory() -> Result<Self> {
        let connection_options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connection_options)
            .await
            .context("Failed to open in-memory database")?;

        let storage = Self {
            pool,
            notifier: None,
        };
        storage.initialize().await?;
        Ok(storage)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn OpportunityNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    async fn initialize(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS currency_pairs (
                id INTEGER PRIMARY KEY,
                base_code TEXT NOT NULL,
                target_code TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                is_trending INTEGER NOT NULL DEFAULT 0,
                trend_direction TEXT,
                trend_strength REAL,
                trend_detected_at INTEGER,
                trend_last_checked_at INTEGER
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS rates (
                pair_id INTEGER NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                rate REAL NOT NULL,
                PRIMARY KEY (pair_id, timestamp_ms)
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS consolidations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pair_id INTEGER NOT NULL,
                trend_direction TEXT,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                resistance REAL NOT NULL,
                support REAL NOT NULL,
                broken_at INTEGER,
                breakout_direction TEXT,
                breakout_matches_trend INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS strategies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                active INTEGER NOT NULL DEFAULT 1
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS opportunities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pair_id INTEGER NOT NULL,
                strategy_id INTEGER NOT NULL REFERENCES strategies (id),
                consolidation_id INTEGER REFERENCES consolidations (id),
                signal TEXT NOT NULL,
                entry_price REAL NOT NULL,
                stop_loss REAL NOT NULL,
                take_profit REAL NOT NULL,
                created_at INTEGER NOT NULL,
                outcome TEXT
            );
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to create schema")?;
        }
        Ok(())
    }

    pub async fn insert_pair(&self, base_code: &str, target_code: &str) -> Result<PairId> {
        let result = sqlx::query("INSERT INTO currency_pairs (base_code, target_code) VALUES (?, ?)")
            .bind(base_code)
            .bind(target_code)
            .execute(&self.pool)
            .await
            .context("Failed to insert pair")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn set_pair_active(&self, pair_id: PairId, active: bool) -> Result<()> {
        sqlx::query("UPDATE currency_pairs SET active = ? WHERE id = ?")
            .bind(active)
            .bind(pair_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Batches samples in chunks of 5000 to stay within SQLite's parameter limit.
    pub async fn insert_rates(&self, pair_id: PairId, samples: &[RateSample]) -> Result<u64> {
        if samples.is_empty() {
            return Ok(0);
        }

        for chunk in samples.chunks(5000) {
            let mut query_builder =
                QueryBuilder::new("INSERT OR IGNORE INTO rates (pair_id, timestamp_ms, rate) ");

            query_builder.push_values(chunk, |mut b, s| {
                b.push_bind(pair_id).push_bind(s.timestamp_ms).push_bind(s.rate);
            });

            query_builder
                .build()
                .execute(&self.pool)
                .await
                .context("Failed to insert rates")?;
        }

        #[cfg(debug_assertions)]
        if DF.log_storage {
            log::info!("Inserted {} rates for pair {}", samples.len(), pair_id);
        }

        Ok(samples.len() as u64)
    }

    pub async fn insert_strategy(&self, name: &str, active: bool) -> Result<i64> {
        let result = sqlx::query("INSERT INTO strategies (name, active) VALUES (?, ?)")
            .bind(name)
            .bind(active)
            .execute(&self.pool)
            .await
            .context("Failed to insert strategy")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn list_opportunities(&self, pair_id: PairId) -> Result<Vec<Opportunity>> {
        let rows = sqlx::query(
            r#"
            SELECT id, pair_id, strategy_id, consolidation_id, signal, entry_price,
                   stop_loss, take_profit, created_at, outcome
            FROM opportunities
            WHERE pair_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(pair_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(opportunity_from_row).collect()
    }
}

fn from_ms(ms: i64) -> Result<DateTime<Utc>> {
    ms_to_datetime(ms).ok_or_else(|| anyhow!("Invalid timestamp {} in database", ms))
}

fn opt_from_ms(ms: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    ms.map(from_ms).transpose()
}

fn parse_direction(text: Option<String>) -> Result<Option<TrendDirection>> {
    text.map(|t| TrendDirection::from_str(&t).map_err(|e| anyhow!("Bad direction '{}': {}", t, e)))
        .transpose()
}

fn pair_from_row(row: &SqliteRow) -> Result<CurrencyPair> {
    let trend_state = TrendState {
        is_trending: row.try_get("is_trending")?,
        direction: parse_direction(row.try_get("trend_direction")?)?,
        strength: row.try_get("trend_strength")?,
        detected_at: opt_from_ms(row.try_get("trend_detected_at")?)?,
        last_checked_at: opt_from_ms(row.try_get("trend_last_checked_at")?)?,
    };
    Ok(CurrencyPair {
        id: row.try_get("id")?,
        base_code: row.try_get("base_code")?,
        target_code: row.try_get("target_code")?,
        trend_state,
    })
}

fn consolidation_from_row(row: &SqliteRow) -> Result<Consolidation> {
    Ok(Consolidation {
        id: row.try_get("id")?,
        pair_id: row.try_get("pair_id")?,
        trend_direction: parse_direction(row.try_get("trend_direction")?)?,
        start_time: from_ms(row.try_get("start_time")?)?,
        end_time: from_ms(row.try_get("end_time")?)?,
        resistance: Price::new(row.try_get("resistance")?),
        support: Price::new(row.try_get("support")?),
        broken_at: opt_from_ms(row.try_get("broken_at")?)?,
        breakout_direction: parse_direction(row.try_get("breakout_direction")?)?,
        breakout_matches_trend: row.try_get("breakout_matches_trend")?,
        created_at: from_ms(row.try_get("created_at")?)?,
    })
}

fn opportunity_from_row(row: &SqliteRow) -> Result<Opportunity> {
    let signal: String = row.try_get("signal")?;
    let outcome: Option<String> = row.try_get("outcome")?;
    Ok(Opportunity {
        id: row.try_get("id")?,
        pair_id: row.try_get("pair_id")?,
        strategy_id: row.try_get("strategy_id")?,
        consolidation_id: row.try_get("consolidation_id")?,
        signal: SignalType::from_str(&signal).map_err(|e| anyhow!("Bad signal '{}': {}", signal, e))?,
        entry_price: Price::new(row.try_get("entry_price")?),
        stop_loss: StopPrice::new(row.try_get("stop_loss")?),
        take_profit: TargetPrice::new(row.try_get("take_profit")?),
        created_at: from_ms(row.try_get("created_at")?)?,
        outcome: outcome
            .map(|o| OpportunityOutcome::from_str(&o).map_err(|e| anyhow!("Bad outcome '{}': {}", o, e)))
            .transpose()?,
    })
}

const PAIR_COLUMNS: &str = r#"
    SELECT id, base_code, target_code, is_trending, trend_direction, trend_strength,
           trend_detected_at, trend_last_checked_at
    FROM currency_pairs
"#;

async fn insert_consolidation<'e, E>(executor: E, c: &Consolidation) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO consolidations (pair_id, trend_direction, start_time, end_time,
            resistance, support, broken_at, breakout_direction, breakout_matches_trend,
            created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(c.pair_id)
    .bind(c.trend_direction.map(|d| d.to_string()))
    .bind(c.start_time.timestamp_millis())
    .bind(c.end_time.timestamp_millis())
    .bind(c.resistance.value())
    .bind(c.support.value())
    .bind(c.broken_at.map(|t| t.timestamp_millis()))
    .bind(c.breakout_direction.map(|d| d.to_string()))
    .bind(c.breakout_matches_trend)
    .bind(c.created_at.timestamp_millis())
    .execute(executor)
    .await
    .context("Failed to insert consolidation")?;
    Ok(result.last_insert_rowid())
}

async fn insert_opportunity<'e, E>(executor: E, o: &Opportunity) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO opportunities (pair_id, strategy_id, consolidation_id, signal,
            entry_price, stop_loss, take_profit, created_at, outcome)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(o.pair_id)
    .bind(o.strategy_id)
    .bind(o.consolidation_id)
    .bind(o.signal.to_string())
    .bind(o.entry_price.value())
    .bind(o.stop_loss.value())
    .bind(o.take_profit.value())
    .bind(o.created_at.timestamp_millis())
    .bind(o.outcome.map(|x| x.to_string()))
    .execute(executor)
    .await
    .context("Failed to insert opportunity")?;
    Ok(result.last_insert_rowid())
}

#[async_trait]
impl RateSource for SqliteStorage {
    async fn get_rates_in_range(
        &self,
        pair_id: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RateSample>> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp_ms, rate
            FROM rates
            WHERE pair_id = ? AND timestamp_ms >= ? AND timestamp_ms < ?
            ORDER BY timestamp_ms ASC
            "#,
        )
        .bind(pair_id)
        .bind(from.timestamp_millis())
        .bind(to.timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to load rates for pair {}", pair_id))?;

        rows.iter()
            .map(|row| -> Result<RateSample> {
                Ok(RateSample::new(row.try_get("timestamp_ms")?, row.try_get("rate")?))
            })
            .collect()
    }
}

#[async_trait]
impl PairRegistry for SqliteStorage {
    async fn get_active_pairs(&self) -> Result<Vec<CurrencyPair>> {
        let rows = sqlx::query(&format!("{} WHERE active = 1 ORDER BY id ASC", PAIR_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("Failed to load active pairs")?;
        rows.iter().map(pair_from_row).collect()
    }

    async fn get_pair(&self, pair_id: PairId) -> Result<Option<CurrencyPair>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", PAIR_COLUMNS))
            .bind(pair_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(pair_from_row).transpose()
    }

    async fn update_trend_state(&self, pair_id: PairId, state: &TrendState) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE currency_pairs
            SET is_trending = ?, trend_direction = ?, trend_strength = ?,
                trend_detected_at = ?, trend_last_checked_at = ?
            WHERE id = ?
            "#,
        )
        .bind(state.is_trending)
        .bind(state.direction.map(|d| d.to_string()))
        .bind(state.strength)
        .bind(state.detected_at.map(|t| t.timestamp_millis()))
        .bind(state.last_checked_at.map(|t| t.timestamp_millis()))
        .bind(pair_id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update trend state for pair {}", pair_id))?;
        Ok(())
    }
}

#[async_trait]
impl ConsolidationStore for SqliteStorage {
    async fn find_consolidations_by_pair(&self, pair_id: PairId) -> Result<Vec<Consolidation>> {
        let rows = sqlx::query(
            r#"
            SELECT id, pair_id, trend_direction, start_time, end_time, resistance, support,
                   broken_at, breakout_direction, breakout_matches_trend, created_at
            FROM consolidations
            WHERE pair_id = ?
            ORDER BY start_time ASC, id ASC
            "#,
        )
        .bind(pair_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to load consolidations for pair {}", pair_id))?;

        rows.iter().map(consolidation_from_row).collect()
    }

    async fn create_consolidation(&self, consolidation: Consolidation) -> Result<Consolidation> {
        let id = insert_consolidation(&self.pool, &consolidation).await?;
        Ok(Consolidation {
            id: Some(id),
            ..consolidation
        })
    }

    async fn create_consolidation_with_opportunity(
        &self,
        consolidation: Consolidation,
        opportunity: Option<Opportunity>,
    ) -> Result<(Consolidation, Option<Opportunity>)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin breakout transaction")?;

        let id = insert_consolidation(&mut *tx, &consolidation).await?;
        let stored = Consolidation {
            id: Some(id),
            ..consolidation
        };

        let opportunity = match opportunity {
            Some(o) => {
                let linked = Opportunity {
                    consolidation_id: Some(id),
                    ..o
                };
                let opportunity_id = insert_opportunity(&mut *tx, &linked).await?;
                Some(Opportunity {
                    id: Some(opportunity_id),
                    ..linked
                })
            }
            None => None,
        };

        tx.commit()
            .await
            .context("Failed to commit breakout transaction")?;

        if let (Some(o), Some(notifier)) = (&opportunity, &self.notifier) {
            notifier.notify(o);
        }
        Ok((stored, opportunity))
    }
}

#[async_trait]
impl OpportunityStore for SqliteStorage {
    async fn create_opportunity(&self, opportunity: Opportunity) -> Result<Opportunity> {
        let id = insert_opportunity(&self.pool, &opportunity).await?;
        let stored = Opportunity {
            id: Some(id),
            ..opportunity
        };

        if let Some(notifier) = &self.notifier {
            notifier.notify(&stored);
        }

        Ok(stored)
    }
}

#[async_trait]
impl StrategyRegistry for SqliteStorage {
    async fn find_strategy_by_name(&self, name: &str) -> Result<Option<Strategy>> {
        let row = sqlx::query("SELECT id, name, active FROM strategies WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up strategy")?;

        row.map(|r| -> Result<Strategy> {
            Ok(Strategy {
                id: r.try_get("id")?,
                name: r.try_get("name")?,
                active: r.try_get("active")?,
            })
        })
        .transpose()
    }
}
