//! Database persistence configuration

/// Configuration for the SQLite store holding rates and derived records
pub struct DatabaseConfig {
    /// Default database file (overridable with `--db`)
    pub path: &'static str,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
    /// Statements slower than this are logged at warn level
    pub slow_statement_secs: u64,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub database: DatabaseConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    database: DatabaseConfig {
        path: "breakout_sniper.sqlite",
        max_connections: 5,
        busy_timeout_secs: 60,
        slow_statement_secs: 10,
    },
};
