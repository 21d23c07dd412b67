use bigdecimal::{BigDecimal, RoundingMode};
use diesel::{
    r2d2::{ConnectionManager, Pool},
    PgConnection,
};

use crate::core::config::DatabaseConfig;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Rounds money and percentages to two places, halves away from zero.
pub fn round_amount(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

pub fn create_conn(config: &DatabaseConfig) -> Result<DbPool, diesel::r2d2::PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(config.url.clone());
    Pool::builder()
        .max_size(config.max_connections)
        .build(manager)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS).map_err(
        |e| -> Box<dyn std::error::Error + Send + Sync> {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Migration error: {}", e),
            ))
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_amount_rounds_halves_up() {
        assert_eq!(round_amount(&dec("0.125")), dec("0.13"));
        assert_eq!(round_amount(&dec("0.135")), dec("0.14"));
        assert_eq!(round_amount(&dec("987.648")), dec("987.65"));
        assert_eq!(round_amount(&dec("-0.125")), dec("-0.13"));
    }
}
