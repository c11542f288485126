use crate::errors::{Error, Result};
use crate::metrics::{APPEND_FAILURES_TOTAL, APPEND_LATENCY_SECONDS, READINGS_APPENDED_TOTAL};
use crate::model::MeasurementReading;
use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveTime, TimeZone};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Hard cap on the number of readings a single query returns.
pub const QUERY_LIMIT: i64 = 1000;

const SELECT_COLUMNS: &str =
    r#"SELECT timestamp, device_id, voltage, "current", power, frequency, energy FROM meter_readings"#;

pub async fn make_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    info!("Opening database...");
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    info!("Database opened");
    migrate(&pool).await?;

    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Migrations completed");
    Ok(())
}

/// Persists one reading. No deduplication: posting the same reading twice
/// stores it twice.
pub async fn append(pool: &SqlitePool, reading: &MeasurementReading) -> Result<()> {
    let start = Instant::now();

    let result = sqlx::query(
        r#"
        INSERT INTO meter_readings (timestamp, device_id, voltage, "current", power, frequency, energy)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(reading.timestamp)
    .bind(reading.device_id)
    .bind(reading.voltage)
    .bind(reading.current)
    .bind(reading.power)
    .bind(reading.frequency)
    .bind(reading.energy)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {
            READINGS_APPENDED_TOTAL.inc();
            APPEND_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());
            debug!(
                "Stored reading for device {} at {}",
                reading.device_id, reading.timestamp
            );
            Ok(())
        }
        Err(e) => {
            APPEND_FAILURES_TOTAL.inc();
            error!(
                "Failed to store reading for device {}: {}",
                reading.device_id, e
            );
            Err(Error::Database(e))
        }
    }
}

/// Returns the most recent readings, newest first, optionally restricted to
/// one calendar day in the server's local time zone.
pub async fn query(pool: &SqlitePool, day: Option<NaiveDate>) -> Result<Vec<MeasurementReading>> {
    let readings = match day {
        None => {
            let sql = format!("{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC LIMIT ?");
            sqlx::query_as::<_, MeasurementReading>(&sql)
                .bind(QUERY_LIMIT)
                .fetch_all(pool)
                .await?
        }
        Some(day) => {
            let (start, end) = day_bounds(day)?;
            let sql = format!(
                "{SELECT_COLUMNS} WHERE timestamp >= ? AND timestamp < ? \
                 ORDER BY timestamp DESC, id DESC LIMIT ?"
            );
            sqlx::query_as::<_, MeasurementReading>(&sql)
                .bind(start)
                .bind(end)
                .bind(QUERY_LIMIT)
                .fetch_all(pool)
                .await?
        }
    };

    Ok(readings)
}

/// Parses a `YYYY-MM-DD` day filter.
pub fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        Error::InvalidArgument(format!("date {:?} is not in YYYY-MM-DD format: {}", raw, e))
    })
}

/// Epoch-second bounds `[start, end)` covering `day` in local time.
///
/// `end` is the start of the following day, so every instant up to and
/// including 23:59:59.999.. of `day` is inside the range.
pub fn day_bounds(day: NaiveDate) -> Result<(f64, f64)> {
    let start = start_of_day(day)?;
    let end = match day.succ_opt() {
        Some(next) => start_of_day(next)?,
        None => f64::INFINITY,
    };
    Ok((start, end))
}

fn start_of_day(day: NaiveDate) -> Result<f64> {
    let midnight = day.and_time(NaiveTime::MIN);

    // Some zones skip midnight on DST transitions; the day then starts an hour later.
    let start = Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(midnight + ChronoDuration::hours(1)))
                .earliest()
        })
        .ok_or_else(|| Error::InvalidArgument(format!("{} has no local start of day", day)))?;

    Ok(start.timestamp() as f64)
}

#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
