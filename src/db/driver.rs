//! Database drivers.
pub mod pg;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::fmt::Debug;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::types::Result;

/// Data access handle shared by the services. It is created once by the bootstrap and passed around explicitly.
#[async_trait]
pub trait DatabaseDriver: Debug + Sync + Send + 'static {
    /// Return driver name.
    fn name(&self) -> &'static str;
    /// Returns the database connection for the driver.
    fn connection(&self) -> DatabaseConnection;
    /// Configure the database connection parameters. See corresponding driver implementation for details.
    async fn configure(&self) -> Result<()>;
}

/// Backoff policy for establishing the initial database connection.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts:  u32,
    pub initial:   Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts:  5,
            initial:   Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry, counting from 1. Doubles each time up to `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `connect` until it succeeds or the attempts are exhausted. The last error is returned.
    pub async fn connect<T, E, F, Fut>(&self, what: &str, mut connect: F) -> std::result::Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match connect().await {
                Ok(conn) => return Ok(conn),
                Err(err) if attempt < self.attempts.max(1) => {
                    let delay = self.delay_for(attempt);
                    warn!("Connection to {what} failed (attempt {attempt}): {err}; retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use sea_orm::DbErr;

    use super::*;

    #[test]
    fn test_backoff_growth() {
        let policy = RetryPolicy {
            attempts:  10,
            initial:   Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_connect_retries_then_succeeds() {
        let policy = RetryPolicy {
            attempts:  3,
            initial:   Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let res = policy
            .connect("test", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DbErr::Custom("not yet".into()))
                }
                else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(res.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_connect_gives_up() {
        let policy = RetryPolicy {
            attempts:  2,
            initial:   Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let res: std::result::Result<(), DbErr> = policy
            .connect("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DbErr::Custom("down".into()))
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
