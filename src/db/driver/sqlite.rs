use std::path::Path;

use async_trait::async_trait;
use fieldx::fxstruct;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use sea_orm::DbErr;
use tracing::error;

use crate::types::Result;

use super::DatabaseDriver;

#[derive(Debug)]
#[fxstruct(sync, no_new)]
pub struct Sqlite {
    connection: DatabaseConnection,
}

impl Sqlite {
    /// Open (creating if necessary) the database file `db_name` in `db_dir`.
    pub async fn connect(db_dir: &Path, db_name: &str) -> std::result::Result<Self, DbErr> {
        let db_path = db_dir.join(db_name);

        let schema = format!("sqlite://{}?mode=rwc", db_path.display());
        let db = sea_orm::Database::connect(&schema)
            .await
            .inspect_err(|e| error!("Error connecting to database {schema}: {e}"))?;

        Ok(Self { connection: db })
    }
}

#[async_trait]
impl DatabaseDriver for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    // WAL lets the summary and listing reads proceed while a sale transaction holds the write lock.
    async fn configure(&self) -> Result<()> {
        let db = &self.connection;

        db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        db.execute_unprepared("PRAGMA synchronous=NORMAL;").await?;
        db.execute_unprepared("PRAGMA busy_timeout=5000;").await?;

        Ok(())
    }
}
