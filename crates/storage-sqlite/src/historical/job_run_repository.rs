use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::warn;
use std::sync::Arc;

use super::model::CronJobRunDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::cron_job_runs::dsl as runs_dsl;
use stockwatch_core::historical::{JobRun, JobRunRepositoryTrait};
use stockwatch_core::Result;

pub struct JobRunRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl JobRunRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl JobRunRepositoryTrait for JobRunRepository {
    async fn create_run(&self, run: &JobRun) -> Result<()> {
        let row = CronJobRunDB::try_from(run).map_err(StorageError::from)?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(runs_dsl::cron_job_runs)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    async fn update_run(&self, run: &JobRun) -> Result<()> {
        let row = CronJobRunDB::try_from(run).map_err(StorageError::from)?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(runs_dsl::cron_job_runs.find(row.id.clone()))
                    .set(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    fn latest_run(&self, job_name: &str) -> Result<Option<JobRun>> {
        let mut conn = get_connection(&self.pool)?;

        let row = runs_dsl::cron_job_runs
            .filter(runs_dsl::job_name.eq(job_name))
            .order(runs_dsl::started_at.desc())
            .select(CronJobRunDB::as_select())
            .first(&mut conn)
            .optional()
            .into_core()?;

        Ok(row.and_then(|row| {
            let id = row.id.clone();
            JobRun::try_from(row)
                .map_err(|e| warn!("Ignoring job run {}: {}", id, e))
                .ok()
        }))
    }
}
