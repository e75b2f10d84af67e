//! Execution-history persistence: a `sea-orm` repository over the
//! `job_history` table.
//!
//! Schema and query shape are grounded on
//! `original_source/src/llm_executor/shared/repository.py`'s
//! `JobHistoryRepository`: a unique `request_id` column with upsert
//! semantics (update the existing row rather than insert a duplicate),
//! `timestamp`/`status`/`duration_ms` ordering, and status filtering via
//! a dedicated query path. `code`, `stdout`, and `stderr` stay in the
//! original's schema for parity but `dispatch_domain::entities::HistoryRecord`
//! deliberately omits them - those payloads already live with the
//! `ExecutionResult` and the blob store, so this repository never writes
//! them and they persist as `NULL` for rows written through this port.

use dispatch_domain::entities::{ComplexityTag, ExecutionStatus, HistoryQuery, HistoryRecord, OrderDirection};
use dispatch_domain::error::{Error, Result};
use dispatch_domain::ports::HistoryRepository;
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveValue::NotSet, ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, Schema,
};

pub mod model {
    //! The `job_history` entity, as `sea-orm` code-generation would emit it.
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "job_history")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        #[sea_orm(unique, indexed)]
        pub request_id: String,
        pub timestamp: i64,
        pub status: String,
        pub code: Option<String>,
        pub stdout: Option<String>,
        pub stderr: Option<String>,
        pub exit_code: Option<i32>,
        pub duration_ms: i64,
        pub resource_usage: Option<Json>,
        pub classification: Option<String>,
        pub created_at: i64,
        pub updated_at: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

use model::{ActiveModel, Column, Entity};

/// `HistoryRepository` backed by `sea-orm`, against SQLite or Postgres per
/// `database_url`'s scheme.
pub struct SeaOrmHistoryRepository {
    db: DatabaseConnection,
}

impl SeaOrmHistoryRepository {
    /// Connect to `database_url` and ensure the `job_history` table
    /// exists, creating it if this is a fresh database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// table cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = Database::connect(database_url)
            .await
            .map_err(|e| Error::persistence_with_source(format!("failed to connect to database at {database_url}"), e))?;

        let builder = db.get_database_backend();
        let schema = Schema::new(builder);
        let mut create_stmt = schema.create_table_from_entity(Entity);
        create_stmt.if_not_exists();
        db.execute(builder.build(&create_stmt))
            .await
            .map_err(|e| Error::persistence_with_source("failed to create job_history table", e))?;

        Ok(Self { db })
    }
}

#[async_trait::async_trait]
impl HistoryRepository for SeaOrmHistoryRepository {
    async fn upsert(&self, record: HistoryRecord) -> Result<()> {
        let existing = Entity::find()
            .filter(Column::RequestId.eq(record.request_id.clone()))
            .one(&self.db)
            .await
            .map_err(|e| Error::persistence_with_source("failed to query existing job_history row", e))?;

        let classification = record.classification.map(|tag| tag.to_string());

        match existing {
            Some(row) => {
                let mut active: ActiveModel = row.into();
                active.status = Set(record.status.to_string());
                active.exit_code = Set(record.exit_code);
                active.duration_ms = Set(record.duration_ms as i64);
                active.resource_usage = Set(Some(record.resource_usage));
                active.classification = Set(classification);
                active.timestamp = Set(record.timestamp_ms);
                active.updated_at = Set(record.timestamp_ms);
                active
                    .update(&self.db)
                    .await
                    .map_err(|e| Error::persistence_with_source("failed to update job_history row", e))?;
            }
            None => {
                let active = ActiveModel {
                    id: NotSet,
                    request_id: Set(record.request_id),
                    timestamp: Set(record.timestamp_ms),
                    status: Set(record.status.to_string()),
                    code: Set(None),
                    stdout: Set(None),
                    stderr: Set(None),
                    exit_code: Set(record.exit_code),
                    duration_ms: Set(record.duration_ms as i64),
                    resource_usage: Set(Some(record.resource_usage)),
                    classification: Set(classification),
                    created_at: Set(record.timestamp_ms),
                    updated_at: Set(record.timestamp_ms),
                };
                active.insert(&self.db).await.map_err(|e| Error::persistence_with_source("failed to insert job_history row", e))?;
            }
        }

        Ok(())
    }

    async fn get_by_request_id(&self, request_id: &str) -> Result<Option<HistoryRecord>> {
        let row = Entity::find()
            .filter(Column::RequestId.eq(request_id))
            .one(&self.db)
            .await
            .map_err(|e| Error::persistence_with_source("failed to query job_history by request id", e))?;

        row.map(to_history_record).transpose()
    }

    async fn list(&self, query: HistoryQuery) -> Result<(Vec<HistoryRecord>, u64)> {
        let mut select = Entity::find();
        let mut count_select = Entity::find();
        if let Some(status) = query.status_filter {
            select = select.filter(Column::Status.eq(status.to_string()));
            count_select = count_select.filter(Column::Status.eq(status.to_string()));
        }

        select = match query.order_direction {
            OrderDirection::Descending => select.order_by_desc(Column::Timestamp),
            OrderDirection::Ascending => select.order_by_asc(Column::Timestamp),
        };

        let rows = select
            .limit(u64::from(query.limit))
            .offset(u64::from(query.offset))
            .all(&self.db)
            .await
            .map_err(|e| Error::persistence_with_source("failed to list job_history rows", e))?;

        let total =
            count_select.count(&self.db).await.map_err(|e| Error::persistence_with_source("failed to count job_history rows", e))?;

        let records = rows.into_iter().map(to_history_record).collect::<Result<Vec<_>>>()?;
        Ok((records, total))
    }
}

fn to_history_record(row: model::Model) -> Result<HistoryRecord> {
    let status = row
        .status
        .parse::<ExecutionStatus>()
        .map_err(|e| Error::persistence(format!("stored job_history row has an invalid status: {e}")))?;

    let classification = row
        .classification
        .map(|raw| raw.parse::<ComplexityTag>())
        .transpose()
        .map_err(|e| Error::persistence(format!("stored job_history row has an invalid classification: {e}")))?;

    Ok(HistoryRecord {
        request_id: row.request_id,
        status,
        classification,
        exit_code: row.exit_code,
        duration_ms: row.duration_ms as u64,
        resource_usage: row.resource_usage.unwrap_or(serde_json::Value::Null),
        timestamp_ms: row.timestamp,
    })
}
