//! Postgres-backed record store.
//!
//! Each resource maps to the table named by `R::KIND.collection`, whose
//! columns match the record's JSON fields. Rows cross the boundary as JSON:
//! writes go through `jsonb_populate_record`, reads come back as `to_jsonb`,
//! so one implementation serves every entity.
//!
//! Every statement carries `organization_id` in its WHERE clause.

use std::marker::PhantomData;

use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use crm_core::patch::patch_document;
use crm_core::{FieldFilter, OrganizationId, RecordId, Resource};

use super::RecordStore;
use crate::error::{StoreError, map_sqlx_error};

pub struct PostgresRecordStore<R> {
    pool: PgPool,
    _record: PhantomData<fn() -> R>,
}

impl<R> PostgresRecordStore<R> {
    /// `PgPool` is a handle; clones share one pool across resources.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }
}

impl<R> Clone for PostgresRecordStore<R> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<R> core::fmt::Debug for PostgresRecordStore<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresRecordStore").finish_non_exhaustive()
    }
}

fn decode<R: Resource>(row: &sqlx::postgres::PgRow) -> Result<R, StoreError> {
    let doc: Value = row
        .try_get("doc")
        .map_err(|e| StoreError::Backend(format!("failed to read {} row: {e}", R::KIND.label)))?;
    serde_json::from_value(doc)
        .map_err(|e| StoreError::Backend(format!("failed to decode {} row: {e}", R::KIND.label)))
}

/// Double-quote a column name taken from a patch document.
fn quoted(column: &str) -> Result<String, StoreError> {
    if column.is_empty() || !column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidRecord(format!("invalid column name '{column}'")));
    }
    Ok(format!("\"{column}\""))
}

/// `SELECT to_jsonb(t) AS doc FROM <table> AS t WHERE t.organization_id = $1`
/// followed by one `(to_jsonb(t) ->> field) = value` condition per filter.
pub(crate) fn select_query<'a>(
    table: &str,
    organization_id: OrganizationId,
    filters: &'a [FieldFilter],
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT to_jsonb(t) AS doc FROM {table} AS t WHERE t.organization_id = "
    ));
    qb.push_bind(*organization_id.as_uuid());
    for filter in filters {
        qb.push(" AND (to_jsonb(t) ->> ");
        qb.push_bind(filter.field);
        qb.push(") = ");
        qb.push_bind(filter.value.as_str());
    }
    qb
}

/// `UPDATE <table> AS t SET "c" = p."c", ... FROM jsonb_populate_record(NULL::<table>, `
/// for the columns a patch touched; the caller binds the merged record.
fn update_query<'a, 'c>(
    table: &str,
    columns: impl IntoIterator<Item = &'c str>,
) -> Result<QueryBuilder<'a, Postgres>, StoreError> {
    let assignments = columns
        .into_iter()
        .map(|column| quoted(column).map(|c| format!("{c} = p.{c}")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QueryBuilder::new(format!(
        "UPDATE {table} AS t SET {} FROM jsonb_populate_record(NULL::{table}, ",
        assignments.join(", ")
    )))
}

#[async_trait::async_trait]
impl<R: Resource> RecordStore<R> for PostgresRecordStore<R> {
    #[instrument(
        skip(self, filters),
        fields(table = R::KIND.collection, organization_id = %organization_id, filters = filters.len()),
        err
    )]
    async fn list(&self, organization_id: OrganizationId, filters: &[FieldFilter]) -> Result<Vec<R>, StoreError> {
        let mut qb = select_query(R::KIND.collection, organization_id, filters);
        qb.push(" ORDER BY t.created_at DESC, t.id DESC");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_records", e))?;
        rows.iter().map(decode::<R>).collect()
    }

    #[instrument(
        skip(self),
        fields(table = R::KIND.collection, organization_id = %organization_id, id = %id),
        err
    )]
    async fn get(&self, organization_id: OrganizationId, id: RecordId) -> Result<Option<R>, StoreError> {
        let mut qb = select_query(R::KIND.collection, organization_id, &[]);
        qb.push(" AND t.id = ");
        qb.push_bind(*id.as_uuid());

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_record", e))?;
        row.as_ref().map(decode::<R>).transpose()
    }

    #[instrument(
        skip(self, record),
        fields(table = R::KIND.collection, organization_id = %record.organization_id(), id = %record.id()),
        err
    )]
    async fn insert(&self, record: R) -> Result<R, StoreError> {
        let doc = serde_json::to_value(&record).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        let table = R::KIND.collection;

        let row = sqlx::query(&format!(
            "INSERT INTO {table} AS t SELECT * FROM jsonb_populate_record(NULL::{table}, $1) RETURNING to_jsonb(t) AS doc"
        ))
        .bind(doc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_record", e))?;
        decode(&row)
    }

    #[instrument(
        skip(self, patch),
        fields(table = R::KIND.collection, organization_id = %organization_id, id = %id),
        err
    )]
    async fn update(
        &self,
        organization_id: OrganizationId,
        id: RecordId,
        patch: &R::Patch,
    ) -> Result<Option<R>, StoreError> {
        let changes = patch_document(patch).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        if changes.is_empty() {
            return self.get(organization_id, id).await;
        }
        let table = R::KIND.collection;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_update", e))?;

        let mut qb = select_query(table, organization_id, &[]);
        qb.push(" AND t.id = ");
        qb.push_bind(*id.as_uuid());
        qb.push(" FOR UPDATE");
        let row = qb
            .build()
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_record", e))?;
        let Some(row) = row else {
            return Ok(None);
        };

        // Merge and validate before anything is written.
        let current: R = decode(&row)?;
        let updated = current
            .patched(patch)
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        let merged = serde_json::to_value(&updated).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        let mut qb = update_query(table, changes.keys().map(String::as_str))?;
        qb.push_bind(merged);
        qb.push(") AS p WHERE t.organization_id = ");
        qb.push_bind(*organization_id.as_uuid());
        qb.push(" AND t.id = ");
        qb.push_bind(*id.as_uuid());
        qb.push(" RETURNING to_jsonb(t) AS doc");

        let row = qb
            .build()
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_record", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_update", e))?;
        decode(&row).map(Some)
    }

    #[instrument(
        skip(self),
        fields(table = R::KIND.collection, organization_id = %organization_id, id = %id),
        err
    )]
    async fn delete(&self, organization_id: OrganizationId, id: RecordId) -> Result<bool, StoreError> {
        let table = R::KIND.collection;
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE organization_id = $1 AND id = $2"))
            .bind(organization_id.as_uuid())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_record", e))?;
        Ok(result.rows_affected() > 0)
    }
}
