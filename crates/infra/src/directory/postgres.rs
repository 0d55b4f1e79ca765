//! Postgres-backed Tenant Directory (`organizations` and `users` tables).
//!
//! Provisioning runs inside a transaction. The primary key on `users.id`
//! serializes concurrent first-access requests for the same subject: the
//! loser's insert fails with `23505`, its transaction rolls back and its
//! organization is never committed.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crm_auth::{DirectoryUser, DirectoryUserPatch, Organization, ProvisioningPlan, Role};
use crm_core::{OrganizationId, SubjectId};

use super::TenantDirectory;
use crate::error::{StoreError, map_sqlx_error};

const USER_COLUMNS: &str = "id, email, full_name, role, organization_id, created_at";

#[derive(Debug, Clone)]
pub struct PostgresTenantDirectory {
    pool: PgPool,
}

impl PostgresTenantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row: {err}"))
}

fn user_from_row(row: &PgRow) -> Result<DirectoryUser, StoreError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let role: String = row.try_get("role").map_err(decode_error)?;
    let organization_id: Option<uuid::Uuid> = row.try_get("organization_id").map_err(decode_error)?;

    Ok(DirectoryUser {
        id: SubjectId::parse(id).map_err(|e| StoreError::Backend(e.to_string()))?,
        email: row.try_get("email").map_err(decode_error)?,
        full_name: row.try_get("full_name").map_err(decode_error)?,
        role: role.parse::<Role>().map_err(|e| StoreError::Backend(e.to_string()))?,
        organization_id: organization_id.map(OrganizationId::from_uuid),
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn organization_from_row(row: &PgRow) -> Result<Organization, StoreError> {
    let id: uuid::Uuid = row.try_get("id").map_err(decode_error)?;
    Ok(Organization {
        id: OrganizationId::from_uuid(id),
        name: row.try_get("name").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

async fn insert_organization<'e, E>(executor: E, org: &Organization) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query("INSERT INTO organizations (id, name, created_at) VALUES ($1, $2, $3)")
        .bind(org.id.as_uuid())
        .bind(&org.name)
        .bind(org.created_at)
        .execute(executor)
        .await
        .map_err(|e| map_sqlx_error("insert_organization", e))?;
    Ok(())
}

async fn insert_user_row<'e, E>(executor: E, user: &DirectoryUser) -> Result<DirectoryUser, StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let row = sqlx::query(&format!(
        "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
    ))
    .bind(user.id.as_str())
    .bind(&user.email)
    .bind(&user.full_name)
    .bind(user.role.as_str())
    .bind(user.organization_id.map(|id| *id.as_uuid()))
    .bind(user.created_at)
    .fetch_one(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_user", e))?;
    user_from_row(&row)
}

#[async_trait::async_trait]
impl TenantDirectory for PostgresTenantDirectory {
    #[instrument(skip(self), fields(subject = %id), err)]
    async fn find_user(&self, id: &SubjectId) -> Result<Option<DirectoryUser>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    async fn list_users(&self, organization_id: OrganizationId) -> Result<Vec<DirectoryUser>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE organization_id = $1 ORDER BY created_at ASC"
        ))
        .bind(organization_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, user), fields(subject = %user.id), err)]
    async fn insert_user(&self, user: DirectoryUser) -> Result<DirectoryUser, StoreError> {
        insert_user_row(&self.pool, &user).await
    }

    #[instrument(skip(self, patch), fields(organization_id = %organization_id, subject = %id), err)]
    async fn update_user(
        &self,
        organization_id: OrganizationId,
        id: &SubjectId,
        patch: &DirectoryUserPatch,
    ) -> Result<Option<DirectoryUser>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET role = COALESCE($3, role),
                full_name = COALESCE($4, full_name)
            WHERE organization_id = $1 AND id = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(organization_id.as_uuid())
        .bind(id.as_str())
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.full_name.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(organization_id = %organization_id, subject = %id), err)]
    async fn delete_user(&self, organization_id: OrganizationId, id: &SubjectId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE organization_id = $1 AND id = $2")
            .bind(organization_id.as_uuid())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(organization_id = %id), err)]
    async fn find_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        let row = sqlx::query("SELECT id, name, created_at FROM organizations WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_organization", e))?;
        row.as_ref().map(organization_from_row).transpose()
    }

    #[instrument(skip(self), fields(organization_id = %id), err)]
    async fn rename_organization(
        &self,
        id: OrganizationId,
        name: &str,
    ) -> Result<Option<Organization>, StoreError> {
        let row = sqlx::query("UPDATE organizations SET name = $2 WHERE id = $1 RETURNING id, name, created_at")
            .bind(id.as_uuid())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("rename_organization", e))?;
        row.as_ref().map(organization_from_row).transpose()
    }

    #[instrument(
        skip(self, plan),
        fields(subject = %plan.user.id, organization_id = %plan.organization.id),
        err
    )]
    async fn provision(&self, plan: ProvisioningPlan) -> Result<ProvisioningPlan, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // An early return drops `tx`, which rolls it back.
        insert_organization(&mut *tx, &plan.organization).await?;
        let user = insert_user_row(&mut *tx, &plan.user).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(ProvisioningPlan {
            organization: plan.organization,
            user,
        })
    }

    #[instrument(skip(self, organization), fields(subject = %id, organization_id = %organization.id), err)]
    async fn attach_organization(
        &self,
        id: &SubjectId,
        organization: Organization,
        role: Role,
    ) -> Result<Option<DirectoryUser>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        insert_organization(&mut *tx, &organization).await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET organization_id = $2, role = $3
            WHERE id = $1 AND organization_id IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.as_str())
        .bind(organization.id.as_uuid())
        .bind(role.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("attach_organization", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(None);
        };
        let user = user_from_row(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(Some(user))
    }
}
