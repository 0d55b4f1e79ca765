use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crm_auth::{DirectoryUser, DirectoryUserPatch, Organization, ProvisioningPlan, Role};
use crm_core::{OrganizationId, SubjectId};

use super::TenantDirectory;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Tables {
    organizations: HashMap<OrganizationId, Organization>,
    users: HashMap<SubjectId, DirectoryUser>,
}

/// In-memory directory for tests/dev.
///
/// Both tables sit behind one lock, so every provisioning write is a single
/// critical section.
#[derive(Debug, Default)]
pub struct InMemoryTenantDirectory {
    inner: RwLock<Tables>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of organizations ever created (tests use this to detect leaks).
    pub fn organization_count(&self) -> usize {
        self.inner.read().map(|t| t.organizations.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("directory lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("directory lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn find_user(&self, id: &SubjectId) -> Result<Option<DirectoryUser>, StoreError> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn list_users(&self, organization_id: OrganizationId) -> Result<Vec<DirectoryUser>, StoreError> {
        let tables = self.read()?;
        let mut members: Vec<DirectoryUser> = tables
            .users
            .values()
            .filter(|u| u.organization_id == Some(organization_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(members)
    }

    async fn insert_user(&self, user: DirectoryUser) -> Result<DirectoryUser, StoreError> {
        let mut tables = self.write()?;
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.id)));
        }
        if let Some(org) = user.organization_id {
            if !tables.organizations.contains_key(&org) {
                return Err(StoreError::InvalidRecord(format!("organization {org} does not exist")));
            }
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        organization_id: OrganizationId,
        id: &SubjectId,
        patch: &DirectoryUserPatch,
    ) -> Result<Option<DirectoryUser>, StoreError> {
        let mut tables = self.write()?;
        match tables.users.get_mut(id) {
            Some(user) if user.organization_id == Some(organization_id) => {
                patch.apply(user);
                Ok(Some(user.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_user(&self, organization_id: OrganizationId, id: &SubjectId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let member = tables
            .users
            .get(id)
            .is_some_and(|u| u.organization_id == Some(organization_id));
        if member {
            tables.users.remove(id);
        }
        Ok(member)
    }

    async fn find_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        Ok(self.read()?.organizations.get(&id).cloned())
    }

    async fn rename_organization(
        &self,
        id: OrganizationId,
        name: &str,
    ) -> Result<Option<Organization>, StoreError> {
        let mut tables = self.write()?;
        Ok(tables.organizations.get_mut(&id).map(|org| {
            org.name = name.to_string();
            org.clone()
        }))
    }

    async fn provision(&self, plan: ProvisioningPlan) -> Result<ProvisioningPlan, StoreError> {
        let mut tables = self.write()?;
        if tables.users.contains_key(&plan.user.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", plan.user.id)));
        }
        tables
            .organizations
            .insert(plan.organization.id, plan.organization.clone());
        tables.users.insert(plan.user.id.clone(), plan.user.clone());
        Ok(plan)
    }

    async fn attach_organization(
        &self,
        id: &SubjectId,
        organization: Organization,
        role: Role,
    ) -> Result<Option<DirectoryUser>, StoreError> {
        let mut tables = self.write()?;
        let Some(user) = tables.users.get_mut(id) else {
            return Ok(None);
        };
        if user.organization_id.is_some() {
            return Ok(None);
        }
        user.organization_id = Some(organization.id);
        user.role = role;
        let user = user.clone();
        tables.organizations.insert(organization.id, organization);
        Ok(Some(user))
    }
}
