use std::collections::HashMap;
use std::sync::RwLock;

use crm_core::{FieldFilter, OrganizationId, RecordId, Resource};

use super::RecordStore;
use crate::error::StoreError;

/// In-memory tenant-isolated store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRecordStore<R> {
    inner: RwLock<HashMap<(OrganizationId, RecordId), R>>,
}

impl<R> InMemoryRecordStore<R> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<R> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("record store lock poisoned".to_string())
}

fn matches_all<R: Resource>(record: &R, filters: &[FieldFilter]) -> Result<bool, StoreError> {
    if filters.is_empty() {
        return Ok(true);
    }
    let doc = serde_json::to_value(record).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
    Ok(filters.iter().all(|f| f.matches(&doc)))
}

#[async_trait::async_trait]
impl<R: Resource> RecordStore<R> for InMemoryRecordStore<R> {
    async fn list(&self, organization_id: OrganizationId, filters: &[FieldFilter]) -> Result<Vec<R>, StoreError> {
        let map = self.inner.read().map_err(poisoned)?;
        let mut records = Vec::new();
        for ((org, _id), record) in map.iter() {
            if *org == organization_id && matches_all(record, filters)? {
                records.push(record.clone());
            }
        }
        // v7 ids are time-ordered, which breaks created_at ties deterministically.
        records.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().as_uuid().cmp(a.id().as_uuid()))
        });
        Ok(records)
    }

    async fn get(&self, organization_id: OrganizationId, id: RecordId) -> Result<Option<R>, StoreError> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.get(&(organization_id, id)).cloned())
    }

    async fn insert(&self, record: R) -> Result<R, StoreError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let key = (record.organization_id(), record.id());
        if map.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{} {} already exists", R::KIND.label, record.id())));
        }
        map.insert(key, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        organization_id: OrganizationId,
        id: RecordId,
        patch: &R::Patch,
    ) -> Result<Option<R>, StoreError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let Some(current) = map.get_mut(&(organization_id, id)) else {
            return Ok(None);
        };
        let updated = current
            .patched(patch)
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        *current = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, organization_id: OrganizationId, id: RecordId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        Ok(map.remove(&(organization_id, id)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::{RecordMeta, SubjectId};
    use crm_parties::{Account, AccountPatch, Contact, NewAccount, NewContact};
    use serde_json::json;

    fn account(org: OrganizationId, name: &str) -> Account {
        let draft: NewAccount = serde_json::from_value(json!({ "name": name })).unwrap();
        Account::from_draft(RecordMeta::new(org, SubjectId::parse("u1").unwrap()), draft).unwrap()
    }

    #[tokio::test]
    async fn reads_are_tenant_isolated() {
        let store = InMemoryRecordStore::<Account>::new();
        let tenant_a = OrganizationId::new();
        let tenant_b = OrganizationId::new();

        let a = store.insert(account(tenant_a, "Initech")).await.unwrap();
        store.insert(account(tenant_b, "Globex")).await.unwrap();

        assert!(store.get(tenant_b, a.id()).await.unwrap().is_none());
        assert!(!store.delete(tenant_b, a.id()).await.unwrap());
        let patch = AccountPatch {
            name: Some("Stolen".into()),
            ..Default::default()
        };
        assert!(store.update(tenant_b, a.id(), &patch).await.unwrap().is_none());

        let listed = store.list(tenant_a, &[]).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Initech");
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = InMemoryRecordStore::<Account>::new();
        let org = OrganizationId::new();
        for name in ["first", "second", "third"] {
            store.insert(account(org, name)).await.unwrap();
        }
        let names: Vec<String> = store
            .list(org, &[])
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn list_applies_field_filters() {
        let store = InMemoryRecordStore::<Contact>::new();
        let org = OrganizationId::new();
        let parent = crm_core::RecordId::new();

        for (first, account_id) in [("Ada", Some(parent)), ("Bob", None)] {
            let draft: NewContact = serde_json::from_value(json!({
                "first_name": first,
                "last_name": "Test",
                "account_id": account_id,
            }))
            .unwrap();
            let contact =
                Contact::from_draft(RecordMeta::new(org, SubjectId::parse("u1").unwrap()), draft).unwrap();
            store.insert(contact).await.unwrap();
        }

        let filtered = store
            .list(org, &[FieldFilter::new("account_id", parent)])
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].first_name, "Ada");
    }

    #[tokio::test]
    async fn update_merges_patch() {
        let store = InMemoryRecordStore::<Account>::new();
        let org = OrganizationId::new();
        let created = store.insert(account(org, "Initech")).await.unwrap();

        let patch: AccountPatch = serde_json::from_value(json!({ "city": "Austin" })).unwrap();
        let updated = store.update(org, created.id(), &patch).await.unwrap().unwrap();
        assert_eq!(updated.name, "Initech");
        assert_eq!(updated.city.as_deref(), Some("Austin"));
        assert_eq!(store.get(org, created.id()).await.unwrap(), Some(updated));
    }
}
