use std::sync::Arc;

use crm_infra::db::PgPool;
use tracing::{info, warn};

use crm_accounting::Expense;
use crm_auth::Hs256TokenVerifier;
use crm_core::{OrganizationId, Reference};
use crm_infra::{
    ApiConfig, Bootstrapper, IdentityProvider, InMemoryIdentityProvider, InMemoryRecordStore,
    InMemoryTenantDirectory, PostgresRecordStore, PostgresTenantDirectory, RecordStore,
    StoreError, SupabaseIdentityProvider, TenantDirectory, db,
};
use crm_invoicing::Invoice;
use crm_parties::{Account, Contact};
use crm_sales::{Activity, Lead, Opportunity};

/// One store per business entity.
#[derive(Clone)]
pub struct RecordStores {
    pub accounts: Arc<dyn RecordStore<Account>>,
    pub contacts: Arc<dyn RecordStore<Contact>>,
    pub leads: Arc<dyn RecordStore<Lead>>,
    pub opportunities: Arc<dyn RecordStore<Opportunity>>,
    pub activities: Arc<dyn RecordStore<Activity>>,
    pub invoices: Arc<dyn RecordStore<Invoice>>,
    pub expenses: Arc<dyn RecordStore<Expense>>,
}

impl RecordStores {
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(InMemoryRecordStore::new()),
            contacts: Arc::new(InMemoryRecordStore::new()),
            leads: Arc::new(InMemoryRecordStore::new()),
            opportunities: Arc::new(InMemoryRecordStore::new()),
            activities: Arc::new(InMemoryRecordStore::new()),
            invoices: Arc::new(InMemoryRecordStore::new()),
            expenses: Arc::new(InMemoryRecordStore::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(PostgresRecordStore::new(pool.clone())),
            contacts: Arc::new(PostgresRecordStore::new(pool.clone())),
            leads: Arc::new(PostgresRecordStore::new(pool.clone())),
            opportunities: Arc::new(PostgresRecordStore::new(pool.clone())),
            activities: Arc::new(PostgresRecordStore::new(pool.clone())),
            invoices: Arc::new(PostgresRecordStore::new(pool.clone())),
            expenses: Arc::new(PostgresRecordStore::new(pool)),
        }
    }

    /// Whether `reference` names an existing record of this organization.
    /// Unknown collections never resolve.
    pub async fn resolves(
        &self,
        organization_id: OrganizationId,
        reference: &Reference,
    ) -> Result<bool, StoreError> {
        let (org, id) = (organization_id, reference.id);
        let found = match reference.collection {
            "accounts" => self.accounts.get(org, id).await?.is_some(),
            "contacts" => self.contacts.get(org, id).await?.is_some(),
            "leads" => self.leads.get(org, id).await?.is_some(),
            "opportunities" => self.opportunities.get(org, id).await?.is_some(),
            "activities" => self.activities.get(org, id).await?.is_some(),
            "invoices" => self.invoices.get(org, id).await?.is_some(),
            "expenses" => self.expenses.get(org, id).await?.is_some(),
            _ => false,
        };
        Ok(found)
    }
}

#[derive(Clone)]
pub struct AppServices {
    pub directory: Arc<dyn TenantDirectory>,
    pub identities: Arc<dyn IdentityProvider>,
    pub bootstrapper: Bootstrapper,
    pub records: RecordStores,
}

impl AppServices {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        identities: Arc<dyn IdentityProvider>,
        records: RecordStores,
    ) -> Self {
        Self {
            bootstrapper: Bootstrapper::new(directory.clone(), identities.clone()),
            directory,
            identities,
            records,
        }
    }

    /// Everything in memory (tests/dev).
    pub fn in_memory(identities: Arc<dyn IdentityProvider>) -> Self {
        Self::new(
            Arc::new(InMemoryTenantDirectory::new()),
            identities,
            RecordStores::in_memory(),
        )
    }
}

/// Wire adapters from configuration: Postgres when `DATABASE_URL` is set,
/// Supabase Auth when `SUPABASE_URL` is set, in-memory otherwise.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let verifier = Hs256TokenVerifier::new(&config.jwt_secret, config.jwt_audience.as_deref());

    let identities: Arc<dyn IdentityProvider> = match &config.supabase {
        Some(supabase) => Arc::new(SupabaseIdentityProvider::new(
            &supabase.url,
            supabase.service_role_key.clone(),
            verifier,
        )?),
        None => {
            warn!("SUPABASE_URL not set; using in-memory identity provider");
            Arc::new(InMemoryIdentityProvider::new(verifier))
        }
    };

    match &config.database_url {
        Some(url) => {
            let pool = db::connect(url).await?;
            info!("connected to postgres");
            Ok(AppServices::new(
                Arc::new(PostgresTenantDirectory::new(pool.clone())),
                identities,
                RecordStores::postgres(pool),
            ))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory stores");
            Ok(AppServices::in_memory(identities))
        }
    }
}
