use std::sync::Arc;

use galley_infra::store::{Database, InMemoryDatabase, PostgresDatabase, StoreError};
use galley_infra::{
    AppConfig, CustomerStore, ImageStore, InMemoryCustomerStore, InMemoryImageStore, InventoryPolicy,
    InventoryService, LocalImageStore, RecipeCoordinator,
};

/// Everything the handlers need.
#[derive(Clone)]
pub struct AppServices {
    pub inventory: InventoryService,
    pub recipes: RecipeCoordinator,
    pub customers: Arc<dyn CustomerStore>,
}

impl AppServices {
    pub fn new(db: Arc<dyn Database>, images: Arc<dyn ImageStore>, policy: InventoryPolicy) -> Self {
        Self {
            inventory: InventoryService::new(db.clone(), policy),
            recipes: RecipeCoordinator::new(db, images, policy),
            customers: Arc::new(InMemoryCustomerStore::new()),
        }
    }

    /// Fully in-memory services (tests/dev).
    pub fn in_memory(policy: InventoryPolicy) -> Self {
        Self::new(
            Arc::new(InMemoryDatabase::new()),
            Arc::new(InMemoryImageStore::new()),
            policy,
        )
    }
}

/// Wire services from configuration: Postgres when `database.url` is set,
/// the in-memory store otherwise. Images always go to `images.root`.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let images: Arc<dyn ImageStore> = Arc::new(LocalImageStore::new(config.images.root.clone()));

    let db: Arc<dyn Database> = match &config.database.url {
        Some(url) => {
            let db = PostgresDatabase::connect(url, config.database.max_connections).await?;
            tracing::info!("using postgres store");
            Arc::new(db)
        }
        None => {
            tracing::warn!("database.url not set; using in-memory store");
            Arc::new(InMemoryDatabase::new())
        }
    };

    Ok(AppServices::new(db, images, config.inventory))
}
