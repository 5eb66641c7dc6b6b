//! Infrastructure layer: storage, the recipe/inventory coordinator, image
//! blobs and configuration.

pub mod blob;
pub mod config;
pub mod coordinator;
pub mod customer_store;
pub mod errors;
pub mod inventory_service;
pub mod policy;
pub mod store;

pub use blob::{BlobError, ImageStore, InMemoryImageStore, LocalImageStore, MAX_IMAGE_BYTES};
pub use config::AppConfig;
pub use coordinator::RecipeCoordinator;
pub use customer_store::{CustomerStore, InMemoryCustomerStore};
pub use errors::{ServiceError, ServiceResult};
pub use inventory_service::InventoryService;
pub use policy::InventoryPolicy;
