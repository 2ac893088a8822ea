pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use db::DBService;
use services::services::{
    blob_store::{DynBlobStore, MemoryBlobStore, SqliteBlobStore},
    signing::{Ed25519Verifier, SignatureVerifier},
    space_registry::{SpaceRegistryService, SqliteSpaceAuthorizer},
    tab_persistence::TabService,
};

use crate::config::BlobStoreKind;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    tabs: TabService,
    registry: Arc<SpaceRegistryService>,
}

impl AppState {
    pub fn new(db: DBService, blob_store: BlobStoreKind) -> Self {
        let store: DynBlobStore = match blob_store {
            BlobStoreKind::Sqlite => Arc::new(SqliteBlobStore::new(db.pool.clone())),
            BlobStoreKind::Memory => Arc::new(MemoryBlobStore::new()),
        };
        Self::with_store(db, store)
    }

    pub fn with_store(db: DBService, store: DynBlobStore) -> Self {
        let verifier: Arc<dyn SignatureVerifier> = Arc::new(Ed25519Verifier);
        let authorizer = Arc::new(SqliteSpaceAuthorizer::new(db.pool.clone()));
        Self {
            tabs: TabService::new(store, authorizer, verifier.clone()),
            registry: Arc::new(SpaceRegistryService::new(db.pool.clone(), verifier)),
        }
    }

    pub fn tabs(&self) -> &TabService {
        &self.tabs
    }

    pub fn registry(&self) -> &SpaceRegistryService {
        &self.registry
    }
}
