//! Space ownership: who may modify a space, and minting new spaces.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use db::models::{
    signed::{RegisterSpaceRequest, RegisterSpaceResponse},
    space_registration::{CreateSpaceRegistration, SpaceRegistration},
};
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::signing::SignatureVerifier;

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Resolves the identities currently allowed to modify a space.
#[async_trait]
pub trait SpaceAuthorizer: Send + Sync {
    async fn identities_can_modify_space(
        &self,
        space_id: &str,
        network: Option<&str>,
    ) -> Result<Vec<String>, AuthorizationError>;
}

pub type DynSpaceAuthorizer = Arc<dyn SpaceAuthorizer>;

/// Authorization backed by the `space_registrations` table.
#[derive(Clone)]
pub struct SqliteSpaceAuthorizer {
    pool: SqlitePool,
}

impl SqliteSpaceAuthorizer {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SpaceAuthorizer for SqliteSpaceAuthorizer {
    async fn identities_can_modify_space(
        &self,
        space_id: &str,
        network: Option<&str>,
    ) -> Result<Vec<String>, AuthorizationError> {
        Ok(SpaceRegistration::find_identities(&self.pool, space_id, network).await?)
    }
}

#[derive(Debug, Error)]
pub enum SpaceRegistrationError {
    #[error("invalid registration: {0}")]
    InvalidShape(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct SpaceRegistryService {
    pool: SqlitePool,
    verifier: Arc<dyn SignatureVerifier>,
}

impl SpaceRegistryService {
    pub fn new(pool: SqlitePool, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { pool, verifier }
    }

    /// Mint a new space owned by the signing identity.
    pub async fn register_space(
        &self,
        body: Value,
    ) -> Result<RegisterSpaceResponse, SpaceRegistrationError> {
        let request: RegisterSpaceRequest = serde_json::from_value(body.clone())
            .map_err(|e| SpaceRegistrationError::InvalidShape(e.to_string()))?;

        if request.space_name.trim().is_empty() {
            return Err(SpaceRegistrationError::InvalidShape(
                "spaceName must not be empty".to_string(),
            ));
        }
        if DateTime::parse_from_rfc3339(&request.timestamp).is_err() {
            return Err(SpaceRegistrationError::InvalidShape(format!(
                "timestamp is not RFC 3339: {}",
                request.timestamp
            )));
        }

        if !self.verifier.verify(&body, "identityPublicKey") {
            warn!(
                identity = %request.identity_public_key,
                "Space registration rejected: invalid signature"
            );
            return Err(SpaceRegistrationError::InvalidSignature);
        }

        let space_id = Uuid::new_v4().to_string();
        SpaceRegistration::create(
            &self.pool,
            &CreateSpaceRegistration {
                space_id: space_id.clone(),
                space_name: request.space_name.clone(),
                identity_public_key: request.identity_public_key.clone(),
                network: request.network.clone(),
                timestamp: request.timestamp.clone(),
                signature: request.signature.clone(),
            },
        )
        .await?;

        info!(
            space_id = %space_id,
            space_name = %request.space_name,
            identity = %request.identity_public_key,
            "Registered space"
        );

        Ok(RegisterSpaceResponse { space_id })
    }
}
