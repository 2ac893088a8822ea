//! Signed update / rename / delete of the tabs belonging to a space.
//!
//! Tabs live in the blob store at `{spaceId}/tabs/{tabName}` and the tab
//! order at `{spaceId}/tabOrder`, both as the canonical JSON the client
//! signed. Every mutation is checked for shape, signature and authorization
//! before the store is touched. Writes are upserts, so concurrent writers to
//! the same tab resolve to last write wins.

use std::sync::Arc;

use chrono::DateTime;
use db::models::{
    signed::{DeleteTabRequest, SignedFile, UpdateTabOrderRequest, UpdateTabRequest},
    tab_config::{TabConfiguration, TabOrder},
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use utils::canonical;

use super::{
    blob_store::{BlobStoreError, DynBlobStore},
    layout_repair,
    signing::{PUBLIC_KEY_FIELD, SignatureVerifier},
    space_registry::{AuthorizationError, DynSpaceAuthorizer},
};

#[derive(Debug, Error)]
pub enum TabPersistenceError {
    #[error("invalid request: {0}")]
    InvalidShape(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("identity {public_key} cannot modify space {space_id}")]
    Unauthorized { public_key: String, space_id: String },
    #[error("request mismatch: {0}")]
    Mismatch(String),
    #[error("tab not found: {0}")]
    NotFound(String),
    #[error("failed to rename tab: {0}")]
    Rename(BlobStoreError),
    #[error("storage error: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("authorization lookup failed: {0}")]
    Authorization(#[from] AuthorizationError),
    #[error("stored document is corrupt: {0}")]
    CorruptDocument(String),
}

pub fn tab_key(space_id: &str, tab_name: &str) -> String {
    format!("{space_id}/tabs/{tab_name}")
}

pub fn tab_order_key(space_id: &str) -> String {
    format!("{space_id}/tabOrder")
}

#[derive(Clone)]
pub struct TabService {
    store: DynBlobStore,
    authorizer: DynSpaceAuthorizer,
    verifier: Arc<dyn SignatureVerifier>,
}

impl TabService {
    pub fn new(
        store: DynBlobStore,
        authorizer: DynSpaceAuthorizer,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            store,
            authorizer,
            verifier,
        }
    }

    /// Create or replace a tab, renaming it first when the signed file names
    /// a different tab than the route.
    pub async fn update_tab(
        &self,
        space_id: &str,
        tab_name: &str,
        body: Value,
    ) -> Result<(), TabPersistenceError> {
        validate_path_segment("spaceId", space_id)?;
        validate_path_segment("tabName", tab_name)?;

        let request: UpdateTabRequest = parse_body(&body)?;
        let file = &request.file;
        validate_timestamp(&file.timestamp)?;
        if file.is_encrypted {
            return Err(TabPersistenceError::InvalidShape(
                "tab files must not be encrypted".to_string(),
            ));
        }
        let target_name = file.file_name.as_deref().unwrap_or(tab_name);
        validate_path_segment("fileName", target_name)?;
        let mut config: TabConfiguration = serde_json::from_str(&file.file_data).map_err(|e| {
            TabPersistenceError::InvalidShape(format!("fileData is not a tab configuration: {e}"))
        })?;

        // The network hint rides next to the signed file and is not signed.
        let mut signed_part = body;
        if let Value::Object(map) = &mut signed_part {
            map.remove("network");
        }
        if !self.verifier.verify(&signed_part, PUBLIC_KEY_FIELD) {
            warn!(space_id = %space_id, tab = %tab_name, "Tab update rejected: invalid signature");
            return Err(TabPersistenceError::InvalidSignature);
        }

        self.ensure_authorized(space_id, &file.public_key, request.network.as_deref())
            .await?;

        if layout_repair::repair_tab(&mut config) {
            warn!(
                space_id = %space_id,
                tab = %target_name,
                "Saving tab whose layout is not structurally valid"
            );
        }

        if target_name != tab_name {
            self.rename_tab(space_id, tab_name, target_name).await?;
        }

        let document = canonical::stringify_value(&signed_part);
        self.store
            .upload(&tab_key(space_id, target_name), document.into_bytes(), true)
            .await?;

        info!(
            space_id = %space_id,
            tab = %target_name,
            renamed_from = (target_name != tab_name).then_some(tab_name),
            "Tab saved"
        );
        Ok(())
    }

    async fn rename_tab(
        &self,
        space_id: &str,
        from: &str,
        to: &str,
    ) -> Result<(), TabPersistenceError> {
        match self
            .store
            .move_object(&tab_key(space_id, from), &tab_key(space_id, to))
            .await
        {
            Ok(()) => {
                debug!(space_id = %space_id, from = %from, to = %to, "Tab renamed");
                Ok(())
            }
            // A tab renamed before its first save has nothing to move.
            Err(e) if e.is_not_found() => {
                debug!(
                    space_id = %space_id,
                    from = %from,
                    to = %to,
                    "Rename source not committed yet, writing directly"
                );
                Ok(())
            }
            Err(e) => {
                warn!(space_id = %space_id, from = %from, to = %to, error = %e, "Tab rename failed");
                Err(TabPersistenceError::Rename(e))
            }
        }
    }

    pub async fn delete_tab(
        &self,
        space_id: &str,
        tab_name: &str,
        body: Value,
    ) -> Result<(), TabPersistenceError> {
        let request: DeleteTabRequest = parse_body(&body)?;
        validate_timestamp(&request.timestamp)?;

        self.ensure_authorized(space_id, &request.public_key, request.network.as_deref())
            .await?;

        if !self.verifier.verify(&body, PUBLIC_KEY_FIELD) {
            warn!(space_id = %space_id, tab = %tab_name, "Tab delete rejected: invalid signature");
            return Err(TabPersistenceError::InvalidSignature);
        }

        if request.space_id != space_id {
            return Err(TabPersistenceError::Mismatch(format!(
                "spaceId {} does not match route {}",
                request.space_id, space_id
            )));
        }
        if request.tab_name != tab_name {
            return Err(TabPersistenceError::Mismatch(format!(
                "tabName {} does not match route {}",
                request.tab_name, tab_name
            )));
        }

        let removed = self.store.remove(&[tab_key(space_id, tab_name)]).await?;
        info!(
            space_id = %space_id,
            tab = %tab_name,
            existed = !removed.is_empty(),
            "Tab deleted"
        );
        Ok(())
    }

    pub async fn get_tab(
        &self,
        space_id: &str,
        tab_name: &str,
    ) -> Result<SignedFile, TabPersistenceError> {
        let key = tab_key(space_id, tab_name);
        let bytes = self
            .store
            .download(&key)
            .await?
            .ok_or_else(|| TabPersistenceError::NotFound(key.clone()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(key = %key, error = %e, "Stored tab could not be parsed");
            TabPersistenceError::CorruptDocument(key)
        })
    }

    /// Tab names of a space in display order. Any failure yields an empty list.
    pub async fn read_tab_order(&self, space_id: &str) -> Vec<String> {
        let key = tab_order_key(space_id);
        let bytes = match self.store.download(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(space_id = %space_id, error = %e, "Failed to fetch tab order");
                return Vec::new();
            }
        };
        match serde_json::from_slice::<TabOrder>(&bytes) {
            Ok(order) => order.tab_order,
            Err(e) => {
                warn!(space_id = %space_id, error = %e, "Stored tab order is malformed");
                Vec::new()
            }
        }
    }

    pub async fn update_tab_order(
        &self,
        space_id: &str,
        body: Value,
    ) -> Result<(), TabPersistenceError> {
        validate_path_segment("spaceId", space_id)?;
        let request: UpdateTabOrderRequest = parse_body(&body)?;
        validate_timestamp(&request.timestamp)?;
        for name in &request.tab_order {
            validate_path_segment("tabOrder entry", name)?;
        }

        if !self.verifier.verify(&body, PUBLIC_KEY_FIELD) {
            warn!(space_id = %space_id, "Tab order update rejected: invalid signature");
            return Err(TabPersistenceError::InvalidSignature);
        }

        self.ensure_authorized(space_id, &request.public_key, request.network.as_deref())
            .await?;

        if request.space_id != space_id {
            return Err(TabPersistenceError::Mismatch(format!(
                "spaceId {} does not match route {}",
                request.space_id, space_id
            )));
        }

        let document = canonical::stringify_value(&body);
        self.store
            .upload(&tab_order_key(space_id), document.into_bytes(), true)
            .await?;

        info!(space_id = %space_id, tabs = request.tab_order.len(), "Tab order saved");
        Ok(())
    }

    async fn ensure_authorized(
        &self,
        space_id: &str,
        public_key: &str,
        network: Option<&str>,
    ) -> Result<(), TabPersistenceError> {
        let identities = self
            .authorizer
            .identities_can_modify_space(space_id, network)
            .await?;
        if identities.iter().any(|identity| identity == public_key) {
            return Ok(());
        }
        warn!(
            space_id = %space_id,
            public_key = %public_key,
            "Identity not authorized to modify space"
        );
        Err(TabPersistenceError::Unauthorized {
            public_key: public_key.to_string(),
            space_id: space_id.to_string(),
        })
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Value) -> Result<T, TabPersistenceError> {
    T::deserialize(body).map_err(|e| TabPersistenceError::InvalidShape(e.to_string()))
}

fn validate_timestamp(timestamp: &str) -> Result<(), TabPersistenceError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|_| ())
        .map_err(|_| TabPersistenceError::InvalidShape(format!("timestamp is not RFC 3339: {timestamp}")))
}

fn validate_path_segment(field: &str, value: &str) -> Result<(), TabPersistenceError> {
    if value.trim().is_empty() {
        return Err(TabPersistenceError::InvalidShape(format!("{field} must not be empty")));
    }
    if value.contains('/') {
        return Err(TabPersistenceError::InvalidShape(format!(
            "{field} must not contain '/': {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use db::models::{fidget::{FidgetInstanceDatum, FidgetType}, grid_layout::GridItem};
    use ed25519_dalek::SigningKey;
    use serde_json::json;

    use super::*;
    use crate::services::{
        blob_store::{BlobStore, MemoryBlobStore},
        signing::{Ed25519Verifier, public_key_hex, sign_value},
    };

    const SPACE: &str = "space-1";
    const TIMESTAMP: &str = "2025-03-01T12:00:00.000Z";

    struct StaticAuthorizer(Vec<String>);

    #[async_trait]
    impl crate::services::space_registry::SpaceAuthorizer for StaticAuthorizer {
        async fn identities_can_modify_space(
            &self,
            _space_id: &str,
            _network: Option<&str>,
        ) -> Result<Vec<String>, AuthorizationError> {
            Ok(self.0.clone())
        }
    }

    /// Store whose moves always fail with a backend error.
    struct BrokenMoveStore(MemoryBlobStore);

    #[async_trait]
    impl BlobStore for BrokenMoveStore {
        async fn download(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
            self.0.download(key).await
        }
        async fn upload(&self, key: &str, data: Vec<u8>, upsert: bool) -> Result<(), BlobStoreError> {
            self.0.upload(key, data, upsert).await
        }
        async fn move_object(&self, _from: &str, _to: &str) -> Result<(), BlobStoreError> {
            Err(BlobStoreError::Backend("bucket offline".to_string()))
        }
        async fn remove(&self, keys: &[String]) -> Result<Vec<String>, BlobStoreError> {
            self.0.remove(keys).await
        }
    }

    fn owner() -> SigningKey {
        SigningKey::from_bytes(&[1u8; 32])
    }

    fn service_with(store: Arc<dyn BlobStore>, owner: &SigningKey) -> TabService {
        TabService::new(
            store,
            Arc::new(StaticAuthorizer(vec![public_key_hex(owner)])),
            Arc::new(Ed25519Verifier),
        )
    }

    fn sign(mut body: Value, key: &SigningKey) -> Value {
        body["signature"] = Value::String(sign_value(key, &body));
        body
    }

    fn tab_config() -> TabConfiguration {
        let mut config = TabConfiguration::default();
        config
            .fidget_instance_datums
            .insert("text:1".to_string(), FidgetInstanceDatum::new("text:1", FidgetType::Text));
        config.layout_mut().push(GridItem::new("text:1", 0, 0, 4, 2));
        config
    }

    fn signed_file(key: &SigningKey, file_name: &str) -> Value {
        sign(
            json!({
                "publicKey": public_key_hex(key),
                "fileData": serde_json::to_string(&tab_config()).unwrap(),
                "fileType": "json",
                "isEncrypted": false,
                "timestamp": TIMESTAMP,
                "fileName": file_name,
            }),
            key,
        )
    }

    fn delete_request(key: &SigningKey, space_id: &str, tab_name: &str) -> Value {
        sign(
            json!({
                "publicKey": public_key_hex(key),
                "timestamp": TIMESTAMP,
                "spaceId": space_id,
                "tabName": tab_name,
            }),
            key,
        )
    }

    #[tokio::test]
    async fn test_create_then_read_tab() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());

        service
            .update_tab(SPACE, "Home", signed_file(&owner(), "Home"))
            .await
            .unwrap();

        assert!(store.contains("space-1/tabs/Home"));
        let stored = service.get_tab(SPACE, "Home").await.unwrap();
        assert_eq!(stored.public_key, public_key_hex(&owner()));
        assert_eq!(stored.file_name.as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn test_stored_document_is_canonical() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());
        service
            .update_tab(SPACE, "Home", signed_file(&owner(), "Home"))
            .await
            .unwrap();

        let bytes = store.download("space-1/tabs/Home").await.unwrap().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(r#"{"fileData":"#));
        let reparsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(canonical::stringify_value(&reparsed), text);
    }

    #[tokio::test]
    async fn test_rename_of_uncommitted_tab_writes_new_key() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());

        service
            .update_tab(SPACE, "New Tab", signed_file(&owner(), "Gallery"))
            .await
            .unwrap();

        assert!(store.contains("space-1/tabs/Gallery"));
        assert!(!store.contains("space-1/tabs/New Tab"));
    }

    #[tokio::test]
    async fn test_rename_moves_existing_tab() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());
        service
            .update_tab(SPACE, "Home", signed_file(&owner(), "Home"))
            .await
            .unwrap();

        service
            .update_tab(SPACE, "Home", signed_file(&owner(), "Feed"))
            .await
            .unwrap();

        assert!(!store.contains("space-1/tabs/Home"));
        assert!(store.contains("space-1/tabs/Feed"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_rename_backend_failure_is_fatal() {
        let store = Arc::new(BrokenMoveStore(MemoryBlobStore::new()));
        let service = service_with(store.clone(), &owner());

        let err = service
            .update_tab(SPACE, "Home", signed_file(&owner(), "Feed"))
            .await
            .unwrap_err();
        assert!(matches!(err, TabPersistenceError::Rename(BlobStoreError::Backend(_))));
        assert!(store.0.is_empty());
    }

    #[tokio::test]
    async fn test_rename_onto_existing_tab_fails() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());
        for name in ["Home", "Feed"] {
            service
                .update_tab(SPACE, name, signed_file(&owner(), name))
                .await
                .unwrap();
        }

        let err = service
            .update_tab(SPACE, "Home", signed_file(&owner(), "Feed"))
            .await
            .unwrap_err();
        assert!(matches!(err, TabPersistenceError::Rename(BlobStoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_shape() {
        let service = service_with(Arc::new(MemoryBlobStore::new()), &owner());
        let err = service
            .update_tab(SPACE, "Home", json!({"publicKey": "aa", "fileData": "{}"}))
            .await
            .unwrap_err();
        assert!(matches!(err, TabPersistenceError::InvalidShape(_)));

        let mut encrypted = signed_file(&owner(), "Home");
        encrypted["isEncrypted"] = json!(true);
        let err = service.update_tab(SPACE, "Home", encrypted).await.unwrap_err();
        assert!(matches!(err, TabPersistenceError::InvalidShape(_)));

        let err = service
            .update_tab(SPACE, "Home", signed_file(&owner(), "a/b"))
            .await
            .unwrap_err();
        assert!(matches!(err, TabPersistenceError::InvalidShape(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_tampered_file() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());
        let mut body = signed_file(&owner(), "Home");
        body["fileData"] = json!("{}");

        let err = service.update_tab(SPACE, "Home", body).await.unwrap_err();
        assert!(matches!(err, TabPersistenceError::InvalidSignature));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_network_hint_is_not_signed() {
        let service = service_with(Arc::new(MemoryBlobStore::new()), &owner());
        let mut body = signed_file(&owner(), "Home");
        body["network"] = json!("base");
        service.update_tab(SPACE, "Home", body).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_rejects_unauthorized_signer() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());
        let stranger = SigningKey::from_bytes(&[2u8; 32]);

        let err = service
            .update_tab(SPACE, "Home", signed_file(&stranger, "Home"))
            .await
            .unwrap_err();
        assert!(matches!(err, TabPersistenceError::Unauthorized { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_tab() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());
        service
            .update_tab(SPACE, "Home", signed_file(&owner(), "Home"))
            .await
            .unwrap();

        service
            .delete_tab(SPACE, "Home", delete_request(&owner(), SPACE, "Home"))
            .await
            .unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            service.get_tab(SPACE, "Home").await,
            Err(TabPersistenceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_mismatch_leaves_tab() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());
        service
            .update_tab(SPACE, "Home", signed_file(&owner(), "Home"))
            .await
            .unwrap();

        let err = service
            .delete_tab(SPACE, "Home", delete_request(&owner(), SPACE, "Other"))
            .await
            .unwrap_err();
        assert!(matches!(err, TabPersistenceError::Mismatch(_)));

        let err = service
            .delete_tab(SPACE, "Home", delete_request(&owner(), "space-2", "Home"))
            .await
            .unwrap_err();
        assert!(matches!(err, TabPersistenceError::Mismatch(_)));
        assert!(store.contains("space-1/tabs/Home"));
    }

    #[tokio::test]
    async fn test_delete_requires_authorized_signature() {
        let service = service_with(Arc::new(MemoryBlobStore::new()), &owner());
        let stranger = SigningKey::from_bytes(&[2u8; 32]);
        let err = service
            .delete_tab(SPACE, "Home", delete_request(&stranger, SPACE, "Home"))
            .await
            .unwrap_err();
        assert!(matches!(err, TabPersistenceError::Unauthorized { .. }));

        let mut forged = delete_request(&owner(), SPACE, "Home");
        forged["timestamp"] = json!("2025-03-02T12:00:00.000Z");
        let err = service.delete_tab(SPACE, "Home", forged).await.unwrap_err();
        assert!(matches!(err, TabPersistenceError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_tab_order_round_trip() {
        let store = Arc::new(MemoryBlobStore::new());
        let service = service_with(store.clone(), &owner());
        assert!(service.read_tab_order(SPACE).await.is_empty());

        let body = sign(
            json!({
                "spaceId": SPACE,
                "tabOrder": ["Home", "Gallery"],
                "publicKey": public_key_hex(&owner()),
                "timestamp": TIMESTAMP,
            }),
            &owner(),
        );
        service.update_tab_order(SPACE, body).await.unwrap();
        assert_eq!(
            service.read_tab_order(SPACE).await,
            vec!["Home".to_string(), "Gallery".to_string()]
        );
    }

    #[tokio::test]
    async fn test_tab_order_rejects_other_space() {
        let service = service_with(Arc::new(MemoryBlobStore::new()), &owner());
        let body = sign(
            json!({
                "spaceId": "space-2",
                "tabOrder": ["Home"],
                "publicKey": public_key_hex(&owner()),
                "timestamp": TIMESTAMP,
            }),
            &owner(),
        );
        assert!(matches!(
            service.update_tab_order(SPACE, body).await,
            Err(TabPersistenceError::Mismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_tab_order_reads_empty() {
        let store = Arc::new(MemoryBlobStore::new());
        store
            .upload("space-1/tabOrder", b"not json".to_vec(), true)
            .await
            .unwrap();
        let service = service_with(store, &owner());
        assert!(service.read_tab_order(SPACE).await.is_empty());
    }
}
