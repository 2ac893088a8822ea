//! Signed envelopes exchanged with clients.
//!
//! Every type here serializes to exactly the JSON object the client signed:
//! the signature covers the canonical form of the object with its
//! `signature` key removed.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A signed document. Tab files carry a serialized `TabConfiguration` in
/// `file_data` and are never encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SignedFile {
    pub public_key: String,
    pub file_data: String,
    pub file_type: String,
    pub is_encrypted: bool,
    pub timestamp: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Body of a tab update: the signed file plus an unsigned network hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTabRequest {
    #[serde(flatten)]
    #[ts(flatten)]
    pub file: SignedFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTabRequest {
    pub public_key: String,
    pub timestamp: String,
    pub space_id: String,
    pub tab_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTabOrderRequest {
    pub space_id: String,
    pub tab_order: Vec<String>,
    pub public_key: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    pub signature: String,
}

/// Request to mint a new space owned by `identity_public_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSpaceRequest {
    pub identity_public_key: String,
    pub space_name: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSpaceResponse {
    pub space_id: String,
}
