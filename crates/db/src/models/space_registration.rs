use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// An identity that may modify a space, optionally scoped to one network.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct SpaceRegistration {
    pub id: Uuid,
    pub space_id: String,
    pub space_name: String,
    pub identity_public_key: String,
    pub network: Option<String>,
    pub timestamp: String,
    pub signature: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSpaceRegistration {
    pub space_id: String,
    pub space_name: String,
    pub identity_public_key: String,
    pub network: Option<String>,
    pub timestamp: String,
    pub signature: String,
}

impl SpaceRegistration {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateSpaceRegistration,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, SpaceRegistration>(
            r#"INSERT INTO space_registrations
                   (id, space_id, space_name, identity_public_key, network, timestamp, signature)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, space_id, space_name, identity_public_key, network,
                         timestamp, signature, created_at"#,
        )
        .bind(id)
        .bind(&data.space_id)
        .bind(&data.space_name)
        .bind(&data.identity_public_key)
        .bind(&data.network)
        .bind(&data.timestamp)
        .bind(&data.signature)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_space_id(
        pool: &SqlitePool,
        space_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SpaceRegistration>(
            r#"SELECT id, space_id, space_name, identity_public_key, network,
                      timestamp, signature, created_at
               FROM space_registrations
               WHERE space_id = $1
               ORDER BY created_at ASC"#,
        )
        .bind(space_id)
        .fetch_all(pool)
        .await
    }

    /// Public keys allowed to modify `space_id`.
    ///
    /// With a network, registrations for that network or for no network
    /// qualify. Without one, every registration of the space qualifies.
    pub async fn find_identities(
        pool: &SqlitePool,
        space_id: &str,
        network: Option<&str>,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"SELECT DISTINCT identity_public_key
               FROM space_registrations
               WHERE space_id = $1
                 AND ($2 IS NULL OR network IS NULL OR network = $2)
               ORDER BY identity_public_key"#,
        )
        .bind(space_id)
        .bind(network)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn registration(space_id: &str, key: &str, network: Option<&str>) -> CreateSpaceRegistration {
        CreateSpaceRegistration {
            space_id: space_id.to_string(),
            space_name: "home".to_string(),
            identity_public_key: key.to_string(),
            network: network.map(str::to_string),
            timestamp: "2025-03-01T00:00:00.000Z".to_string(),
            signature: "00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_identities_scoped_by_network() {
        let db = DBService::new_in_memory().await.unwrap();
        SpaceRegistration::create(&db.pool, &registration("s1", "owner", None))
            .await
            .unwrap();
        SpaceRegistration::create(&db.pool, &registration("s1", "base-admin", Some("base")))
            .await
            .unwrap();
        SpaceRegistration::create(&db.pool, &registration("s2", "stranger", None))
            .await
            .unwrap();

        let all = SpaceRegistration::find_identities(&db.pool, "s1", None)
            .await
            .unwrap();
        assert_eq!(all, vec!["base-admin".to_string(), "owner".to_string()]);

        let on_mainnet = SpaceRegistration::find_identities(&db.pool, "s1", Some("mainnet"))
            .await
            .unwrap();
        assert_eq!(on_mainnet, vec!["owner".to_string()]);

        let on_base = SpaceRegistration::find_identities(&db.pool, "s1", Some("base"))
            .await
            .unwrap();
        assert_eq!(on_base.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        SpaceRegistration::create(&db.pool, &registration("s1", "owner", None))
            .await
            .unwrap();
        assert!(
            SpaceRegistration::create(&db.pool, &registration("s1", "owner", None))
                .await
                .is_err()
        );
        let rows = SpaceRegistration::find_by_space_id(&db.pool, "s1").await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
