// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential record CRUD operations.

use keyward_core::{CredentialRecord, KeywardError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Insert or replace the record for `webhook_id` in one statement.
///
/// A failure leaves any existing row untouched and is reported as
/// [`KeywardError::StoreWrite`].
pub async fn upsert_record(
    db: &Database,
    webhook_id: &str,
    config: &serde_json::Value,
    encrypted_credential: &[u8],
) -> Result<(), KeywardError> {
    let webhook_id = webhook_id.to_string();
    let config = serde_json::to_string(config).map_err(|e| KeywardError::StoreWrite {
        source: Box::new(e),
    })?;
    let encrypted_credential = encrypted_credential.to_vec();

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO credential_records (webhook_id, config, encrypted_credential, created_at, updated_at)
                 VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(webhook_id) DO UPDATE SET
                     config = excluded.config,
                     encrypted_credential = excluded.encrypted_credential,
                     updated_at = excluded.updated_at",
                params![webhook_id, config, encrypted_credential],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| KeywardError::StoreWrite {
            source: format!("{e}").into(),
        })
}

/// Get the record for `webhook_id`.
pub async fn get_record(
    db: &Database,
    webhook_id: &str,
) -> Result<Option<CredentialRecord>, KeywardError> {
    let id = webhook_id.to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.query_row(
                "SELECT webhook_id, config, encrypted_credential, created_at, updated_at
                 FROM credential_records WHERE webhook_id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    row.map(|(webhook_id, config, encrypted_credential, created_at, updated_at)| {
        let config = serde_json::from_str(&config).map_err(|e| KeywardError::Storage {
            source: Box::new(e),
        })?;
        Ok(CredentialRecord {
            webhook_id,
            config,
            encrypted_credential,
            created_at,
            updated_at,
        })
    })
    .transpose()
}

/// Delete the record for `webhook_id`. Returns whether a row was removed.
pub async fn delete_record(db: &Database, webhook_id: &str) -> Result<bool, KeywardError> {
    let id = webhook_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM credential_records WHERE webhook_id = ?1",
                params![id],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(|e| KeywardError::StoreWrite {
            source: format!("{e}").into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn insert_then_get() {
        let db = db().await;
        upsert_record(&db, "w1", &json!({"events": []}), b"vault:v1:aaa")
            .await
            .unwrap();

        let record = get_record(&db, "w1").await.unwrap().unwrap();
        assert_eq!(record.webhook_id, "w1");
        assert_eq!(record.config, json!({"events": []}));
        assert_eq!(record.encrypted_credential, b"vault:v1:aaa");
        assert!(!record.created_at.is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_wholesale() {
        let db = db().await;
        upsert_record(&db, "w1", &json!({"events": ["a"], "old": true}), b"first")
            .await
            .unwrap();
        let before = get_record(&db, "w1").await.unwrap().unwrap();

        upsert_record(&db, "w1", &json!({"events": ["b"]}), b"second")
            .await
            .unwrap();
        let after = get_record(&db, "w1").await.unwrap().unwrap();

        assert_eq!(after.config, json!({"events": ["b"]}));
        assert_eq!(after.encrypted_credential, b"second");
        assert_eq!(after.created_at, before.created_at);

        let rows: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM credential_records", [], |r| r.get(0))
            })
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        assert!(get_record(&db().await, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_record() {
        let db = db().await;
        upsert_record(&db, "w1", &json!({"v": 1}), b"original")
            .await
            .unwrap();

        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "CREATE TRIGGER reject_updates BEFORE UPDATE ON credential_records
                     BEGIN SELECT RAISE(ABORT, 'writes disabled'); END;",
                )
            })
            .await
            .unwrap();

        let err = upsert_record(&db, "w1", &json!({"v": 2}), b"replacement")
            .await
            .unwrap_err();
        assert!(matches!(err, KeywardError::StoreWrite { .. }));

        let record = get_record(&db, "w1").await.unwrap().unwrap();
        assert_eq!(record.config, json!({"v": 1}));
        assert_eq!(record.encrypted_credential, b"original");
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let db = db().await;
        upsert_record(&db, "w1", &json!({}), b"x").await.unwrap();
        assert!(delete_record(&db, "w1").await.unwrap());
        assert!(!delete_record(&db, "w1").await.unwrap());
        assert!(get_record(&db, "w1").await.unwrap().is_none());
    }
}
