//! JSON export of the whole store.

use crate::error::{Error, Result};
use crate::models::Record;
use crate::store::RecordStore;
use std::path::{Path, PathBuf};

/// File name exports are written under.
pub const EXPORT_FILE_NAME: &str = "accounts.json";

/// Media type of the export document.
pub const EXPORT_MEDIA_TYPE: &str = "application/json";

/// Pretty-printed JSON array of full records.
pub fn to_json(records: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Export every record in the store to `target`.
///
/// If `target` is an existing directory the file is written inside it as
/// [`EXPORT_FILE_NAME`]. Returns the path written and the number of records.
pub async fn export_to_path(store: &RecordStore, target: &Path) -> Result<(PathBuf, usize)> {
    let path = if tokio::fs::metadata(target)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        target.join(EXPORT_FILE_NAME)
    } else {
        target.to_path_buf()
    };

    let records = store.get_all().await;
    let json = to_json(&records)?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|source| Error::Export {
            path: path.clone(),
            source,
        })?;

    tracing::info!("Exported {} records to {}", records.len(), path.display());
    Ok((path, records.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordDraft, RecordKind, WebsiteAccount};
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn export_into_directory_uses_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::in_memory();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        store
            .create(RecordDraft {
                kind: RecordKind::Website(WebsiteAccount {
                    website_name: "GitHub".into(),
                    username: "octo".into(),
                    password: "pw".into(),
                    ..Default::default()
                }),
                created_at: at,
                updated_at: at,
            })
            .await
            .unwrap();

        let (path, count) = export_to_path(&store, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join(EXPORT_FILE_NAME));
        assert_eq!(count, 1);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {"));
        let parsed: Vec<Record> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, store.get_all().await);
    }

    #[tokio::test]
    async fn unwritable_target_is_an_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("out.json");

        let err = export_to_path(&RecordStore::in_memory(), &target)
            .await
            .unwrap_err();

        assert!(matches!(&err, Error::Export { path, .. } if *path == target));
        assert!(err.to_string().starts_with("failed to write export to "));
    }

    #[test]
    fn empty_store_exports_empty_array() {
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }
}
