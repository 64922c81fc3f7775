use crate::errors::AppError;
use crate::store::Store;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{error, info};

pub async fn load_data(path: &Path) -> Store {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, Value>>(&bytes) {
            Ok(entries) => Store::from_entries(entries),
            Err(err) => {
                error!("failed to parse data file: {err}");
                Store::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("no data file at {}, starting empty", path.display());
            Store::new()
        }
        Err(err) => {
            error!("failed to read data file: {err}");
            Store::new()
        }
    }
}

pub async fn persist_data(path: &Path, store: &Store) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(store.entries()).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "water_tracker_{name}_{}_{nanos}.json",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn missing_file_loads_empty_store() {
        let store = load_data(&temp_path("missing")).await;
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty_store() {
        let path = temp_path("corrupt");
        fs::write(&path, b"{ not json").await.unwrap();
        let store = load_data(&path).await;
        assert!(store.entries().is_empty());
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn persisted_store_reloads() {
        let path = temp_path("roundtrip");
        let mut store = Store::new();
        store.set("waterlevel", json!(750));
        persist_data(&path, &store).await.unwrap();

        let loaded = load_data(&path).await;
        assert_eq!(loaded.get("waterlevel"), Some(&json!(750)));
        assert!(!loaded.is_dirty());
        let _ = fs::remove_file(&path).await;
    }
}
