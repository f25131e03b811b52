//! Optional snapshot persistence for election/scheduler state across
//! restarts. The core crate only depends on the [`Backend`] trait; the
//! binary wires a concrete backend in if the operator enables it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{GatewayError, Result};

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key == "." || key == ".." {
        return Err(GatewayError::Configuration(format!("invalid persistence key '{key}'")));
    }
    Ok(())
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;
    async fn save<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()>;
}

/// Persists each key as its own JSON file under `dir`, written via a
/// temp file in the same directory followed by an atomic rename so a
/// crash mid-write never leaves a half-written snapshot.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        Path::new(&self.dir).join(format!("{key}.json.tmp-{}", std::process::id()))
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        validate_key(key)?;
        let path = self.path_for(key);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(GatewayError::Io(err)),
        }
    }

    async fn save<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()> {
        validate_key(key)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(GatewayError::Io)?;

        let final_path = self.path_for(key);
        let tmp_path = self.tmp_path(key);

        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp_path, &bytes).await.map_err(GatewayError::Io)?;
        tokio::fs::rename(&tmp_path, &final_path).await.map_err(GatewayError::Io)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Snapshot {
        name: String,
        score: f64,
    }

    #[tokio::test]
    async fn round_trips_through_save_and_load() {
        let dir = std::env::temp_dir().join(format!("gateway-persistence-test-{}", uuid::Uuid::new_v4()));
        let backend = FileBackend::new(&dir);

        let snapshot = Snapshot {
            name: "solo".to_string(),
            score: 91.5,
        };
        backend.save("election", &snapshot).await.unwrap();

        let loaded: Option<Snapshot> = backend.load("election").await.unwrap();
        assert_eq!(loaded, Some(snapshot));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn missing_key_loads_as_none() {
        let dir = std::env::temp_dir().join(format!("gateway-persistence-test-{}", uuid::Uuid::new_v4()));
        let backend = FileBackend::new(&dir);

        let loaded: Option<Snapshot> = backend.load("nothing-here").await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn rejects_keys_with_path_separators() {
        let dir = std::env::temp_dir().join(format!("gateway-persistence-test-{}", uuid::Uuid::new_v4()));
        let backend = FileBackend::new(&dir);

        let result = backend.save("../escape", &Snapshot { name: "x".into(), score: 0.0 }).await;
        assert!(result.is_err());
    }
}
