use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::{Mutex, watch};

use crate::formats::Snapshot;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load_snapshot(&self) -> anyhow::Result<Snapshot>;
    /// Replaces the stored snapshot as a whole.
    async fn swap_snapshot(&self, snapshot: &Snapshot) -> anyhow::Result<()>;
    async fn load_hidden(&self) -> anyhow::Result<Vec<String>>;
    async fn hide(&self, id: &str) -> anyhow::Result<Vec<String>>;
    async fn clear_hidden(&self) -> anyhow::Result<()>;
    /// Revision counter bumped after every successful write.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

#[derive(Debug)]
pub struct LocalFsStore {
    base_dir: PathBuf,
    hidden_lock: Mutex<()>,
    revision: watch::Sender<u64>,
}

impl LocalFsStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            base_dir: base_dir.into(),
            hidden_lock: Mutex::new(()),
            revision,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn state_json_path(&self) -> PathBuf {
        self.base_dir.join("state.json")
    }

    fn hidden_json_path(&self) -> PathBuf {
        self.base_dir.join("hidden.json")
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

#[async_trait]
impl SnapshotStore for LocalFsStore {
    async fn load_snapshot(&self) -> anyhow::Result<Snapshot> {
        let path = self.state_json_path();
        let snapshot = read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?;
        Ok(snapshot.unwrap_or_default())
    }

    async fn swap_snapshot(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        write_json_atomic(&self.state_json_path(), snapshot)
            .await
            .context("write state.json")?;
        self.notify();
        Ok(())
    }

    async fn load_hidden(&self) -> anyhow::Result<Vec<String>> {
        let path = self.hidden_json_path();
        let hidden = read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?;
        Ok(hidden.unwrap_or_default())
    }

    async fn hide(&self, id: &str) -> anyhow::Result<Vec<String>> {
        let _guard = self.hidden_lock.lock().await;
        let mut hidden = self.load_hidden().await?;
        if !hidden.iter().any(|existing| existing == id) {
            hidden.push(id.to_owned());
            write_json_atomic(&self.hidden_json_path(), &hidden)
                .await
                .context("write hidden.json")?;
            self.notify();
        }
        Ok(hidden)
    }

    async fn clear_hidden(&self) -> anyhow::Result<()> {
        let _guard = self.hidden_lock.lock().await;
        write_json_atomic(&self.hidden_json_path(), &Vec::<String>::new())
            .await
            .context("write hidden.json")?;
        self.notify();
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
