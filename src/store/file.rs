//! File-backed conversation store: one JSON document per session.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ConductorConfig;
use crate::error::{ConductorError, Result};
use crate::types::{AgentId, ConversationId, ConversationSession, ExchangeItem, NewExchangeItem};

use super::memory::SessionRecord;
use super::ConversationStore;

const FILE_VERSION: u32 = 1;

/// Conversation store persisting each session under `<base_dir>/conversations/`.
///
/// Writes go through a temp file and a rename, so a session document is
/// never observed half-written. All writes in one process are serialized.
///
/// # Example
/// ```no_run
/// use conductor::store::{ConversationStore, FileConversationStore};
///
/// # async fn example() -> conductor::error::Result<()> {
/// let store = FileConversationStore::new("/var/lib/conductor");
/// let session = store.create_session("user-1", 7).await?;
/// assert!(store.list_items(session.id, None).await?.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileConversationStore {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    #[serde(flatten)]
    record: SessionRecord,
}

impl FileConversationStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store rooted at the configured data directory.
    pub fn from_config(config: &ConductorConfig) -> Self {
        Self::new(config.data_dir.clone())
    }

    fn session_path(&self, id: ConversationId) -> PathBuf {
        self.base_dir.join("conversations").join(format!("{id}.json"))
    }

    async fn load(&self, id: ConversationId) -> Result<Option<SessionRecord>> {
        let path = self.session_path(id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let file: SessionFile = serde_json::from_str(&raw)?;
        if file.version != FILE_VERSION {
            return Err(ConductorError::Storage(format!(
                "{}: unsupported version {}",
                path.display(),
                file.version
            )));
        }
        Ok(Some(file.record))
    }

    async fn load_existing(&self, id: ConversationId) -> Result<SessionRecord> {
        self.load(id)
            .await?
            .ok_or_else(|| ConductorError::NotFound(format!("conversation {id}")))
    }

    async fn save(&self, record: SessionRecord) -> Result<()> {
        let path = self.session_path(record.session.id);
        ensure_parent(&path).await?;
        let file = SessionFile {
            version: FILE_VERSION,
            record,
        };
        let serialized = serde_json::to_vec_pretty(&file)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serialized).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn create_session(
        &self,
        owner_id: &str,
        agent_id: AgentId,
    ) -> Result<ConversationSession> {
        let _guard = self.write_lock.lock().await;
        let session = ConversationSession::new(owner_id, agent_id);
        self.save(SessionRecord::new(session.clone())).await?;
        Ok(session)
    }

    async fn get_session(&self, id: ConversationId) -> Result<Option<ConversationSession>> {
        Ok(self.load(id).await?.map(|record| record.session))
    }

    async fn append_items(&self, id: ConversationId, items: Vec<NewExchangeItem>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_existing(id).await?;
        record.append(items);
        self.save(record).await
    }

    async fn list_items(
        &self,
        id: ConversationId,
        limit: Option<usize>,
    ) -> Result<Vec<ExchangeItem>> {
        Ok(self.load_existing(id).await?.window(limit))
    }

    async fn pop_last(&self, id: ConversationId) -> Result<Option<ExchangeItem>> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_existing(id).await?;
        let popped = record.items.pop();
        if popped.is_some() {
            self.save(record).await?;
        }
        Ok(popped)
    }

    async fn clear(&self, id: ConversationId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_existing(id).await?;
        record.items.clear();
        self.save(record).await
    }
}
