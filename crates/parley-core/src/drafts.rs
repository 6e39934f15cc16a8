use std::path::PathBuf;

use crate::chat::ChatId;
use crate::error::Error;
use crate::utils::paths::AppPaths;

/// Persists the unsent input of each chat so it survives a restart.
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn open_default() -> Result<Self, Error> {
        AppPaths::drafts_dir()
            .map(Self::new)
            .ok_or_else(|| Error::Configuration("Could not determine data directory".to_string()))
    }

    fn path_for(&self, chat_id: ChatId) -> PathBuf {
        self.dir.join(format!("{chat_id}.txt"))
    }

    pub fn load(&self, chat_id: ChatId) -> Result<String, Error> {
        match std::fs::read_to_string(self.path_for(chat_id)) {
            Ok(draft) => Ok(draft),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// An empty draft removes the file.
    pub fn save(&self, chat_id: ChatId, draft: &str) -> Result<(), Error> {
        let path = self.path_for(chat_id);
        if draft.is_empty() {
            return match std::fs::remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, draft)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn draft_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = DraftStore::new(dir.path().join("drafts"));
        let chat_id = ChatId::new();

        assert_eq!(store.load(chat_id).unwrap(), "");

        store.save(chat_id, "half a thought").unwrap();
        assert_eq!(store.load(chat_id).unwrap(), "half a thought");

        store.save(chat_id, "").unwrap();
        assert_eq!(store.load(chat_id).unwrap(), "");
        store.save(chat_id, "").unwrap();
    }
}
