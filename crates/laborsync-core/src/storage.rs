//! Persistent storage using redb.
//!
//! Holds the active session and the locally stored settings patch. Values
//! are JSON blobs keyed by fixed names; the session wire types serialize
//! with serde already, so the same shapes round-trip through disk and
//! snapshots alike.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use redb::{Database, TableDefinition};
use tracing::debug;

use crate::error::SnapshotResult;
use crate::settings::SettingsPatch;
use crate::types::SessionData;

const SESSIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

const ACTIVE_SESSION_KEY: &str = "active";
const SETTINGS_PATCH_KEY: &str = "local";

/// Storage layer for session data and settings.
#[derive(Clone)]
pub struct Storage {
    db: Arc<RwLock<Database>>,
}

impl Storage {
    /// Create or open the database at `path`, initializing tables.
    pub fn new(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS_TABLE)?;
            let _ = write_txn.open_table(SETTINGS_TABLE)?;
        }
        write_txn.commit()?;

        debug!(path = %path.display(), "storage opened");
        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Save the active session, replacing any previous one.
    pub fn save_session(&self, session: &SessionData) -> SnapshotResult<()> {
        let data = serde_json::to_vec(session)?;
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS_TABLE)?;
            table.insert(ACTIVE_SESSION_KEY, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load the active session; `None` when nothing has been saved yet.
    pub fn load_session(&self) -> SnapshotResult<Option<SessionData>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SESSIONS_TABLE)?;
        match table.get(ACTIVE_SESSION_KEY)? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Delete the active session.
    pub fn clear_session(&self) -> SnapshotResult<()> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS_TABLE)?;
            table.remove(ACTIVE_SESSION_KEY)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Save the locally stored settings patch (imported or user-chosen
    /// divergences from defaults).
    pub fn save_settings(&self, patch: &SettingsPatch) -> SnapshotResult<()> {
        let data = serde_json::to_vec(patch)?;
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(SETTINGS_TABLE)?;
            table.insert(SETTINGS_PATCH_KEY, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load the stored settings patch, defaulting to an empty patch.
    pub fn load_settings(&self) -> SnapshotResult<SettingsPatch> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;
        match table.get(SETTINGS_PATCH_KEY)? {
            Some(v) => Ok(serde_json::from_slice(v.value())?),
            None => Ok(SettingsPatch::default()),
        }
    }

    /// Delete the session and settings in one transaction.
    pub fn clear_all(&self) -> SnapshotResult<()> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(SESSIONS_TABLE)?;
            sessions.remove(ACTIVE_SESSION_KEY)?;
            let mut settings = write_txn.open_table(SETTINGS_TABLE)?;
            settings.remove(SETTINGS_PATCH_KEY)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Serialize everything stored into one JSON document.
    pub fn export_backup(&self) -> SnapshotResult<String> {
        let backup = Backup {
            session: self.load_session()?,
            settings: self.load_settings()?,
        };
        Ok(serde_json::to_string_pretty(&backup)?)
    }

    /// Restore a backup produced by [`export_backup`](Self::export_backup),
    /// replacing the stored session and settings.
    pub fn import_backup(&self, json: &str) -> SnapshotResult<()> {
        let backup: Backup = serde_json::from_str(json)?;
        match &backup.session {
            Some(session) => self.save_session(session)?,
            None => self.clear_session()?,
        }
        self.save_settings(&backup.settings)?;
        Ok(())
    }
}

/// On-disk backup document: the whole store in one JSON file.
#[derive(serde::Serialize, serde::Deserialize)]
struct Backup {
    session: Option<SessionData>,
    #[serde(default)]
    settings: SettingsPatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Contraction;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("laborsync.redb")).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_session_roundtrip() {
        let (_dir, storage) = open_temp();
        assert!(storage.load_session().unwrap().is_none());

        let t = Utc.with_ymd_and_hms(2025, 2, 15, 10, 0, 0).unwrap();
        let mut session = SessionData::empty();
        session.session_started_at = Some(t);
        let mut c = Contraction::begin(t);
        c.end = Some(t + Duration::seconds(60));
        session.contractions.push(c);

        storage.save_session(&session).unwrap();
        assert_eq!(storage.load_session().unwrap(), Some(session));
    }

    #[test]
    fn test_clear_session() {
        let (_dir, storage) = open_temp();
        storage.save_session(&SessionData::empty()).unwrap();
        storage.clear_session().unwrap();
        assert!(storage.load_session().unwrap().is_none());
    }

    #[test]
    fn test_settings_patch_roundtrip() {
        let (_dir, storage) = open_temp();
        assert!(storage.load_settings().unwrap().is_empty());

        let patch = SettingsPatch {
            show_prayers: Some(true),
            theme: Some("clinical".to_string()),
            ..Default::default()
        };
        storage.save_settings(&patch).unwrap();
        assert_eq!(storage.load_settings().unwrap(), patch);
    }

    #[test]
    fn test_backup_roundtrip() {
        let (_dir, storage) = open_temp();
        storage.save_session(&SessionData::empty()).unwrap();
        storage
            .save_settings(&SettingsPatch {
                theme: Some("midnight".to_string()),
                ..Default::default()
            })
            .unwrap();

        let backup = storage.export_backup().unwrap();

        let (_dir2, restored) = open_temp();
        restored.import_backup(&backup).unwrap();
        assert!(restored.load_session().unwrap().is_some());
        assert_eq!(
            restored.load_settings().unwrap().theme.as_deref(),
            Some("midnight")
        );
    }

    #[test]
    fn test_clear_all_empties_both_tables() {
        let (_dir, storage) = open_temp();
        storage.save_session(&SessionData::empty()).unwrap();
        storage
            .save_settings(&SettingsPatch {
                show_prayers: Some(true),
                ..Default::default()
            })
            .unwrap();

        storage.clear_all().unwrap();
        assert!(storage.load_session().unwrap().is_none());
        assert!(storage.load_settings().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("laborsync.redb");

        {
            let storage = Storage::new(&path).unwrap();
            storage.save_session(&SessionData::empty()).unwrap();
        }

        let storage = Storage::new(&path).unwrap();
        assert!(storage.load_session().unwrap().is_some());
    }
}
