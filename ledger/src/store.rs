//! Ledger storage backends.
//!
//! Every mutation is one read-modify-write cycle performed under the store's
//! lock, and the whole collection is written back at once.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::error::{BonusError, Result};
use crate::record::{BonusRecord, PaymentStatus};

/// Ordered collection of bonus records.
///
/// Implementations keep insertion order, and removals keep the relative order
/// of the surviving records.
pub trait LedgerStore {
    /// Appends every record or none of them.
    fn append_batch(&self, records: Vec<BonusRecord>) -> Result<usize>;

    /// Snapshot of all records in ledger order.
    fn all(&self) -> Result<Vec<BonusRecord>>;

    /// Sets `status` on every record of `player_id`; returns how many matched.
    fn update_status_by_player_id(&self, player_id: &str, status: PaymentStatus) -> Result<usize>;

    /// Deletes every record of `player_id`; returns how many were removed.
    fn remove_by_player_id(&self, player_id: &str) -> Result<usize>;

    fn clear(&self) -> Result<()>;

    fn append(&self, record: BonusRecord) -> Result<()> {
        self.append_batch(vec![record]).map(|_| ())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic mid-cycle never leaves a half-applied mutation behind (writes go
    // through a temp file), so the guarded value is still usable.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn set_status(records: &mut [BonusRecord], player_id: &str, status: PaymentStatus) -> usize {
    let mut count = 0;
    for record in records.iter_mut().filter(|r| r.player_id == player_id) {
        record.status = status;
        count += 1;
    }
    count
}

fn remove_player(records: &mut Vec<BonusRecord>, player_id: &str) -> usize {
    let before = records.len();
    records.retain(|r| r.player_id != player_id);
    before - records.len()
}

// -------------------- In-memory --------------------

#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<BonusRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<BonusRecord>) -> Self {
        MemoryLedger {
            records: Mutex::new(records),
        }
    }
}

impl LedgerStore for MemoryLedger {
    fn append_batch(&self, records: Vec<BonusRecord>) -> Result<usize> {
        let count = records.len();
        lock(&self.records).extend(records);
        Ok(count)
    }

    fn all(&self) -> Result<Vec<BonusRecord>> {
        Ok(lock(&self.records).clone())
    }

    fn update_status_by_player_id(&self, player_id: &str, status: PaymentStatus) -> Result<usize> {
        Ok(set_status(&mut lock(&self.records), player_id, status))
    }

    fn remove_by_player_id(&self, player_id: &str) -> Result<usize> {
        Ok(remove_player(&mut lock(&self.records), player_id))
    }

    fn clear(&self) -> Result<()> {
        lock(&self.records).clear();
        Ok(())
    }
}

// -------------------- JSON file --------------------

/// One lock per ledger file, shared by every handle in the process.
static FILE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Resolves the directory part so that `data.json`, `./data.json` and an
/// absolute path to the same file share a lock. The file itself may not exist.
fn lock_key(path: &Path) -> PathBuf {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let dir = fs::canonicalize(dir)
        .or_else(|_| std::path::absolute(dir))
        .unwrap_or_else(|_| dir.to_path_buf());
    match path.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    }
}

fn file_lock(path: &Path) -> Arc<Mutex<()>> {
    let registry = FILE_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    Arc::clone(lock(registry).entry(lock_key(path)).or_default())
}

/// Ledger persisted as a single JSON array.
///
/// An absent or zero-length file is an empty ledger. A file that exists but
/// does not parse, or holds a record that fails validation, is a storage
/// error.
///
/// Handles opened on the same file within one process serialize through a
/// shared lock, so separate `FileLedger::open` calls never lose each other's
/// writes. Other processes are not coordinated.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileLedger {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let write_lock = file_lock(&path);
        FileLedger { path, write_lock }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<BonusRecord>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BonusError::storage(&self.path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| BonusError::storage(&self.path, e))
    }

    /// Writes the full collection to a sibling temp file, syncs it, then
    /// renames it over the ledger.
    fn save(&self, records: &[BonusRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records).map_err(|e| BonusError::storage(&self.path, e))?;

        let tmp = self.temp_path();
        let written = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .and_then(|mut file| {
                file.write_all(&json)?;
                file.sync_all()
            });
        if let Err(e) = written.and_then(|_| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            log::error!("[LEDGER] write failed path:{} error:{}", self.path.display(), e);
            return Err(BonusError::storage(&self.path, e));
        }
        Ok(())
    }

    /// `<file>.<pid>.<seq>.tmp` next to the ledger; unique per write.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(format!(".{}.{}.tmp", std::process::id(), TEMP_SEQ.fetch_add(1, Ordering::Relaxed)));
        self.path.with_file_name(name)
    }

    /// Runs one read-modify-write cycle; nothing is written when `f` fails.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<BonusRecord>) -> T) -> Result<T> {
        let _guard = lock(&self.write_lock);
        let mut records = self.load()?;
        let out = f(&mut records);
        self.save(&records)?;
        Ok(out)
    }
}

impl LedgerStore for FileLedger {
    fn append_batch(&self, records: Vec<BonusRecord>) -> Result<usize> {
        let count = records.len();
        if count == 0 {
            return Ok(0);
        }
        self.mutate(|all| all.extend(records))?;
        Ok(count)
    }

    fn all(&self) -> Result<Vec<BonusRecord>> {
        let _guard = lock(&self.write_lock);
        self.load()
    }

    fn update_status_by_player_id(&self, player_id: &str, status: PaymentStatus) -> Result<usize> {
        self.mutate(|all| set_status(all, player_id, status))
    }

    fn remove_by_player_id(&self, player_id: &str) -> Result<usize> {
        self.mutate(|all| remove_player(all, player_id))
    }

    fn clear(&self) -> Result<()> {
        let _guard = lock(&self.write_lock);
        self.save(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::Bonus;
    use crate::record::EventContext;
    use tempfile::TempDir;

    fn record(name: &str, id: &str, kills: u32) -> BonusRecord {
        let event = EventContext {
            event_kind: "bizwar".to_string(),
            outcome: "win".to_string(),
            time_slot: "20:00".to_string(),
            date: "2025-05-01".to_string(),
            proof_url: None,
        };
        let base = kills as u64 * 30_000;
        BonusRecord::new(name, id, kills, &event, Bonus { base, special: 0 })
    }

    fn leftover_temp_files(dir: &TempDir) -> usize {
        fs::read_dir(dir.path())
            .unwrap()
            .filter(|entry| entry.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
            .count()
    }

    fn ids(store: &impl LedgerStore) -> Vec<String> {
        store.all().unwrap().into_iter().map(|r| r.player_id).collect()
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let tmp = TempDir::new().expect("tempdir");
        let store = FileLedger::open(tmp.path().join("data.json"));
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn test_blank_file_is_empty_ledger() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("data.json");
        fs::write(&path, "").unwrap();
        assert!(FileLedger::open(&path).all().unwrap().is_empty());
        fs::write(&path, "  \n").unwrap();
        assert!(FileLedger::open(&path).all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("data.json");
        fs::write(&path, "[{\"name\": ").unwrap();
        let store = FileLedger::open(&path);
        assert!(matches!(store.all(), Err(BonusError::Storage { .. })));
        // A failed load must not clobber the file.
        assert!(store.append(record("a", "1", 1)).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[{\"name\": ");
    }

    #[test]
    fn test_file_ledger_persists_across_reopen() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("data.json");
        {
            let store = FileLedger::open(&path);
            store.append_batch(vec![record("a", "1", 1), record("b", "2", 2)]).unwrap();
        }
        let reopened = FileLedger::open(&path);
        assert_eq!(ids(&reopened), vec!["1", "2"]);
        assert_eq!(leftover_temp_files(&tmp), 0);
    }

    #[test]
    fn test_remove_keeps_survivor_order() {
        let tmp = TempDir::new().expect("tempdir");
        let store = FileLedger::open(tmp.path().join("data.json"));
        store
            .append_batch(vec![
                record("a", "1", 1),
                record("b", "2", 1),
                record("a", "1", 1),
                record("c", "3", 1),
                record("b", "2", 1),
            ])
            .unwrap();
        assert_eq!(store.remove_by_player_id("1").unwrap(), 2);
        assert_eq!(ids(&store), vec!["2", "3", "2"]);
        assert_eq!(store.remove_by_player_id("404").unwrap(), 0);
    }

    #[test]
    fn test_update_status_counts_matches() {
        let store = MemoryLedger::with_records(vec![record("a", "1", 1), record("b", "2", 1), record("a", "1", 3)]);
        assert_eq!(store.update_status_by_player_id("1", PaymentStatus::Paid).unwrap(), 2);
        let statuses: Vec<_> = store.all().unwrap().iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![PaymentStatus::Paid, PaymentStatus::Due, PaymentStatus::Paid]);
    }

    #[test]
    fn test_clear_writes_empty_collection() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("data.json");
        let store = FileLedger::open(&path);
        store.append(record("a", "1", 1)).unwrap();
        store.clear().unwrap();
        assert!(store.all().unwrap().is_empty());
        let on_disk: Vec<BonusRecord> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.is_empty());
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let tmp = TempDir::new().expect("tempdir");
        let store = Arc::new(FileLedger::open(tmp.path().join("data.json")));
        std::thread::scope(|s| {
            for t in 0..8 {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for i in 0..5 {
                        store.append(record("p", &format!("{}{}", t, i), 1)).unwrap();
                    }
                });
            }
        });
        assert_eq!(store.all().unwrap().len(), 40);
    }

    #[test]
    fn test_separate_handles_share_one_lock() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("data.json");
        std::thread::scope(|s| {
            for t in 0..8 {
                let path = path.clone();
                s.spawn(move || {
                    let store = FileLedger::open(&path);
                    for i in 0..10 {
                        store.append(record("p", &format!("{}{}", t, i), 1)).unwrap();
                    }
                });
            }
        });
        let records = FileLedger::open(&path).all().unwrap();
        assert_eq!(records.len(), 80);
        assert_eq!(leftover_temp_files(&tmp), 0);
    }

    #[test]
    fn test_relative_and_absolute_paths_share_one_lock() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("data.json");
        let dotted = tmp.path().join(".").join("data.json");
        assert!(Arc::ptr_eq(&FileLedger::open(&path).write_lock, &FileLedger::open(&dotted).write_lock));
    }
}
