/*!
 * Persistent subtitle id allocation.
 *
 * Persistent ids are drawn from a fixed alphabet and recorded in a shared,
 * append-only inventory (one id per line). The inventory is the only shared
 * mutable resource of the engine: an `IdInventory` opened from a file holds
 * an exclusive OS lock until it is dropped, so a whole batch of allocations
 * happens under one scoped acquisition. Allocated ids are appended and
 * synced to disk before they are returned.
 */

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, info, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::errors::AllocationError;

/// Pools at or below this size are enumerated instead of sampled when nearly full
const ENUMERATION_LIMIT: u128 = 1_000_000;

/// Random draws allowed per requested id before sampling gives way to a scan of the pool
const SAMPLE_ATTEMPTS_PER_ID: usize = 1_000;

/// Persistent id configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistentIdConfig {
    /// Characters ids are made of
    #[serde(default = "default_alphabet")]
    pub alphabet: String,

    /// Number of characters per id
    #[serde(default = "default_length")]
    pub length: usize,

    /// Location of the shared inventory file
    #[serde(default = "default_inventory_path")]
    pub inventory_path: PathBuf,
}

impl Default for PersistentIdConfig {
    fn default() -> Self {
        Self {
            alphabet: default_alphabet(),
            length: default_length(),
            inventory_path: default_inventory_path(),
        }
    }
}

fn default_alphabet() -> String {
    "0123456789".to_string()
}

fn default_length() -> usize {
    7
}

fn default_inventory_path() -> PathBuf {
    PathBuf::from("data/subtitle_persistent_ids.txt")
}

/// Backing storage of an inventory
pub trait InventoryStore: Read + Write + Seek {
    /// Make appended data durable
    fn sync(&mut self) -> io::Result<()>;
}

/// Inventory file holding an exclusive lock while open
#[derive(Debug)]
pub struct LockedFile {
    file: File,
}

impl Read for LockedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for LockedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for LockedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl InventoryStore for LockedFile {
    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock persistent id inventory: {}", e);
        }
    }
}

impl InventoryStore for Cursor<Vec<u8>> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Handle to the shared id inventory
#[derive(Debug)]
pub struct IdInventory<S: InventoryStore = LockedFile> {
    store: S,
}

impl IdInventory<LockedFile> {
    /// Open the inventory file for read-and-extend, blocking until the exclusive lock is held.
    ///
    /// The file is created if it doesn't exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;
        debug!("Locked persistent id inventory {:?}", path);
        Ok(Self {
            store: LockedFile { file },
        })
    }
}

impl IdInventory<Cursor<Vec<u8>>> {
    /// In-memory inventory with the given initial contents
    pub fn in_memory(contents: &str) -> Self {
        Self {
            store: Cursor::new(contents.as_bytes().to_vec()),
        }
    }

    /// Current inventory contents
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(self.store.get_ref()).to_string()
    }
}

impl<S: InventoryStore> IdInventory<S> {
    /// Read every id in the inventory
    pub fn read_all(&mut self) -> io::Result<HashSet<String>> {
        self.store.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        self.store.read_to_string(&mut contents)?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Append ids to the end of the inventory and sync them
    pub fn append(&mut self, ids: &[String]) -> io::Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let len = self.store.seek(SeekFrom::End(0))?;
        let mut buf = String::new();
        if len > 0 {
            self.store.seek(SeekFrom::End(-1))?;
            let mut last = [0u8; 1];
            self.store.read_exact(&mut last)?;
            if last[0] != b'\n' {
                buf.push('\n');
            }
        }
        for id in ids {
            buf.push_str(id);
            buf.push('\n');
        }

        self.store.seek(SeekFrom::End(0))?;
        self.store.write_all(buf.as_bytes())?;
        self.store.flush()?;
        self.store.sync()
    }
}

/// Issues globally unique persistent ids
#[derive(Debug, Clone)]
pub struct PersistentIdAllocator {
    alphabet: Vec<char>,
    length: usize,
}

impl PersistentIdAllocator {
    /// Create an allocator from configuration
    pub fn new(config: &PersistentIdConfig) -> Result<Self, AllocationError> {
        let mut alphabet: Vec<char> = Vec::new();
        for c in config.alphabet.chars() {
            if c.is_whitespace() {
                return Err(AllocationError::InvalidAlphabet(
                    "alphabet must not contain whitespace".to_string(),
                ));
            }
            if !alphabet.contains(&c) {
                alphabet.push(c);
            }
        }
        if alphabet.len() < 2 {
            return Err(AllocationError::InvalidAlphabet(format!(
                "need at least 2 distinct characters, got {:?}",
                config.alphabet
            )));
        }
        if config.length == 0 {
            return Err(AllocationError::InvalidAlphabet("id length must be positive".to_string()));
        }
        Ok(Self {
            alphabet,
            length: config.length,
        })
    }

    /// Number of distinct ids this allocator can produce
    pub fn capacity(&self) -> u128 {
        (self.alphabet.len() as u128)
            .checked_pow(self.length as u32)
            .unwrap_or(u128::MAX)
    }

    /// Whether an id could have been produced by this allocator
    pub fn is_in_pool(&self, id: &str) -> bool {
        id.chars().count() == self.length && id.chars().all(|c| self.alphabet.contains(&c))
    }

    /// Generate `count` ids not present in the inventory, append them, and return them
    /// in generation order.
    pub fn allocate<S: InventoryStore>(
        &self,
        inventory: &mut IdInventory<S>,
        count: usize,
    ) -> Result<Vec<String>, AllocationError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let existing = inventory.read_all()?;
        let used_in_pool = existing.iter().filter(|id| self.is_in_pool(id)).count() as u128;
        let available = self.capacity().saturating_sub(used_in_pool);
        if (count as u128) > available {
            return Err(AllocationError::ExhaustedIdentifierPool {
                requested: count,
                available,
            });
        }

        let ids = if available >= 4 * count as u128 || self.capacity() > ENUMERATION_LIMIT {
            self.sample(&existing, count, count.saturating_mul(SAMPLE_ATTEMPTS_PER_ID))
        } else {
            self.enumerate(&existing, count)
        };

        inventory.append(&ids)?;
        info!(
            "Allocated {} persistent ids ({} now in inventory)",
            ids.len(),
            existing.len() + ids.len()
        );
        Ok(ids)
    }

    /// Draw random unused ids, switching to `scan` once `max_attempts` draws are spent.
    ///
    /// The caller guarantees at least `count` unused ids remain, so the scan always finishes.
    fn sample(&self, existing: &HashSet<String>, count: usize, max_attempts: usize) -> Vec<String> {
        let mut rng = rand::rng();
        let mut generated: HashSet<String> = HashSet::with_capacity(count);
        let mut ids = Vec::with_capacity(count);
        let mut attempts = 0;
        while ids.len() < count {
            if attempts >= max_attempts {
                warn!(
                    "Random sampling found {} of {} ids after {} draws, scanning the pool",
                    ids.len(),
                    count,
                    attempts
                );
                let start = rng.random_range(0..self.capacity());
                self.scan(existing, &mut generated, &mut ids, count, start);
                break;
            }
            attempts += 1;
            let id: String = (0..self.length)
                .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())])
                .collect();
            if existing.contains(&id) || generated.contains(&id) {
                continue;
            }
            generated.insert(id.clone());
            ids.push(id);
        }
        ids
    }

    /// Walk the pool from `start`, wrapping around, until `ids` holds `count` unused ids
    fn scan(
        &self,
        existing: &HashSet<String>,
        generated: &mut HashSet<String>,
        ids: &mut Vec<String>,
        count: usize,
        start: u128,
    ) {
        let capacity = self.capacity();
        let mut offset: u128 = 0;
        while ids.len() < count && offset < capacity {
            let id = self.id_at((start + offset) % capacity);
            offset += 1;
            if existing.contains(&id) || !generated.insert(id.clone()) {
                continue;
            }
            ids.push(id);
        }
    }

    fn enumerate(&self, existing: &HashSet<String>, count: usize) -> Vec<String> {
        let mut unused: Vec<String> = (0..self.capacity())
            .map(|index| self.id_at(index))
            .filter(|id| !existing.contains(id))
            .collect();
        unused.shuffle(&mut rand::rng());
        unused.truncate(count);
        unused
    }

    fn id_at(&self, mut index: u128) -> String {
        let base = self.alphabet.len() as u128;
        let mut chars = vec![self.alphabet[0]; self.length];
        for slot in chars.iter_mut().rev() {
            *slot = self.alphabet[(index % base) as usize];
            index /= base;
        }
        chars.into_iter().collect()
    }
}
