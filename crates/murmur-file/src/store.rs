//! Filesystem storage for the file-backed record store.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use murmur_core::Result;
use murmur_core::error::{Error, InvalidInputError, RemoteError, TransportError};
use murmur_core::repo::{format_timestamp, parse_timestamp};
use murmur_core::{Collection, Expand, Fields, ListOptions, ListPage, Record, RecordId, Sort};

/// Length of generated record ids.
const ID_LEN: usize = 15;

fn map_io(err: std::io::Error) -> Error {
    Error::Transport(TransportError::Io {
        message: err.to_string(),
    })
}

fn map_json(err: serde_json::Error) -> Error {
    Error::InvalidInput(InvalidInputError::Other {
        message: err.to_string(),
    })
}

fn not_found(what: &str, id: &str) -> Error {
    Error::Remote(RemoteError::new(
        404,
        Some("not_found".to_string()),
        Some(format!("{} {} not found", what, id)),
    ))
}

/// Account metadata stored locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAccount {
    /// The user's record id.
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: String,
    /// Password hash (bcrypt).
    pub password_hash: String,
}

/// Exclusive lock over the store, released on drop.
struct StoreLock(File);

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

/// Filesystem-backed storage.
#[derive(Debug, Clone)]
pub(crate) struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    fn accounts_dir(&self) -> PathBuf {
        self.store_dir().join("accounts")
    }

    fn account_path(&self, id: &str) -> PathBuf {
        self.accounts_dir().join(id).join("account.json")
    }

    fn collection_dir(&self, collection: &Collection) -> PathBuf {
        self.store_dir().join("collections").join(collection.as_str())
    }

    fn record_path(&self, collection: &Collection, id: &RecordId) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", id.as_str()))
    }

    /// Take the store-wide write lock. Readers do not lock; writes are
    /// atomic renames.
    fn lock(&self) -> Result<StoreLock> {
        let dir = self.store_dir();
        fs::create_dir_all(&dir).map_err(map_io)?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(dir.join("store.lock"))
            .map_err(map_io)?;
        file.lock_exclusive().map_err(map_io)?;
        Ok(StoreLock(file))
    }

    /// Next creation timestamp. Strictly increasing per store, so records
    /// created in the same millisecond still have a total order.
    ///
    /// Must be called with the store lock held.
    fn next_timestamp(&self) -> Result<DateTime<Utc>> {
        let clock = self.store_dir().join("clock");
        let last = fs::read_to_string(&clock)
            .ok()
            .and_then(|s| parse_timestamp(s.trim()));

        let now = Utc::now();
        let next = match last {
            Some(last) if last >= now => last + Duration::milliseconds(1),
            _ => now,
        };
        let next = parse_timestamp(&format_timestamp(&next)).unwrap_or(next);

        fs::write(&clock, format_timestamp(&next)).map_err(map_io)?;
        Ok(next)
    }

    fn generate_id() -> Result<RecordId> {
        let id: String = Uuid::new_v4().simple().to_string().chars().take(ID_LEN).collect();
        RecordId::new(id)
    }

    fn write_atomic(path: &Path, value: &Value) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }
        let content = serde_json::to_string_pretty(value).map_err(map_json)?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(map_io)?;
        fs::rename(&temp_path, path).map_err(map_io)?;
        Ok(())
    }

    // ========================================================================
    // Account Management
    // ========================================================================

    #[instrument(skip(self, password_hash))]
    pub fn create_account(
        &self,
        username: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<LocalAccount> {
        let _lock = self.lock()?;

        if self.find_account_by_username(username)?.is_some() {
            return Err(Error::Remote(RemoteError::new(
                400,
                Some("validation_not_unique".to_string()),
                Some(format!("Username {} is taken", username)),
            )));
        }

        let id = Self::generate_id()?;
        let account = LocalAccount {
            id: id.to_string(),
            username: username.to_string(),
            name: name.map(str::to_string),
            created_at: Utc::now().to_rfc3339(),
            password_hash: password_hash.to_string(),
        };

        let value = serde_json::to_value(&account).map_err(map_json)?;
        Self::write_atomic(&self.account_path(&account.id), &value)?;

        debug!(id = %id, username = %username, "Created local account");
        Ok(account)
    }

    pub fn get_account(&self, id: &str) -> Result<Option<LocalAccount>> {
        let path = self.account_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(map_io)?;
        let account = serde_json::from_str(&content).map_err(map_json)?;
        Ok(Some(account))
    }

    pub fn list_accounts(&self) -> Result<Vec<LocalAccount>> {
        let dir = self.accounts_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut accounts = Vec::new();
        for entry in fs::read_dir(&dir).map_err(map_io)? {
            let entry = entry.map_err(map_io)?;
            let account_file = entry.path().join("account.json");

            if account_file.exists() {
                let content = fs::read_to_string(&account_file).map_err(map_io)?;
                if let Ok(account) = serde_json::from_str::<LocalAccount>(&content) {
                    accounts.push(account);
                }
            }
        }
        Ok(accounts)
    }

    pub fn find_account_by_username(&self, username: &str) -> Result<Option<LocalAccount>> {
        Ok(self
            .list_accounts()?
            .into_iter()
            .find(|a| a.username == username))
    }

    // ========================================================================
    // Record Operations
    // ========================================================================

    fn read_record(&self, collection: &Collection, id: &RecordId) -> Result<Option<Record>> {
        let path = self.record_path(collection, id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(map_io)?;
        let value: Value = serde_json::from_str(&content).map_err(map_json)?;
        Record::from_json(collection, value).map(Some)
    }

    fn read_collection(&self, collection: &Collection) -> Result<Vec<Record>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&dir).map_err(map_io)? {
            let path = entry.map_err(map_io)?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let content = fs::read_to_string(&path).map_err(map_io)?;
            let parsed = serde_json::from_str::<Value>(&content)
                .map_err(map_json)
                .and_then(|value| Record::from_json(collection, value));
            match parsed {
                Ok(record) => records.push(record),
                Err(error) => debug!(path = %path.display(), %error, "Skipping unreadable record"),
            }
        }
        Ok(records)
    }

    #[instrument(skip(self, fields))]
    pub fn create_record(&self, collection: &Collection, fields: &Fields) -> Result<Record> {
        let _lock = self.lock()?;

        let mut fields = fields.clone();
        let id = match fields.remove("id") {
            Some(Value::String(id)) => RecordId::new(id)?,
            Some(other) => {
                return Err(InvalidInputError::Field {
                    value: other.to_string(),
                    reason: "id must be a string".to_string(),
                }
                .into());
            }
            None => Self::generate_id()?,
        };

        let path = self.record_path(collection, &id);
        if path.exists() {
            return Err(Error::Remote(RemoteError::new(
                400,
                Some("validation_not_unique".to_string()),
                Some(format!("Record {} already exists", id)),
            )));
        }

        let created = self.next_timestamp()?;
        let record = Record {
            id,
            collection: collection.clone(),
            created,
            updated: created,
            fields,
            expand: Fields::new(),
        };
        Self::write_atomic(&path, &record.to_json())?;

        debug!(id = %record.id, "Created record");
        Ok(record)
    }

    #[instrument(skip(self, fields))]
    pub fn update_record(
        &self,
        collection: &Collection,
        id: &RecordId,
        fields: &Fields,
    ) -> Result<Record> {
        let _lock = self.lock()?;

        let mut record = self
            .read_record(collection, id)?
            .ok_or_else(|| not_found("Record", id.as_str()))?;

        for (key, value) in fields {
            if key != "id" {
                record.fields.insert(key.clone(), value.clone());
            }
        }
        record.updated = self.next_timestamp()?;
        Self::write_atomic(&self.record_path(collection, id), &record.to_json())?;

        debug!(id = %id, "Updated record");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub fn delete_record(&self, collection: &Collection, id: &RecordId) -> Result<()> {
        let _lock = self.lock()?;

        let path = self.record_path(collection, id);
        if !path.exists() {
            return Err(not_found("Record", id.as_str()));
        }
        fs::remove_file(&path).map_err(map_io)?;

        debug!(id = %id, "Deleted record");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_record(
        &self,
        collection: &Collection,
        id: &RecordId,
        expand: &[Expand],
    ) -> Result<Record> {
        let mut record = self
            .read_record(collection, id)?
            .ok_or_else(|| not_found("Record", id.as_str()))?;
        self.expand(&mut record, expand)?;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub fn list_records(
        &self,
        collection: &Collection,
        page: u32,
        per_page: u32,
        options: &ListOptions,
    ) -> Result<ListPage> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let mut records: Vec<Record> = self
            .read_collection(collection)?
            .into_iter()
            .filter(|r| options.filter.matches(r))
            .collect();

        // Ties fall back to creation order, then id, for a stable order.
        let sort = options.sort.clone().unwrap_or_else(Sort::oldest_first);
        records.sort_by(|a, b| {
            sort.compare(a, b)
                .then_with(|| a.created.cmp(&b.created))
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = records.len() as u64;
        let skip = (page as usize - 1).saturating_mul(per_page as usize);
        let mut items: Vec<Record> = records
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect();

        for record in &mut items {
            self.expand(record, &options.expand)?;
        }

        Ok(ListPage {
            items,
            page,
            per_page,
            total_items: Some(total),
        })
    }

    fn expand(&self, record: &mut Record, expand: &[Expand]) -> Result<()> {
        for expansion in expand {
            match expansion {
                Expand::Relation { field, collection } => {
                    let Some(target) = record.get_id(field) else {
                        continue;
                    };
                    if let Some(related) = self.read_record(collection, &target)? {
                        record.expand.insert(expansion.key(), related.to_json());
                    }
                }
                Expand::BackRelation { collection, field } => {
                    let mut related: Vec<Record> = self
                        .read_collection(collection)?
                        .into_iter()
                        .filter(|r| r.get_str(field) == Some(record.id.as_str()))
                        .collect();
                    if related.is_empty() {
                        continue;
                    }
                    related.sort_by(|a, b| a.created.cmp(&b.created));
                    let values = related.iter().map(Record::to_json).collect();
                    record.expand.insert(expansion.key(), Value::Array(values));
                }
            }
        }
        Ok(())
    }
}
