//! In-memory store with scripted latency and failures, for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use murmur_core::error::RemoteError;
use murmur_core::{
    AuthToken, Collection, Error, Expand, Fields, ListOptions, ListPage, Record, RecordId,
    RemoteStore, Result, StoreUrl,
};

use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    List,
    GetOne,
    Create,
    Update,
    Delete,
}

/// What the next call of a kind does.
#[derive(Debug, Clone, Copy, Default)]
pub struct Behavior {
    pub delay: Duration,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Outcome {
    #[default]
    Ok,
    ServerError,
    NotFound,
}

impl Behavior {
    pub fn delay(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            outcome: Outcome::Ok,
        }
    }

    pub fn fail() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::ServerError,
        }
    }

    pub fn not_found() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Outcome::NotFound,
        }
    }

    pub fn after(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, Vec<Record>>,
    scripts: HashMap<Call, VecDeque<Behavior>>,
    calls: HashMap<Call, usize>,
    next_id: u64,
    hide_total: bool,
    page_cap: Option<u32>,
}

pub struct MockStore {
    actor: RecordId,
    url: StoreUrl,
    inner: Mutex<Inner>,
}

pub fn id(s: &str) -> RecordId {
    RecordId::new(s).unwrap()
}

pub fn collection(s: &str) -> Collection {
    Collection::new(s).unwrap()
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

impl MockStore {
    pub fn new(actor: &str) -> Self {
        Self {
            actor: id(actor),
            url: StoreUrl::new("http://localhost:8090").unwrap(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Queue behaviors for upcoming calls of one kind.
    pub fn script(&self, call: Call, behaviors: impl IntoIterator<Item = Behavior>) {
        lock(&self.inner)
            .scripts
            .entry(call)
            .or_default()
            .extend(behaviors);
    }

    /// Stop reporting `total_items` in list responses.
    pub fn hide_total(&self) {
        lock(&self.inner).hide_total = true;
    }

    /// Serve at most `cap` items per page, whatever the caller asks for.
    pub fn cap_page_size(&self, cap: u32) {
        lock(&self.inner).page_cap = Some(cap);
    }

    pub fn calls(&self, call: Call) -> usize {
        lock(&self.inner).calls.get(&call).copied().unwrap_or(0)
    }

    /// Insert a record directly, bypassing scripts and counters.
    pub fn seed(&self, collection: &str, fields: Value) -> Record {
        let mut inner = lock(&self.inner);
        Self::insert(&mut inner, collection, fields)
    }

    /// Seed `n` posts by `owner`, each one second newer than the previous.
    pub fn seed_posts(&self, n: usize, owner: &str) -> Vec<Record> {
        (0..n)
            .map(|i| self.seed("posts", json!({"content": format!("post {}", i), "user_id": owner})))
            .collect()
    }

    pub fn records(&self, collection: &str) -> Vec<Record> {
        lock(&self.inner)
            .records
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn insert(inner: &mut Inner, collection: &str, fields: Value) -> Record {
        inner.next_id += 1;
        let mut fields = match fields {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        let record_id = match fields.remove("id") {
            Some(Value::String(s)) => id(&s),
            _ => id(&format!("rec{}", inner.next_id)),
        };
        let created = base_time() + chrono::Duration::seconds(inner.next_id as i64);
        let record = Record {
            id: record_id,
            collection: Collection::new(collection).unwrap(),
            created,
            updated: created,
            fields,
            expand: Fields::new(),
        };
        inner
            .records
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    async fn enter(&self, call: Call) -> Result<()> {
        let behavior = {
            let mut inner = lock(&self.inner);
            *inner.calls.entry(call).or_default() += 1;
            inner
                .scripts
                .get_mut(&call)
                .and_then(VecDeque::pop_front)
                .unwrap_or_default()
        };

        if !behavior.delay.is_zero() {
            tokio::time::sleep(behavior.delay).await;
        }

        match behavior.outcome {
            Outcome::Ok => Ok(()),
            Outcome::ServerError => Err(Error::Remote(RemoteError::new(
                500,
                None,
                Some("scripted failure".to_string()),
            ))),
            Outcome::NotFound => Err(Error::not_found("scripted not found")),
        }
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    fn actor(&self) -> &RecordId {
        &self.actor
    }

    fn url(&self) -> &StoreUrl {
        &self.url
    }

    fn token(&self) -> AuthToken {
        AuthToken::new("mock-token")
    }

    async fn list(
        &self,
        collection: &Collection,
        page: u32,
        per_page: u32,
        options: &ListOptions,
    ) -> Result<ListPage> {
        self.enter(Call::List).await?;
        let inner = lock(&self.inner);
        let mut matching: Vec<Record> = inner
            .records
            .get(collection.as_str())
            .map(|records| {
                records
                    .iter()
                    .filter(|r| options.filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &options.sort {
            matching.sort_by(|a, b| sort.compare(a, b));
        }

        let per_page = inner.page_cap.map_or(per_page, |cap| cap.min(per_page));
        let total = matching.len() as u64;
        let skip = (page.saturating_sub(1) * per_page) as usize;
        let items = matching
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect();

        Ok(ListPage {
            items,
            page,
            per_page,
            total_items: (!inner.hide_total).then_some(total),
        })
    }

    async fn get_one(
        &self,
        collection: &Collection,
        record_id: &RecordId,
        _expand: &[Expand],
    ) -> Result<Record> {
        self.enter(Call::GetOne).await?;
        lock(&self.inner)
            .records
            .get(collection.as_str())
            .and_then(|records| records.iter().find(|r| &r.id == record_id).cloned())
            .ok_or_else(|| Error::not_found(format!("{} not found", record_id)))
    }

    async fn create(&self, collection: &Collection, fields: &Fields) -> Result<Record> {
        self.enter(Call::Create).await?;
        let mut inner = lock(&self.inner);
        Ok(Self::insert(
            &mut inner,
            collection.as_str(),
            Value::Object(fields.clone()),
        ))
    }

    async fn update(
        &self,
        collection: &Collection,
        record_id: &RecordId,
        fields: &Fields,
    ) -> Result<Record> {
        self.enter(Call::Update).await?;
        let mut inner = lock(&self.inner);
        let record = inner
            .records
            .get_mut(collection.as_str())
            .and_then(|records| records.iter_mut().find(|r| &r.id == record_id))
            .ok_or_else(|| Error::not_found(format!("{} not found", record_id)))?;
        for (key, value) in fields {
            record.fields.insert(key.clone(), value.clone());
        }
        Ok(record.clone())
    }

    async fn delete(&self, collection: &Collection, record_id: &RecordId) -> Result<()> {
        self.enter(Call::Delete).await?;
        let mut inner = lock(&self.inner);
        let records = inner.records.entry(collection.to_string()).or_default();
        let before = records.len();
        records.retain(|r| &r.id != record_id);
        if records.len() == before {
            return Err(Error::not_found(format!("{} not found", record_id)));
        }
        Ok(())
    }
}
