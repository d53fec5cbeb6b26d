//! Scoped memory store: vector index + record log + scope filter.

use crate::embedding::{EmbeddingGateway, embed_checked};
use crate::error::MemoryError;
use crate::filter::ScopeFilter;
use crate::index::VectorIndex;
use crate::model::{Record, RecordId, Role, Scope};
use crate::record_log::{LoadStatus, RecordLog};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Default candidate pool multiplier for filtered queries.
pub const DEFAULT_OVER_FETCH: usize = 2;
/// Default embedding gateway timeout.
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(10);

/// Construction options for [`ScopedMemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Vector dimension; must equal the gateway output dimension.
    pub dimension: usize,
    /// Candidate pool size as a multiple of the query limit (at least 2).
    pub over_fetch: usize,
    /// Upper bound on a single gateway call.
    pub embed_timeout: Duration,
}

impl StoreOptions {
    /// Options for `dimension` with default over-fetch and timeout.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            over_fetch: DEFAULT_OVER_FETCH,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    pub fn with_over_fetch(mut self, over_fetch: usize) -> Self {
        self.over_fetch = over_fetch;
        self
    }

    pub fn with_embed_timeout(mut self, embed_timeout: Duration) -> Self {
        self.embed_timeout = embed_timeout;
        self
    }

    fn validate(&self, gateway: &dyn EmbeddingGateway) -> Result<(), MemoryError> {
        if self.dimension == 0 {
            return Err(MemoryError::InvalidOptions(
                "dimension must be positive".to_string(),
            ));
        }
        if self.over_fetch < DEFAULT_OVER_FETCH {
            return Err(MemoryError::InvalidOptions(format!(
                "over_fetch must be at least {DEFAULT_OVER_FETCH}"
            )));
        }
        if self.embed_timeout.is_zero() {
            return Err(MemoryError::InvalidOptions(
                "embed_timeout must be positive".to_string(),
            ));
        }
        if gateway.dimension() != self.dimension {
            return Err(MemoryError::DimensionMismatch {
                expected: self.dimension,
                actual: gateway.dimension(),
            });
        }
        Ok(())
    }
}

struct StoreState {
    index: VectorIndex,
    last_timestamp: Option<DateTime<Utc>>,
}

impl StoreState {
    /// Strictly increasing write time, even when the clock stalls or steps back.
    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_timestamp {
            Some(last) if now <= last => last + ChronoDuration::microseconds(1),
            _ => now,
        }
    }
}

/// Durable, append-only memory of scoped records with filtered similarity recall.
///
/// One read-write lock guards the index and the log: queries share it,
/// appends hold it exclusively while indexing and persisting. Gateway calls
/// happen before the lock is taken.
pub struct ScopedMemoryStore {
    gateway: Arc<dyn EmbeddingGateway>,
    options: StoreOptions,
    log: RecordLog,
    state: RwLock<StoreState>,
    load_status: LoadStatus,
}

impl ScopedMemoryStore {
    /// Open the store rooted at `root`, replaying any persisted log.
    ///
    /// A gateway whose dimension differs from `options.dimension` is a fatal
    /// configuration error. An unreadable log is not: the store comes up
    /// empty and reports [`LoadStatus::Recovered`].
    pub fn open(
        root: impl AsRef<Path>,
        gateway: Arc<dyn EmbeddingGateway>,
        options: StoreOptions,
    ) -> Result<Self, MemoryError> {
        options.validate(gateway.as_ref())?;
        let log = RecordLog::open(root)?;
        let replay = log.replay(options.dimension);

        let mut index = VectorIndex::new(options.dimension);
        let mut last_timestamp = None;
        for record in replay.records {
            last_timestamp = last_timestamp.max(Some(record.timestamp));
            index.insert(record)?;
        }
        info!(
            "memory store ready (path={}, dimension={}, records={}, status={:?})",
            log.path().display(),
            options.dimension,
            index.len(),
            replay.status
        );
        Ok(Self {
            gateway,
            options,
            log,
            state: RwLock::new(StoreState {
                index,
                last_timestamp,
            }),
            load_status: replay.status,
        })
    }

    /// How the persisted log was loaded.
    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    /// Store options in effect.
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Path to the backing log file.
    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Number of records in the store.
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.state.read().index.is_empty()
    }

    /// Every record in insertion order.
    pub fn records(&self) -> Vec<Record> {
        self.state.read().index.iter().cloned().collect()
    }

    /// Newest record satisfying `filter`, regardless of similarity.
    pub fn latest(&self, filter: &ScopeFilter) -> Option<Record> {
        self.state
            .read()
            .index
            .iter()
            .filter(|record| filter.matches(record))
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
            .cloned()
    }

    /// Embed, index and durably persist `text` under `scope`.
    ///
    /// Nothing becomes visible to queries unless the write reached disk.
    pub async fn append(
        &self,
        text: &str,
        scope: &Scope,
        role: Role,
    ) -> Result<RecordId, MemoryError> {
        scope.validate()?;
        let vector = self
            .embed(text)
            .await
            .map_err(|err| err.context(format!("append ({scope})")))?;

        let mut state = self.state.write();
        let timestamp = state.next_timestamp(Utc::now());
        let record = Record {
            id: Uuid::new_v4(),
            text: text.to_string(),
            vector,
            scope: scope.clone(),
            role,
            timestamp,
        };
        let id = record.id;
        let before = state.index.len();
        state.index.insert(record.clone())?;
        if let Err(err) = self.log.append(&record) {
            state.index.truncate(before);
            return Err(err);
        }
        state.last_timestamp = Some(timestamp);
        debug!(
            "memory appended (id={}, {}, role={}, text_len={})",
            id,
            scope,
            role,
            text.len()
        );
        Ok(id)
    }

    /// Most recent records relevant to `query_text` that satisfy `filter`.
    ///
    /// The `over_fetch × limit` most similar matching records form the
    /// candidate pool; they are returned newest first, ties oldest-first,
    /// truncated to `limit`. No match yields an empty vector.
    pub async fn query(
        &self,
        query_text: &str,
        filter: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<Record>, MemoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let vector = self
            .embed(query_text)
            .await
            .map_err(|err| err.context(format!("query ({filter})")))?;

        let state = self.state.read();
        let pool = limit.saturating_mul(self.options.over_fetch);
        let mut hits = state
            .index
            .search(&vector, pool, |record| filter.matches(record))?;
        hits.sort_by(|a, b| {
            b.record
                .timestamp
                .cmp(&a.record.timestamp)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(limit);
        debug!(
            "memory query (filter={}, limit={}, pool={}, returned={})",
            filter,
            limit,
            pool,
            hits.len()
        );
        Ok(hits.into_iter().map(|hit| hit.record.clone()).collect())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        embed_checked(
            self.gateway.as_ref(),
            text,
            self.options.dimension,
            self.options.embed_timeout,
        )
        .await
    }
}
