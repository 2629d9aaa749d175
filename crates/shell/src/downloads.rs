//! Download management over the persistent store
//!
//! Each download runs as its own task and is the only writer of its record:
//! progress is persisted and published step by step, and observers read it
//! from the bus or the store. Cancellation stops chunk consumption and
//! marks the record failed, never completed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use url::Url;
use uuid::Uuid;

use ember_events::{Event, EventBus};
use ember_offline::NetworkError;
use ember_storage::{Collection, PersistentStore, Record, StorageResult};

use crate::models::DownloadRecord;

/// An opened download: the advertised size, if the server sent one, and the
/// chunk stream
pub struct DownloadStream {
    pub total_bytes: Option<u64>,
    pub chunks: BoxStream<'static, Result<Bytes, NetworkError>>,
}

/// Seam to whatever transport supplies download bytes
#[async_trait]
pub trait DownloadSource: Send + Sync {
    async fn open(&self, url: &str) -> Result<DownloadStream, NetworkError>;
}

/// reqwest-backed download source
pub struct HttpDownloadSource {
    client: reqwest::Client,
}

impl HttpDownloadSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpDownloadSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DownloadSource for HttpDownloadSource {
    async fn open(&self, url: &str) -> Result<DownloadStream, NetworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NetworkError::Fetch(e.to_string()))?;
        let total_bytes = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| NetworkError::Fetch(e.to_string())))
            .boxed();
        Ok(DownloadStream { total_bytes, chunks })
    }
}

/// Handle to an in-flight download
pub struct DownloadHandle {
    id: Uuid,
    cancelled: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl DownloadHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Abandon the download. The task stops consuming chunks and marks the
    /// record failed.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Wait for the download task to finish (complete, fail, or observe the
    /// cancellation)
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

pub struct DownloadManager {
    store: Arc<PersistentStore>,
    bus: Arc<EventBus>,
    source: Arc<dyn DownloadSource>,
}

impl DownloadManager {
    pub fn new(store: Arc<PersistentStore>, bus: Arc<EventBus>, source: Arc<dyn DownloadSource>) -> Self {
        Self { store, bus, source }
    }

    /// Start downloading `url`. The record is persisted as in-progress
    /// before any bytes move, then updated exclusively by the download task.
    pub async fn start(&self, url: &str, filename_hint: Option<&str>) -> StorageResult<DownloadHandle> {
        let filename = safe_filename(
            filename_hint
                .map(str::to_string)
                .unwrap_or_else(|| filename_from_url(url)),
        );
        let record = DownloadRecord::new(url, &filename);
        persist(&self.store, &record).await?;

        log::info!("download {} -> {}", record.url, record.filename);
        self.bus.publish(Event::DownloadStarted {
            id: record.id,
            url: record.url.clone(),
            filename: record.filename.clone(),
        });

        let cancelled = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_download(
            Arc::clone(&self.store),
            Arc::clone(&self.bus),
            Arc::clone(&self.source),
            record.clone(),
            Arc::clone(&cancelled),
        ));

        Ok(DownloadHandle {
            id: record.id,
            cancelled,
            task,
        })
    }

    /// All download records, newest first
    pub async fn list(&self) -> StorageResult<Vec<DownloadRecord>> {
        let mut records: Vec<DownloadRecord> = self
            .store
            .list(Collection::Downloads)
            .await
            .iter()
            .map(Record::deserialize)
            .collect::<StorageResult<_>>()?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    pub async fn get(&self, id: Uuid) -> StorageResult<Option<DownloadRecord>> {
        self.store
            .get(Collection::Downloads, &id.to_string())
            .await
            .map(|record| record.deserialize())
            .transpose()
    }

    /// Remove a download record from the list
    pub async fn remove(&self, id: Uuid) -> StorageResult<()> {
        self.store.remove(Collection::Downloads, &id.to_string()).await?;
        self.bus.publish(Event::DownloadRemoved { id });
        Ok(())
    }
}

/// The single writer of a download record. Persist failures while a
/// download is running are logged, not propagated; failure surfaces through
/// the record status, never as a crash.
async fn run_download(
    store: Arc<PersistentStore>,
    bus: Arc<EventBus>,
    source: Arc<dyn DownloadSource>,
    mut record: DownloadRecord,
    cancelled: Arc<AtomicBool>,
) {
    let mut stream = match source.open(&record.url).await {
        Ok(stream) => stream,
        Err(e) => {
            fail(&store, &bus, &mut record, &e.to_string()).await;
            return;
        }
    };
    if let Some(total) = stream.total_bytes {
        record.total_bytes = total;
    }

    while let Some(chunk) = stream.chunks.next().await {
        if cancelled.load(Ordering::SeqCst) {
            fail(&store, &bus, &mut record, "cancelled by caller").await;
            return;
        }
        match chunk {
            Ok(bytes) => {
                record.apply_chunk(bytes.len() as u64);
                if let Err(e) = persist(&store, &record).await {
                    log::warn!("could not persist progress for {}: {}", record.id, e);
                }
                bus.publish(Event::DownloadProgress {
                    id: record.id,
                    progress: record.progress,
                    received_bytes: record.received_bytes,
                    total_bytes: record.total_bytes,
                });
            }
            Err(e) => {
                fail(&store, &bus, &mut record, &e.to_string()).await;
                return;
            }
        }
    }

    if cancelled.load(Ordering::SeqCst) {
        fail(&store, &bus, &mut record, "cancelled by caller").await;
        return;
    }

    record.mark_completed();
    if let Err(e) = persist(&store, &record).await {
        log::warn!("could not persist completion for {}: {}", record.id, e);
    }
    log::info!("download {} completed ({} bytes)", record.id, record.received_bytes);
    bus.publish(Event::DownloadCompleted { id: record.id });
}

async fn fail(store: &PersistentStore, bus: &EventBus, record: &mut DownloadRecord, message: &str) {
    record.mark_failed(message);
    if let Err(e) = persist(store, record).await {
        log::warn!("could not persist failure for {}: {}", record.id, e);
    }
    log::warn!("download {} failed: {}", record.id, message);
    bus.publish(Event::DownloadFailed {
        id: record.id,
        error: message.to_string(),
    });
}

async fn persist(store: &PersistentStore, record: &DownloadRecord) -> StorageResult<()> {
    store
        .put(
            Collection::Downloads,
            Record::from_serializable(record.id.to_string(), record)?,
        )
        .await
}

/// Replace filesystem-hostile characters, matching what the shell's save
/// dialog accepts
fn safe_filename(name: String) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' => '-',
            other => other,
        })
        .collect();
    if sanitized.is_empty() {
        "download".to_string()
    } else {
        sanitized
    }
}

/// The last path segment of the url, or "download" when there is none
fn filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| "download".to_string())
}
