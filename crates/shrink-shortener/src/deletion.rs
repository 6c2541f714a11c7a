use parking_lot::Mutex;
use shrink_core::{OwnerId, ShortCode, Storage, DELETE_CHUNK_SIZE};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Asynchronous, fire-and-forget soft deletion.
///
/// Every submission gets its own bounded channel, a producer task streaming
/// the codes onto it and a consumer task flushing them to
/// [`Storage::batch_delete`] in fixed-size chunks. Failures are logged and
/// dropped: each chunk is attempted exactly once.
///
/// Dropping the pipeline detaches jobs still in flight rather than aborting
/// them, so accepted deletions keep running on the runtime. Call
/// [`DeletePipeline::drain`] to wait for them.
pub struct DeletePipeline<S: ?Sized> {
    storage: Arc<S>,
    chunk_size: usize,
    jobs: Mutex<JoinSet<()>>,
}

impl<S: Storage + ?Sized> DeletePipeline<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_chunk_size(storage, DELETE_CHUNK_SIZE)
    }

    pub fn with_chunk_size(storage: Arc<S>, chunk_size: usize) -> Self {
        Self {
            storage,
            chunk_size: chunk_size.max(1),
            jobs: Mutex::new(JoinSet::new()),
        }
    }

    /// Schedules tombstoning of `codes` on behalf of `owner` and returns
    /// immediately. Must be called from within a tokio runtime.
    pub fn submit(&self, owner: OwnerId, codes: Vec<ShortCode>) {
        let (tx, rx) = mpsc::channel(self.chunk_size);
        let requested = codes.len();

        let mut jobs = self.jobs.lock();
        while let Some(finished) = jobs.try_join_next() {
            if let Err(err) = finished {
                warn!(error = %err, "delete job did not finish");
            }
        }

        jobs.spawn(async move {
            for code in codes {
                if tx.send(code).await.is_err() {
                    break;
                }
            }
        });
        jobs.spawn(consume(
            Arc::clone(&self.storage),
            owner,
            rx,
            self.chunk_size,
        ));

        debug!(requested, in_flight = jobs.len(), "delete request accepted");
    }

    /// Waits for every job submitted so far.
    pub async fn drain(&self) {
        let mut jobs = std::mem::take(&mut *self.jobs.lock());
        while let Some(finished) = jobs.join_next().await {
            if let Err(err) = finished {
                warn!(error = %err, "delete job did not finish");
            }
        }
    }

    /// Number of producer and consumer tasks not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.jobs.lock().len()
    }
}

impl<S: ?Sized> Drop for DeletePipeline<S> {
    fn drop(&mut self) {
        let jobs = self.jobs.get_mut();
        if !jobs.is_empty() {
            debug!(in_flight = jobs.len(), "detaching delete jobs");
            jobs.detach_all();
        }
    }
}

async fn consume<S: Storage + ?Sized>(
    storage: Arc<S>,
    owner: OwnerId,
    mut rx: mpsc::Receiver<ShortCode>,
    chunk_size: usize,
) {
    let mut chunk = Vec::with_capacity(chunk_size);

    while let Some(code) = rx.recv().await {
        chunk.push(code);
        if chunk.len() == chunk_size {
            flush(storage.as_ref(), &owner, &mut chunk).await;
        }
    }

    if !chunk.is_empty() {
        flush(storage.as_ref(), &owner, &mut chunk).await;
    }
}

async fn flush<S: Storage + ?Sized>(storage: &S, owner: &OwnerId, chunk: &mut Vec<ShortCode>) {
    match storage.batch_delete(chunk, owner).await {
        Ok(deleted) => debug!(owner = %owner, size = chunk.len(), deleted, "delete chunk flushed"),
        Err(err) => warn!(owner = %owner, size = chunk.len(), error = %err, "delete chunk failed"),
    }
    chunk.clear();
}
