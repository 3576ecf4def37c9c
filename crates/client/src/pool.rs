//! Bounded-concurrency work dispatch.
//!
//! One producer feeds items into a bounded channel; a fixed set of workers
//! drains it. All parties share a cancellation token: the first handler
//! error cancels it, the producer's send races it, and workers re-check it
//! after every item. Every worker is joined before returning, so no task
//! outlives the call.

use crate::error::{Error, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use porter_rpc::RpcError;
use std::future::Future;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Run `handler` over `items` with at most `width` in flight.
///
/// Returns the first handler error, or the cancellation error when `cancel`
/// fires first. Items are fed in order; completions may interleave.
pub(crate) async fn dispatch_bounded<T, F, Fut>(
    cancel: &CancellationToken,
    width: usize,
    items: Vec<T>,
    handler: F,
) -> Result<()>
where
    T: Send,
    F: Fn(T) -> Fut + Sync,
    Fut: Future<Output = Result<()>>,
{
    if items.is_empty() {
        return Ok(());
    }
    let width = width.max(1);
    let workers = width.min(items.len());
    let (tx, rx) = mpsc::channel::<T>(width);
    let queue = Mutex::new(rx);

    let queue_ref = &queue;
    let handler_ref = &handler;
    let producer = async move {
        for item in items {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Rpc(RpcError::Cancelled)),
                sent = tx.send(item) => {
                    // All workers have exited; nothing left to feed.
                    if sent.is_err() {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
        // tx drops here, closing the channel.
    };

    let mut pool: FuturesUnordered<_> = (0..workers)
        .map(|_| worker_loop(cancel, queue_ref, handler_ref))
        .collect();
    let drain = async move {
        let mut first_err = None;
        while let Some(result) = pool.next().await {
            if let Err(err) = result {
                cancel.cancel();
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    };

    let (fed, drained) = tokio::join!(producer, drain);
    drained.and(fed)
}

async fn worker_loop<T, F, Fut>(
    cancel: &CancellationToken,
    queue: &Mutex<mpsc::Receiver<T>>,
    handler: &F,
) -> Result<()>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    loop {
        let item = {
            let mut rx = queue.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Rpc(RpcError::Cancelled)),
                item = rx.recv() => item,
            }
        };
        let Some(item) = item else {
            return Ok(());
        };
        handler(item).await?;
        if cancel.is_cancelled() {
            return Err(Error::Rpc(RpcError::Cancelled));
        }
    }
}
