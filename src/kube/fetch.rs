//! Bounded-concurrency object fetching
//!
//! One task per resource type, gated by a semaphore. Each task reports exactly
//! once, either a batch on the results channel or an error on the error
//! channel, and the first error fails the whole fetch.

use super::client::{DiscoveredResource, ListError, ObjectClient};
use crate::graph::GraphError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;

/// Default number of list calls in flight at once
pub const DEFAULT_CONCURRENCY: usize = 10;

/// List every object of every discovered type
///
/// Returns the flattened objects of all types. Types reported as not found
/// contribute nothing. Outstanding tasks are aborted when an error or
/// cancellation ends the fetch early.
pub async fn fetch_all<C>(
    client: Arc<C>,
    resources: Vec<DiscoveredResource>,
    namespace: Option<String>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Value>, GraphError>
where
    C: ObjectClient + ?Sized + 'static,
{
    let total = resources.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let (result_tx, mut result_rx) = mpsc::channel::<Vec<Value>>(total.max(1));
    let (error_tx, mut error_rx) = mpsc::channel::<GraphError>(total.max(1));

    tracing::info!(
        "Fetching {} resource types with {} workers",
        total,
        concurrency.max(1)
    );

    let mut tasks = JoinSet::new();
    let mut names = HashMap::new();
    for resource in resources {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        let namespace = namespace.clone();
        let result_tx = result_tx.clone();
        let error_tx = error_tx.clone();

        let name = resource.to_string();
        let handle = tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };

            match client.list(&resource, namespace.as_deref()).await {
                Ok(items) => {
                    tracing::debug!(resource = %resource, count = items.len(), "Listed resource");
                    let _ = result_tx.send(items).await;
                }
                Err(ListError::NotFound) => {
                    tracing::debug!(resource = %resource, "Resource not found, treating as empty");
                    let _ = result_tx.send(Vec::new()).await;
                }
                Err(ListError::Other(source)) => {
                    let _ = error_tx
                        .send(GraphError::Fetch {
                            resource: resource.to_string(),
                            source,
                        })
                        .await;
                }
            }
        });
        names.insert(handle.id(), name);
    }
    drop(result_tx);
    drop(error_tx);

    let mut objects = Vec::new();
    let mut received = 0;
    while received < total {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GraphError::Cancelled),
            Some(err) = error_rx.recv() => return Err(err),
            batch = result_rx.recv() => match batch {
                Some(batch) => {
                    received += 1;
                    objects.extend(batch);
                }
                None => {
                    while let Some(joined) = tasks.join_next().await {
                        if let Err(e) = joined {
                            return Err(worker_failed(&names, e));
                        }
                    }
                    return Err(GraphError::Malformed(format!(
                        "fetch workers exited after reporting {} of {} resource types",
                        received, total
                    )));
                }
            },
            Some(Err(e)) = tasks.join_next() => return Err(worker_failed(&names, e)),
        }
    }

    // Every task has reported; reap them so panics are not silently lost
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::warn!("Fetch worker did not finish cleanly: {}", e);
        }
    }

    tracing::info!("Fetched {} objects", objects.len());
    Ok(objects)
}

fn worker_failed(names: &HashMap<task::Id, String>, e: task::JoinError) -> GraphError {
    GraphError::Fetch {
        resource: names.get(&e.id()).cloned().unwrap_or_default(),
        source: Box::new(e),
    }
}
