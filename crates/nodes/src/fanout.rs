//! Fan-out/fan-in over per-file units of work.
//!
//! All units of a batch are started together and polled concurrently on the
//! calling task; nothing is spawned, batched, or throttled. The batch resolves
//! only once every unit has finished, and results are reassembled by the key
//! carried alongside each unit, so completion order never affects the result.
//!
//! ## Failure policy
//!
//! Fail fast and cancel siblings: the first unit to fail resolves the batch
//! with that error, and every unit still in flight is dropped. No partial map
//! is returned.

use std::collections::BTreeMap;
use std::future::Future;

use futures::future::try_join_all;

/// Runs every `(key, unit)` pair concurrently and collects outputs by key.
pub async fn gather_keyed<K, T, E, Fut, I>(units: I) -> Result<BTreeMap<K, T>, E>
where
    I: IntoIterator<Item = (K, Fut)>,
    K: Ord,
    Fut: Future<Output = Result<T, E>>,
{
    let batch = units
        .into_iter()
        .map(|(key, unit)| async move { unit.await.map(|output| (key, output)) });
    let outputs = try_join_all(batch).await?;
    Ok(outputs.into_iter().collect())
}
