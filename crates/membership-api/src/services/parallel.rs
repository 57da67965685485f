//! Bounded fan-out over directory calls.

use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};

use common::AppResult;

/// Execute operations with at most `limit` in flight.
///
/// Results come back in input order regardless of completion order. The
/// first error is returned and every operation still pending is dropped.
/// A `limit` of zero is treated as one.
///
/// # Example
/// ```ignore
/// let groups = parallel::join_all_ordered(
///     group_ids.iter().map(|id| directory.get_group(id)),
///     4,
/// ).await?;
/// ```
pub async fn join_all_ordered<F, T, I>(futures: I, limit: usize) -> AppResult<Vec<T>>
where
    F: Future<Output = AppResult<T>>,
    I: IntoIterator<Item = F>,
{
    stream::iter(futures)
        .buffered(limit.max(1))
        .try_collect()
        .await
}
