use crate::error::{Error, Result};
use futures::future::join_all;
use std::future::Future;

/// Spawns every future as its own task and waits for all of them.
///
/// The output has one entry per input, in input order, whatever order the
/// tasks finish in. A failing or panicking task only turns its own slot into
/// an `Err`.
pub async fn run_all<I, Fut, R>(futures: I) -> Vec<Result<R>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let handles: Vec<_> = futures.into_iter().map(tokio::spawn).collect();
    join_all(handles)
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("worker task aborted: {}", e))),
        })
        .collect()
}
