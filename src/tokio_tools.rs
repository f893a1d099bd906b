use std::future::Future;

use tokio::task::JoinHandle;

/// Spawn a Tokio task with a stable name when supported, and trace span otherwise.
pub fn spawn_named_task<F, S>(name: S, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
    S: Into<String>,
{
    let name_owned = name.into();
    #[cfg(tokio_unstable)]
    {
        match tokio::task::Builder::new().name(&name_owned).spawn(future) {
            Ok(handle) => handle,
            Err(err) => panic!("failed to spawn task {name_owned}: {err}"),
        }
    }
    #[cfg(not(tokio_unstable))]
    {
        use tracing::Instrument;
        let span = tracing::info_span!("task", task_name = %name_owned);
        tokio::spawn(future.instrument(span))
    }
}

/// Run one future per party concurrently and collect their outputs in party order.
pub async fn join_parties<T, F>(futures: Vec<(u32, F)>) -> Vec<Result<T, tokio::task::JoinError>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futures
        .into_iter()
        .map(|(party, future)| spawn_named_task(format!("party-{party}"), future))
        .collect();
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await);
    }
    results
}
