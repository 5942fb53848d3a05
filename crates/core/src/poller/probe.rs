//! Probes invoked by the discovery poller

use async_trait::async_trait;
use std::future::Future;

/// What a single probe invocation observed
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStatus<T> {
    /// Not finished yet; poll again on the next tick
    Pending,
    /// Finished; ends the poll with this result
    Done(T),
}

/// One check of an external operation.
///
/// Returning `Err` fails the poll. Invocations are never concurrent.
#[async_trait]
pub trait Probe: Send + 'static {
    type Output: Send + 'static;

    async fn probe(&mut self) -> anyhow::Result<ProbeStatus<Self::Output>>;
}

/// Probe backed by a closure returning a future
pub struct FnProbe<F> {
    f: F,
}

/// Wrap a closure as a [`Probe`]
pub fn probe_fn<F, Fut, T>(f: F) -> FnProbe<F>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<ProbeStatus<T>>> + Send + 'static,
    T: Send + 'static,
{
    FnProbe { f }
}

#[async_trait]
impl<F, Fut, T> Probe for FnProbe<F>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<ProbeStatus<T>>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn probe(&mut self) -> anyhow::Result<ProbeStatus<T>> {
        (self.f)().await
    }
}
