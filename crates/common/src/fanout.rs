//! Bounded fan-out of independent network reads.
//!
//! Every read the registry tools do is a side-effect-free query, so the only knobs are how many
//! run at once and how long a single one may take. Results are joined before returning; the first
//! failure drops the remaining in-flight calls.

use std::{future::Future, time::Duration};

use futures::{stream, StreamExt, TryStreamExt};
use tokio::time::{error::Elapsed, timeout};

/// Width and per-call timeout of a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fanout {
    width: usize,
    call_timeout: Duration,
}

impl Fanout {
    /// Creates a fan-out running at most `width` calls at once. A zero width is treated as 1.
    pub fn new(width: usize, call_timeout: Duration) -> Self {
        Self {
            width: width.max(1),
            call_timeout,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Runs `f` over every item and collects the results in input order.
    ///
    /// Fails with the first error encountered, or with `E::from(Elapsed)` if a call exceeds the
    /// timeout. Calls still in flight at that point are cancelled.
    pub async fn try_join<I, F, Fut, T, E>(&self, items: I, mut f: F) -> Result<Vec<T>, E>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Elapsed>,
    {
        let call_timeout = self.call_timeout;
        stream::iter(items)
            .map(|item| {
                let fut = f(item);
                async move { timeout(call_timeout, fut).await? }
            })
            .buffered(self.width)
            .try_collect()
            .await
    }

    /// Calls a single future under the fan-out's timeout.
    pub async fn call<Fut, T, E>(&self, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: From<Elapsed>,
    {
        timeout(self.call_timeout, fut).await?
    }
}
