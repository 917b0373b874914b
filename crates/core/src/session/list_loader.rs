use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::errors::Result;

/// Fetches the full list a page starts from.
#[async_trait]
pub trait ListLoader<T>: Send + Sync {
    async fn fetch(&self) -> Result<Vec<T>>;
}

type FetchFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync>;

/// Loader backed by a closure returning a boxed future.
///
/// ```ignore
/// let backend = backend.clone();
/// let loader = FnLoader::new(move || {
///     let backend = backend.clone();
///     Box::pin(async move { backend.list_markets().await })
/// });
/// ```
pub struct FnLoader<T> {
    fetch: FetchFn<T>,
}

impl<T> FnLoader<T> {
    pub fn new<F>(fetch: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync + 'static,
    {
        Self {
            fetch: Box::new(fetch),
        }
    }
}

impl<T> fmt::Debug for FnLoader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLoader").finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: Send + 'static> ListLoader<T> for FnLoader<T> {
    async fn fetch(&self) -> Result<Vec<T>> {
        (self.fetch)().await
    }
}
