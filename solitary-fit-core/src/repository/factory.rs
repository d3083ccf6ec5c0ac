use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{RepositoryError, WorkoutLogsRepository};

/// Builds a repository on demand.
pub type RepositoryProvider = Box<
    dyn Fn() -> BoxFuture<'static, Result<Arc<dyn WorkoutLogsRepository>, RepositoryError>>
        + Send
        + Sync,
>;

/// Chooses between the offline and online repositories.
///
/// Neither repository is built until it is first asked for, and each is
/// built at most once: concurrent first callers wait on the same
/// construction and all receive the same instance. If construction fails
/// the error is returned and the next caller tries again.
pub struct LazyRepositoryFactory {
    offline_provider: RepositoryProvider,
    online_provider: RepositoryProvider,
    offline: OnceCell<Arc<dyn WorkoutLogsRepository>>,
    online: OnceCell<Arc<dyn WorkoutLogsRepository>>,
}

impl LazyRepositoryFactory {
    pub fn new<F, FFut, G, GFut>(offline: F, online: G) -> Self
    where
        F: Fn() -> FFut + Send + Sync + 'static,
        FFut: Future<Output = Result<Arc<dyn WorkoutLogsRepository>, RepositoryError>>
            + Send
            + 'static,
        G: Fn() -> GFut + Send + Sync + 'static,
        GFut: Future<Output = Result<Arc<dyn WorkoutLogsRepository>, RepositoryError>>
            + Send
            + 'static,
    {
        Self {
            offline_provider: Box::new(move || offline().boxed()),
            online_provider: Box::new(move || online().boxed()),
            offline: OnceCell::new(),
            online: OnceCell::new(),
        }
    }

    /// Factory over two repositories that already exist.
    pub fn from_instances(
        offline: Arc<dyn WorkoutLogsRepository>,
        online: Arc<dyn WorkoutLogsRepository>,
    ) -> Self {
        Self::new(
            move || {
                let repo = offline.clone();
                async move { Ok::<_, RepositoryError>(repo) }
            },
            move || {
                let repo = online.clone();
                async move { Ok::<_, RepositoryError>(repo) }
            },
        )
    }

    pub async fn offline_repository(
        &self,
    ) -> Result<Arc<dyn WorkoutLogsRepository>, RepositoryError> {
        get_or_build(&self.offline, &self.offline_provider, "offline").await
    }

    pub async fn online_repository(
        &self,
    ) -> Result<Arc<dyn WorkoutLogsRepository>, RepositoryError> {
        get_or_build(&self.online, &self.online_provider, "online").await
    }

    /// The active repository: online when signed in, offline otherwise.
    pub async fn create(
        &self,
        is_signed_in: bool,
    ) -> Result<Arc<dyn WorkoutLogsRepository>, RepositoryError> {
        if is_signed_in {
            self.online_repository().await
        } else {
            self.offline_repository().await
        }
    }
}

async fn get_or_build(
    cell: &OnceCell<Arc<dyn WorkoutLogsRepository>>,
    provider: &RepositoryProvider,
    kind: &str,
) -> Result<Arc<dyn WorkoutLogsRepository>, RepositoryError> {
    cell.get_or_try_init(|| async {
        tracing::debug!("Constructing {} repository", kind);
        let repo = provider().await;
        if let Err(e) = &repo {
            tracing::warn!("Failed to construct {} repository: {}", kind, e);
        }
        repo
    })
    .await
    .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryWorkoutLogsRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const CALLERS: usize = 100;

    fn counting_factory(
        offline: Arc<dyn WorkoutLogsRepository>,
        online: Arc<dyn WorkoutLogsRepository>,
    ) -> (LazyRepositoryFactory, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let offline_builds = Arc::new(AtomicUsize::new(0));
        let online_builds = Arc::new(AtomicUsize::new(0));

        let counter = offline_builds.clone();
        let offline_provider = move || {
            let repo = offline.clone();
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                // widen the race window
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, RepositoryError>(repo)
            }
        };

        let counter = online_builds.clone();
        let online_provider = move || {
            let repo = online.clone();
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, RepositoryError>(repo)
            }
        };

        (
            LazyRepositoryFactory::new(offline_provider, online_provider),
            offline_builds,
            online_builds,
        )
    }

    fn memory_repo() -> Arc<dyn WorkoutLogsRepository> {
        Arc::new(MemoryWorkoutLogsRepository::new())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_first_access_returns_same_instance() {
        let offline = memory_repo();
        let online = memory_repo();
        let (factory, offline_builds, online_builds) =
            counting_factory(offline.clone(), online.clone());
        let factory = Arc::new(factory);
        let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));

        let mut handles = Vec::with_capacity(CALLERS);
        for _ in 0..CALLERS {
            let factory = factory.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                let offline = factory.offline_repository().await.unwrap();
                let online = factory.online_repository().await.unwrap();
                (offline, online)
            }));
        }

        for handle in handles {
            let (got_offline, got_online) = handle.await.unwrap();
            assert!(Arc::ptr_eq(&got_offline, &offline));
            assert!(Arc::ptr_eq(&got_online, &online));
        }

        assert_eq!(offline_builds.load(Ordering::SeqCst), 1);
        assert_eq!(online_builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_access_from_threads() {
        let offline = memory_repo();
        let online = memory_repo();
        let (factory, offline_builds, online_builds) =
            counting_factory(offline.clone(), online.clone());
        let barrier = std::sync::Barrier::new(CALLERS);

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    scope.spawn(|| {
                        let rt = tokio::runtime::Builder::new_current_thread()
                            .enable_time()
                            .build()
                            .unwrap();
                        barrier.wait();
                        rt.block_on(async {
                            (
                                factory.offline_repository().await.unwrap(),
                                factory.online_repository().await.unwrap(),
                            )
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.len(), CALLERS);
        for (got_offline, got_online) in &results {
            assert!(Arc::ptr_eq(got_offline, &offline));
            assert!(Arc::ptr_eq(got_online, &online));
        }
        assert_eq!(offline_builds.load(Ordering::SeqCst), 1);
        assert_eq!(online_builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_providers_are_lazy_and_independent() {
        let (factory, offline_builds, online_builds) =
            counting_factory(memory_repo(), memory_repo());

        assert_eq!(offline_builds.load(Ordering::SeqCst), 0);
        assert_eq!(online_builds.load(Ordering::SeqCst), 0);

        factory.offline_repository().await.unwrap();
        factory.offline_repository().await.unwrap();

        assert_eq!(offline_builds.load(Ordering::SeqCst), 1);
        assert_eq!(online_builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_selects_by_sign_in_state() {
        let offline = memory_repo();
        let online = memory_repo();
        let factory = LazyRepositoryFactory::from_instances(offline.clone(), online.clone());

        let active = factory.create(false).await.unwrap();
        assert!(Arc::ptr_eq(&active, &offline));

        let active = factory.create(true).await.unwrap();
        assert!(Arc::ptr_eq(&active, &online));
    }

    #[tokio::test]
    async fn test_failed_construction_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let online = memory_repo();

        let counter = attempts.clone();
        let factory = LazyRepositoryFactory::new(
            || async { Ok::<_, RepositoryError>(memory_repo()) },
            move || {
                let counter = counter.clone();
                let repo = online.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(RepositoryError::NotSignedIn)
                    } else {
                        Ok::<_, RepositoryError>(repo)
                    }
                }
            },
        );

        let first = factory.online_repository().await;
        assert_eq!(first.err(), Some(RepositoryError::NotSignedIn));

        let second = factory.online_repository().await.unwrap();
        let third = factory.online_repository().await.unwrap();
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
