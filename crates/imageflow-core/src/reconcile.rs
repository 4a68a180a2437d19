use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;

use crate::actor::{ActorChannel, CheckRequest};
use crate::store::ImageStore;
use crate::Result;

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub namespace: String,
    pub name: String,
    /// Registry identifier joined with every pending revision
    pub registry: String,
    /// Fixed pause between failed cycles
    pub retry_interval: Duration,
}

/// How a check run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// One full cycle went through; `revisions` is the response size.
    Completed { revisions: usize },
    /// A stop was requested before a cycle could complete.
    Stopped,
}

#[derive(Debug, Default)]
struct StopState {
    stopped: AtomicBool,
    notify: Notify,
}

/// Cooperative stop signal for a running [`Checker`].
///
/// Honoured before a cycle starts and while sleeping between retries; a cycle
/// already in progress always runs to its end.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    inner: Arc<StopState>,
}

impl StopHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        tracing::info!("stopping checker");
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless stopped first. Returns true when stopped.
    async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_stopped() {
            return true;
        }

        tokio::select! {
            () = tokio::time::sleep(duration) => self.is_stopped(),
            () = notified => true,
        }
    }
}

/// Run-to-completion worker that hands pending revisions to the checker
/// actor and records its verdicts on the image.
pub struct Checker<S, C> {
    store: S,
    channel: C,
    options: CheckOptions,
    stop: StopHandle,
}

impl<S: ImageStore, C: ActorChannel> Checker<S, C> {
    pub fn new(store: S, channel: C, options: CheckOptions) -> Self {
        Self {
            store,
            channel,
            options,
            stop: StopHandle::new(),
        }
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Repeat [`Self::execute`] until one cycle succeeds.
    ///
    /// Transient failures are logged and retried after `retry_interval`;
    /// anything else is returned straight away.
    pub async fn run(&self) -> Result<CheckOutcome> {
        let mut attempt: u32 = 0;

        loop {
            if self.stop.is_stopped() {
                tracing::info!(image = %self.image_key(), "check stopped before cycle");
                return Ok(CheckOutcome::Stopped);
            }

            attempt += 1;
            match self.execute().await {
                Ok(revisions) => {
                    tracing::info!(image = %self.image_key(), attempt, revisions, "check finished");
                    return Ok(CheckOutcome::Completed { revisions });
                }
                Err(e) if !e.is_transient() => {
                    tracing::error!(image = %self.image_key(), attempt, error = %e, "check aborted");
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(
                        image = %self.image_key(),
                        attempt,
                        error = %e,
                        retry_in = ?self.options.retry_interval,
                        "check cycle failed"
                    );
                }
            }

            if self.stop.sleep(self.options.retry_interval).await {
                tracing::info!(image = %self.image_key(), "check stopped during backoff");
                return Ok(CheckOutcome::Stopped);
            }
        }
    }

    /// One fetch, export, import, update cycle. Returns the number of
    /// revisions in the actor's response.
    pub async fn execute(&self) -> Result<usize> {
        tracing::info!(image = %self.image_key(), "starting check cycle");

        let mut image = self
            .store
            .get_image(&self.options.namespace, &self.options.name)
            .await?;

        let request = CheckRequest::from_conditions(&self.options.registry, image.pending_checks());
        self.channel.export(&request).await?;

        let response = self.channel.import().await?;
        let changed = image.apply_check_response(&response, Utc::now());

        let updated = self.store.update_status(&image).await?;
        tracing::info!(
            image = %updated.key(),
            resource_version = updated.resource_version,
            changed,
            "image status updated"
        );

        Ok(response.revisions.len())
    }

    fn image_key(&self) -> String {
        format!("{}/{}", self.options.namespace, self.options.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{CheckResponse, CheckRevision, ProtocolError, ProtocolResult};
    use crate::condition::{ConditionStatus, ConditionType, ImageCondition};
    use crate::image::Image;
    use crate::store::{MemoryImageStore, StoreError};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    /// Actor double: the response becomes available after `misses` imports.
    struct ScriptedChannel {
        misses: Mutex<u32>,
        exports: Mutex<Vec<CheckRequest>>,
        response: CheckResponse,
    }

    impl ScriptedChannel {
        fn new(misses: u32, response: CheckResponse) -> Self {
            Self {
                misses: Mutex::new(misses),
                exports: Mutex::new(Vec::new()),
                response,
            }
        }

        fn export_count(&self) -> usize {
            self.exports.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ActorChannel for ScriptedChannel {
        async fn export(&self, request: &CheckRequest) -> ProtocolResult<()> {
            self.exports.lock().unwrap().push(request.clone());
            Ok(())
        }

        async fn import(&self) -> ProtocolResult<CheckResponse> {
            let mut misses = self.misses.lock().unwrap();
            if *misses > 0 {
                *misses -= 1;
                return Err(ProtocolError::Import {
                    path: PathBuf::from("output"),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Ok(self.response.clone())
        }
    }

    fn options() -> CheckOptions {
        CheckOptions {
            namespace: "default".into(),
            name: "app".into(),
            registry: "r".into(),
            retry_interval: Duration::from_secs(10),
        }
    }

    fn verdict(revision: &str, resolved: &str, exist: ConditionStatus) -> CheckResponse {
        CheckResponse {
            revisions: vec![CheckRevision {
                registry: "r".into(),
                resolved_revision: resolved.into(),
                revision: revision.into(),
                exist: Some(exist),
            }],
        }
    }

    async fn seeded_store() -> Arc<MemoryImageStore> {
        let store = Arc::new(MemoryImageStore::new());
        store
            .create_image(
                &Image::new("default", "app", "r").with_condition(ImageCondition::new(
                    ConditionType::Checked,
                    ConditionStatus::False,
                    "v1",
                )),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn completes_on_first_successful_cycle() {
        let store = seeded_store().await;
        let channel = Arc::new(ScriptedChannel::new(0, verdict("v1", "sha1", ConditionStatus::True)));
        let checker = Checker::new(Arc::clone(&store), Arc::clone(&channel), options());

        let outcome = checker.run().await.unwrap();

        assert_eq!(outcome, CheckOutcome::Completed { revisions: 1 });
        assert_eq!(channel.export_count(), 1);
        let image = store.get_image("default", "app").await.unwrap();
        assert_eq!(image.resource_version, 2);
        assert!(image.pending_checks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_response_repeats_whole_cycle() {
        let store = seeded_store().await;
        let channel = Arc::new(ScriptedChannel::new(2, verdict("v1", "sha1", ConditionStatus::False)));
        let checker = Checker::new(Arc::clone(&store), Arc::clone(&channel), options());

        let started = tokio::time::Instant::now();
        let outcome = checker.run().await.unwrap();

        assert_eq!(outcome, CheckOutcome::Completed { revisions: 1 });
        assert_eq!(channel.export_count(), 3);
        assert!(started.elapsed() >= Duration::from_secs(20));

        let image = store.get_image("default", "app").await.unwrap();
        let uploaded = image.condition(ConditionType::Uploaded, "v1").unwrap();
        assert_eq!(uploaded.status, ConditionStatus::False);
        assert_eq!(uploaded.resolved_revision, "sha1");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_refetches_image() {
        let store = seeded_store().await;
        let channel = Arc::new(ScriptedChannel::new(1, verdict("v1", "sha1", ConditionStatus::True)));
        let checker = Checker::new(Arc::clone(&store), Arc::clone(&channel), options());

        let task = tokio::spawn(async move { checker.run().await });

        // An upstream writer adds a pending revision while the checker backs off.
        tokio::time::sleep(Duration::from_secs(5)).await;
        let mut image = store.get_image("default", "app").await.unwrap();
        image
            .status
            .conditions
            .push(ImageCondition::new(ConditionType::Checked, ConditionStatus::False, "v2"));
        store.update_status(&image).await.unwrap();

        task.await.unwrap().unwrap();

        let exports = channel.exports.lock().unwrap();
        assert_eq!(exports.len(), 2);
        assert_eq!(exports[0].revisions.len(), 1);
        assert_eq!(exports[1].revisions.len(), 2);

        let image = store.get_image("default", "app").await.unwrap();
        assert_eq!(image.resource_version, 3);
    }

    /// Actor double that lets a concurrent writer bump the image version
    /// while the first response is being produced.
    struct ConcurrentWriterChannel {
        store: Arc<MemoryImageStore>,
        imports: AtomicU32,
        response: CheckResponse,
    }

    #[async_trait]
    impl ActorChannel for ConcurrentWriterChannel {
        async fn export(&self, _request: &CheckRequest) -> ProtocolResult<()> {
            Ok(())
        }

        async fn import(&self) -> ProtocolResult<CheckResponse> {
            if self.imports.fetch_add(1, Ordering::SeqCst) == 0 {
                let image = self.store.get_image("default", "app").await.unwrap();
                self.store.update_status(&image).await.unwrap();
            }
            Ok(self.response.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn update_conflict_is_retried_with_fresh_image() {
        let store = seeded_store().await;
        let channel = Arc::new(ConcurrentWriterChannel {
            store: Arc::clone(&store),
            imports: AtomicU32::new(0),
            response: verdict("v1", "sha1", ConditionStatus::True),
        });
        let checker = Checker::new(Arc::clone(&store), Arc::clone(&channel), options());

        let started = tokio::time::Instant::now();
        let outcome = checker.run().await.unwrap();

        assert_eq!(outcome, CheckOutcome::Completed { revisions: 1 });
        assert_eq!(channel.imports.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(10));

        let image = store.get_image("default", "app").await.unwrap();
        assert_eq!(image.resource_version, 3);
        assert_eq!(
            image.condition(ConditionType::Checked, "v1").unwrap().status,
            ConditionStatus::True
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_run_skips_cycle() {
        let store = seeded_store().await;
        let channel = Arc::new(ScriptedChannel::new(0, CheckResponse::default()));
        let checker = Checker::new(store, Arc::clone(&channel), options());

        checker.stop_handle().stop();

        assert_eq!(checker.run().await.unwrap(), CheckOutcome::Stopped);
        assert_eq!(channel.export_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_backoff() {
        let store = seeded_store().await;
        let channel = Arc::new(ScriptedChannel::new(u32::MAX, CheckResponse::default()));
        let checker = Checker::new(store, Arc::clone(&channel), options());
        let stop = checker.stop_handle();

        let task = tokio::spawn(async move { checker.run().await });
        tokio::time::sleep(Duration::from_secs(25)).await;
        stop.stop();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, CheckOutcome::Stopped);
        assert_eq!(channel.export_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_image_is_retried() {
        let store = Arc::new(MemoryImageStore::new());
        let channel = Arc::new(ScriptedChannel::new(0, CheckResponse::default()));
        let checker = Checker::new(Arc::clone(&store), Arc::clone(&channel), options());
        let stop = checker.stop_handle();

        let task = tokio::spawn(async move { checker.run().await });
        tokio::time::sleep(Duration::from_secs(5)).await;
        store
            .create_image(&Image::new("default", "app", "r"))
            .await
            .unwrap();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, CheckOutcome::Completed { revisions: 0 });
        assert_eq!(channel.export_count(), 1);
        assert!(!stop.is_stopped());
    }

    #[tokio::test]
    async fn execute_surfaces_store_errors() {
        let store = Arc::new(MemoryImageStore::new());
        let channel = Arc::new(ScriptedChannel::new(0, CheckResponse::default()));
        let checker = Checker::new(store, channel, options());

        let err = checker.execute().await.unwrap_err();
        assert!(matches!(err, crate::Error::Store(StoreError::NotFound { .. })));
        assert!(err.is_transient());
    }
}
