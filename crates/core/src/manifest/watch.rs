use super::{ManifestCell, ManifestContext};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchBackend {
    /// OS file notifications, falling back to polling when unavailable.
    #[default]
    Native,
    Poll,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub backend: WatchBackend,
    /// Quiet period after the last event before reloading.
    pub debounce: Duration,
    pub poll_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            backend: WatchBackend::Native,
            debounce: Duration::from_millis(100),
            poll_interval: Duration::from_secs(1),
        }
    }
}

pub(crate) struct WatchHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

struct FsWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl FsWatcher {
    fn new(dir: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    async fn next_event_async(&mut self) -> Option<notify::Result<Event>> {
        self.rx.recv().await
    }
}

/// Start the single writer of `cell` on `runtime`.
pub(crate) fn spawn(
    runtime: &tokio::runtime::Handle,
    path: PathBuf,
    cell: Arc<ManifestCell>,
    options: WatchOptions,
) -> WatchHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let native = match options.backend {
        WatchBackend::Native => {
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            match FsWatcher::new(&dir) {
                Ok(watcher) => Some(watcher),
                Err(err) => {
                    tracing::warn!(
                        "native watcher unavailable for {} ({}), polling instead",
                        dir.display(),
                        err
                    );
                    None
                }
            }
        }
        WatchBackend::Poll => None,
    };

    // Taken before the caller's first read, so a write in between is seen as a change.
    let baseline = std::fs::metadata(&path).ok().map(|m| (m.modified().ok(), m.len()));

    let task = runtime.spawn(async move {
        tracing::info!("Started watching manifest {}", path.display());
        match native {
            Some(watcher) => run_native(watcher, &path, &cell, options.debounce, token).await,
            None => run_poll(&path, &cell, baseline, options.poll_interval, token).await,
        }
        tracing::info!("Manifest watcher ended for {}", path.display());
    });

    WatchHandle { cancel, task }
}

async fn run_native(
    mut watcher: FsWatcher,
    path: &Path,
    cell: &ManifestCell,
    debounce: Duration,
    cancel: CancellationToken,
) {
    let mut pending = false;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = watcher.next_event_async() => {
                match event {
                    Some(Ok(event)) => {
                        if affects(&event, path) {
                            pending = true;
                        }
                    }
                    Some(Err(err)) => tracing::warn!("manifest watcher error: {}", err),
                    None => break,
                }
            }
            _ = tokio::time::sleep(debounce), if pending => {
                pending = false;
                reload(path, cell).await;
            }
        }
    }
}

type Signature = Option<(Option<SystemTime>, u64)>;

async fn run_poll(
    path: &Path,
    cell: &ManifestCell,
    mut last: Signature,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let current = signature(path).await;
                if current != last {
                    last = current;
                    reload(path, cell).await;
                }
            }
        }
    }
}

fn affects(event: &Event, path: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name().is_some() && p.file_name() == path.file_name())
}

async fn signature(path: &Path) -> Signature {
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some((meta.modified().ok(), meta.len()))
}

/// Re-read the manifest and swap it in. Any failure keeps the current snapshot.
pub(crate) async fn reload(path: &Path, cell: &ManifestCell) {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(
                "manifest {} removed; serving last snapshot until it reappears",
                path.display()
            );
            return;
        }
        Err(err) => {
            tracing::warn!("failed to read manifest {}: {}", path.display(), err);
            return;
        }
    };
    match ManifestContext::from_slice(&path.display().to_string(), &data) {
        Ok(context) => {
            tracing::info!(
                "reloaded manifest {} ({} entries)",
                path.display(),
                context.len()
            );
            cell.store(Arc::new(context));
        }
        Err(err) => {
            tracing::warn!("keeping previous manifest: {}", err);
        }
    }
}
