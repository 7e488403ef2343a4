use crate::{
    activity::ActivityRecord,
    engine::{SyncEngine, SyncError},
    file_op::{ChangeEvent, EventClassifier},
    remote::RemoteEndpoint,
};
use anyhow::{anyhow, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Capacity of the watcher -> engine channel.
pub const EVENT_QUEUE: usize = 1024;

/// Receives the activity log after every processed event.
pub trait Presenter {
    fn render(&mut self, records: &[ActivityRecord]);
}

/// Presenter that discards everything, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render(&mut self, _records: &[ActivityRecord]) {}
}

/// Feed events to the engine one at a time until the channel closes.
///
/// The engine finishes an event, retries included, and the presenter is
/// refreshed before the next event is taken off the channel. An unhandled
/// failure ends the loop; events still queued are never processed.
pub async fn run_dispatch<R, P>(
    engine: &mut SyncEngine<R>,
    mut events: mpsc::Receiver<ChangeEvent>,
    presenter: &mut P,
) -> Result<(), SyncError>
where
    R: RemoteEndpoint,
    P: Presenter + ?Sized,
{
    presenter.render(engine.log().records());
    while let Some(event) = events.recv().await {
        if let Err(e) = engine.handle(event).await {
            error!("sync stopped: {e}");
            return Err(e);
        }
        presenter.render(engine.log().records());
    }
    info!("event stream closed");
    Ok(())
}

/// How long a rename `From` half waits for its `To` half before it is
/// reported as a deletion.
pub const RENAME_PAIRING: Duration = Duration::from_millis(500);

/// Watch `root` recursively and push classified events into `tx`.
///
/// Raw events go through a task that owns the [`EventClassifier`], so a
/// file moved out of the tree is reported once [`RENAME_PAIRING`] elapses
/// without a matching `To`. Must be called from within a tokio runtime.
/// The returned watcher must be kept alive for events to keep flowing.
pub fn spawn_watcher(root: &Path, tx: mpsc::Sender<ChangeEvent>) -> Result<RecommendedWatcher> {
    let (raw_tx, raw_rx) = mpsc::channel::<notify::Event>(EVENT_QUEUE);
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                let _ = raw_tx.blocking_send(event);
            }
            Err(e) => error!("watch error: {e}"),
        },
        notify::Config::default(),
    )
    .map_err(|e| anyhow!(e))?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| anyhow!("watch {} failed: {e}", root.display()))?;
    tokio::spawn(classify_events(raw_rx, tx, RENAME_PAIRING));
    info!("watching {}", root.display());
    Ok(watcher)
}

/// Classify raw events in arrival order, flushing an unpaired rename half
/// after `pairing` of silence. Ends when either side of the pipe closes.
pub(crate) async fn classify_events(
    mut raw: mpsc::Receiver<notify::Event>,
    tx: mpsc::Sender<ChangeEvent>,
    pairing: Duration,
) {
    let mut classifier = EventClassifier::new();
    loop {
        let next = if classifier.has_pending() {
            match tokio::time::timeout(pairing, raw.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    if let Some(change) = classifier.flush() {
                        debug!("rename half timed out: {change:?}");
                        if tx.send(change).await.is_err() {
                            return;
                        }
                    }
                    continue;
                }
            }
        } else {
            raw.recv().await
        };

        let Some(event) = next else {
            if let Some(change) = classifier.flush() {
                let _ = tx.send(change).await;
            }
            return;
        };
        for change in classifier.classify(event) {
            if tx.send(change).await.is_err() {
                return;
            }
        }
    }
}
