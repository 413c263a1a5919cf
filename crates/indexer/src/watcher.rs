use crate::error::Result;
use crate::event::{convert_notify_event, FileEvent};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;

/// Subscribe a recursive OS watcher on `root`, bridging its callback
/// thread into the synchronizer's event channel.
///
/// When the queue is full, `blocking_send` stalls the watcher thread
/// until the synchronizer catches up; events are never dropped. A
/// closed channel means the synchronizer is gone, so the callback just
/// stops forwarding.
pub(crate) fn spawn_fs_watcher(
    root: &Path,
    sender: mpsc::Sender<FileEvent>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for file_event in convert_notify_event(&event) {
                    if sender.blocking_send(file_event).is_err() {
                        return;
                    }
                }
            }
            Err(err) => log::warn!("Watcher error: {err}"),
        },
        NotifyConfig::default(),
    )?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}
