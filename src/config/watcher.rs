use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::LibraryResult;

/// Events closer together than this count as one change
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches one file for changes
///
/// The parent directory is watched rather than the file itself, so editors that save by
/// replacing the file are still noticed.
pub struct ConfigWatcher {
    /// Kept alive for as long as events are wanted
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<()>,
    path: PathBuf,
}

impl ConfigWatcher {
    pub fn watch(path: impl AsRef<Path>) -> LibraryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name = path.file_name().map(|name| name.to_os_string());
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let Ok(event) = res else { return };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            let touches_file = event
                .paths
                .iter()
                .any(|changed| changed.file_name().map(|n| n.to_os_string()) == file_name);
            if touches_file {
                let _ = tx.send(());
            }
        })?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next change, folding bursts of events into one.
    /// Returns `None` once the watcher has shut down.
    pub async fn next_change(&mut self) -> Option<()> {
        self.rx.recv().await?;
        loop {
            match tokio::time::timeout(DEBOUNCE, self.rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) | Err(_) => return Some(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_change_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory for watcher test");
        let path = temp_dir.path().join("live.json");
        fs::write(&path, "{}").expect("Failed to write live config");

        let mut watcher = ConfigWatcher::watch(&path).expect("Failed to watch live config");
        tokio::time::sleep(Duration::from_millis(50)).await;
        fs::write(&path, r#"{"motd": "changed"}"#).expect("Failed to rewrite live config");

        let change = tokio::time::timeout(Duration::from_secs(5), watcher.next_change()).await;
        assert_eq!(change.ok().flatten(), Some(()));
    }
}
