// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fire-and-forget appends to the collapsed-stack log.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Appends text to a file from a background task.
///
/// The file is opened synchronously by [`AsyncAppender::open`]. Each
/// [`AsyncAppender::append`] moves its buffer into a channel drained by a
/// single task, so writes land in submission order and every buffer is
/// dropped by that task once its write finishes, successfully or not.
///
/// If the file could not be opened the appender is created anyway and
/// silently discards everything it is given.
#[derive(Debug)]
pub struct AsyncAppender {
    path: PathBuf,
    sender: Option<mpsc::UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl AsyncAppender {
    pub fn open(path: impl AsRef<Path>, runtime: &Handle) -> Self {
        let path = path.as_ref().to_path_buf();
        match open_for_append(&path) {
            Ok(file) => {
                let (sender, receiver) = mpsc::unbounded_channel();
                let task = runtime.spawn(drain(file, path.clone(), receiver));
                Self {
                    path,
                    sender: Some(sender),
                    task: Some(task),
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Could not open profiling destination");
                Self {
                    path,
                    sender: None,
                    task: None,
                }
            }
        }
    }

    /// Whether the destination was opened. Appends to an invalid appender are
    /// dropped.
    pub fn is_valid(&self) -> bool {
        self.sender.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(sender) = &self.sender {
            // Only fails once the task is gone, in which case there is nowhere
            // left to write.
            let _ = sender.send(text);
        }
    }

    /// Stops accepting appends. The returned handle resolves after every
    /// queued write has been attempted and the file is closed.
    pub fn close(mut self) -> Option<JoinHandle<()>> {
        self.sender.take();
        self.task.take()
    }
}

#[cfg(unix)]
fn open_for_append(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o644)
        .open(path)
}

#[cfg(not(unix))]
fn open_for_append(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new().create(true).append(true).open(path)
}

async fn drain(file: fs::File, path: PathBuf, mut receiver: mpsc::UnboundedReceiver<String>) {
    let mut file = tokio::fs::File::from_std(file);
    while let Some(text) = receiver.recv().await {
        if let Err(err) = file.write_all(text.as_bytes()).await {
            debug!(
                path = %path.display(),
                error = %err,
                bytes = text.len(),
                "Dropped collapsed stacks"
            );
        }
    }
    if let Err(err) = file.flush().await {
        debug!(path = %path.display(), error = %err, "Failed to flush collapsed stacks");
    }
}
