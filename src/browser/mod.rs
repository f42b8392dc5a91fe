//! Browser automation seam
//!
//! The scenario runner only talks to a [`Driver`]: one isolated browser
//! session that can navigate, query the DOM, act on elements and intercept
//! native dialogs. [`Launcher`] hands out a fresh session per scenario.

pub mod chromium;
pub mod script;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::common::{Error, Result};

pub use chromium::ChromiumLauncher;

/// Kind of native browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    #[default]
    Alert,
    Confirm,
    Prompt,
    #[serde(rename = "beforeunload")]
    BeforeUnload,
}

impl fmt::Display for DialogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DialogKind::Alert => "alert",
            DialogKind::Confirm => "confirm",
            DialogKind::Prompt => "prompt",
            DialogKind::BeforeUnload => "beforeunload",
        };
        f.write_str(s)
    }
}

/// A dialog that was intercepted and dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub message: String,
}

/// Pending interception of the next dialog on a page
///
/// Created by [`Driver::arm_dialog`] *before* the action that raises the
/// dialog. The backing listener accepts the dialog as soon as it opens, so
/// the triggering action can complete.
pub struct DialogWatch {
    rx: oneshot::Receiver<Dialog>,
    listener: Option<JoinHandle<()>>,
}

impl DialogWatch {
    /// Watch backed by a spawned listener task, aborted when the watch drops
    pub fn spawned(rx: oneshot::Receiver<Dialog>, listener: JoinHandle<()>) -> Self {
        Self {
            rx,
            listener: Some(listener),
        }
    }

    /// Watch fed directly through a channel
    pub fn from_receiver(rx: oneshot::Receiver<Dialog>) -> Self {
        Self { rx, listener: None }
    }

    /// Wait for the dialog, bounded by `timeout`
    pub async fn wait(mut self, timeout: Duration) -> Result<Dialog> {
        let ms = timeout.as_millis() as u64;
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(dialog)) => Ok(dialog),
            // Listener gone without a dialog: the page closed or the
            // event stream ended.
            Ok(Err(_)) => Err(Error::Browser(
                "dialog listener stopped before a dialog appeared".to_string(),
            )),
            Err(_) => Err(Error::DialogTimeout(ms)),
        }
    }
}

impl Drop for DialogWatch {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// One isolated browser session
///
/// Selectors are CSS selectors. Operations do not wait on their own beyond
/// what the browser needs to complete them; the runner bounds every call
/// with a timeout and implements auto-waiting by polling.
#[async_trait]
pub trait Driver: Send {
    /// Load `url` and wait for the load to finish
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Current page URL
    async fn current_url(&mut self) -> Result<String>;

    /// Whether an element matches `selector`
    async fn exists(&mut self, selector: &str) -> Result<bool>;

    /// Replace the value of the input matching `selector`
    async fn fill(&mut self, selector: &str, value: &str) -> Result<()>;

    /// Click the element matching `selector`
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Rendered text of the element matching `selector`, `None` when absent
    async fn text_of(&mut self, selector: &str) -> Result<Option<String>>;

    /// Whether the element matching `selector` exists and is rendered visibly
    async fn is_visible(&mut self, selector: &str) -> Result<bool>;

    /// Whether some visible element's text contains `text`
    async fn text_visible(&mut self, text: &str) -> Result<bool>;

    /// Start intercepting the next dialog; call before the triggering action
    async fn arm_dialog(&mut self) -> Result<DialogWatch>;

    /// Release the session and everything it holds
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Produces isolated sessions
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Driver>>;
}
