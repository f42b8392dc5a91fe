//! Chromium sessions over the Chrome DevTools Protocol
//!
//! Every session is its own browser process with its own throwaway profile
//! directory, so cookies and storage never leak between scenarios.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    DialogType, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{script, Dialog, DialogKind, DialogWatch, Driver, Launcher};
use crate::common::config::{BrowserSettings, Timeouts};
use crate::common::{Config, Error, Result};

/// Launches one Chromium process per session
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    settings: BrowserSettings,
    timeouts: Timeouts,
    executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    /// Create a launcher, resolving the configured executable up front
    pub fn new(config: &Config) -> Result<Self> {
        let executable = config
            .browser
            .executable
            .as_deref()
            .map(resolve_executable)
            .transpose()?;

        Ok(Self {
            settings: config.browser.clone(),
            timeouts: config.timeouts.clone(),
            executable,
        })
    }

    fn browser_config(&self, profile: &Path) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.settings.window_width, self.settings.window_height)
            .user_data_dir(profile)
            .request_timeout(self.timeouts.navigation());

        if !self.settings.headless {
            builder = builder.with_head();
        }
        if self.settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(exe) = &self.executable {
            builder = builder.chrome_executable(exe);
        }

        builder.build().map_err(Error::BrowserLaunch)
    }
}

/// Resolve a configured executable: paths are used as-is, bare names are
/// looked up on PATH
fn resolve_executable(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.components().count() > 1 || path.is_absolute() {
        if !path.exists() {
            return Err(Error::BrowserLaunch(format!(
                "Browser executable '{}' does not exist",
                name
            )));
        }
        return Ok(path.to_path_buf());
    }

    which::which(name)
        .map_err(|e| Error::BrowserLaunch(format!("'{}' not found on PATH: {}", name, e)))
}

#[async_trait]
impl Launcher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn Driver>> {
        let profile = tempfile::Builder::new()
            .prefix("catalog-e2e-profile-")
            .tempdir()?;
        let config = self.browser_config(profile.path())?;

        let launch_timeout = self.timeouts.launch();
        let (mut browser, mut handler) = tokio::time::timeout(launch_timeout, Browser::launch(config))
            .await
            .map_err(|_| {
                Error::BrowserLaunch(format!(
                    "browser did not start within {} s",
                    launch_timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::BrowserLaunch(e.to_string()))?;

        let handler_task = HandlerTask(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        }));

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                return Err(Error::BrowserLaunch(format!("failed to open page: {}", e)));
            }
        };

        tracing::debug!(profile = %profile.path().display(), "Browser session started");

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            _handler: handler_task,
            _profile: profile,
        }))
    }
}

/// Aborts the CDP event loop when the session goes away
struct HandlerTask(JoinHandle<()>);

impl Drop for HandlerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A single browser process with one page
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    // Field order matters: the browser must be gone before the profile
    // directory is removed.
    _handler: HandlerTask,
    _profile: TempDir,
}

#[derive(Deserialize)]
struct TextProbe {
    found: bool,
    text: String,
}

/// Evaluate an expression and deserialize its by-value result
async fn eval<T: DeserializeOwned>(page: &Page, expression: String) -> Result<T> {
    let params = EvaluateParams::builder()
        .expression(expression)
        .return_by_value(true)
        .await_promise(true)
        .build()
        .map_err(Error::Internal)?;

    let result = page.evaluate_expression(params).await?;
    Ok(result.into_value()?)
}

fn dialog_kind(kind: &DialogType) -> DialogKind {
    match kind {
        DialogType::Alert => DialogKind::Alert,
        DialogType::Confirm => DialogKind::Confirm,
        DialogType::Prompt => DialogKind::Prompt,
        _ => DialogKind::BeforeUnload,
    }
}

#[async_trait]
impl Driver for ChromiumSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        tracing::debug!(url, "goto");
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn exists(&mut self, selector: &str) -> Result<bool> {
        eval(&self.page, script::exists(selector)).await
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
        tracing::debug!(selector, "fill");
        let filled: bool = eval(&self.page, script::fill(selector, value)).await?;
        if !filled {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        tracing::debug!(selector, "click");
        let element = self.page.find_element(selector).await.map_err(|e| {
            tracing::debug!(selector, error = %e, "find_element failed");
            Error::ElementNotFound(selector.to_string())
        })?;
        element.click().await?;
        Ok(())
    }

    async fn text_of(&mut self, selector: &str) -> Result<Option<String>> {
        let probe: TextProbe = eval(&self.page, script::text_of(selector)).await?;
        Ok(probe.found.then_some(probe.text))
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool> {
        eval(&self.page, script::is_visible(selector)).await
    }

    async fn text_visible(&mut self, text: &str) -> Result<bool> {
        eval(&self.page, script::text_visible(text)).await
    }

    async fn arm_dialog(&mut self) -> Result<DialogWatch> {
        let mut events = self
            .page
            .event_listener::<EventJavascriptDialogOpening>()
            .await?;
        let page = self.page.clone();
        let (tx, rx) = oneshot::channel();

        let listener = tokio::spawn(async move {
            if let Some(event) = events.next().await {
                let dialog = Dialog {
                    kind: dialog_kind(&event.r#type),
                    message: event.message.clone(),
                };
                tracing::debug!(kind = %dialog.kind, message = %dialog.message, "Dialog opened");

                // The page stays blocked until the dialog is answered
                if let Err(e) = page.execute(HandleJavaScriptDialogParams::new(true)).await {
                    tracing::warn!(error = %e, "Failed to dismiss dialog");
                }
                let _ = tx.send(dialog);
            }
        });

        Ok(DialogWatch::spawned(rx, listener))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            mut browser,
            page: _,
            _handler,
            _profile,
        } = *self;

        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "Waiting for browser exit failed");
        }
        drop(_handler);
        drop(_profile);

        closed.map(|_| ()).map_err(Error::from)
    }
}
