//! In-memory stand-in for the Library Catalog application
//!
//! Serves the same routes and DOM contract as the real app, keeps accounts
//! across sessions, and raises the same registration alerts. An alert that
//! nobody intercepts blocks the triggering click forever, like a real page.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_e2e::browser::{Dialog, DialogKind, DialogWatch, Driver, Launcher};
use catalog_e2e::{Error, Result};
use tokio::sync::oneshot;

pub const BASE_URL: &str = "http://localhost:3000";

const HEADER_LINK: &str = "#site-header > nav > section > a";
const GUEST_LOGIN: &str = "#guest > a:nth-child(1)";
const GUEST_REGISTER: &str = "#guest > a:nth-child(2)";
const LOGIN_SUBMIT: &str = "#login-form > fieldset > input";
const SUBMIT: &str = "input[type=\"submit\"]";

/// Deliberate defects, to check how failures are reported
#[derive(Debug, Default, Clone, Copy)]
pub struct Bugs {
    /// A successful login lands on `/` instead of `/catalog`
    pub login_lands_on_home: bool,
    /// Registration skips the password confirmation check
    pub accepts_mismatched_passwords: bool,
    /// A rejected registration alerts, then moves to `/catalog` shortly after
    pub redirects_after_rejection: bool,
}

pub struct CatalogApp {
    accounts: Mutex<HashMap<String, String>>,
    bugs: Bugs,
}

impl CatalogApp {
    pub fn new(bugs: Bugs) -> Arc<Self> {
        let mut accounts = HashMap::new();
        accounts.insert("peter@abv.bg".to_string(), "123456".to_string());
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            bugs,
        })
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
}

pub struct FakeLauncher {
    app: Arc<CatalogApp>,
    pub counters: Arc<Counters>,
    failing_launches: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(app: Arc<CatalogApp>) -> Self {
        Self {
            app,
            counters: Arc::new(Counters::default()),
            failing_launches: AtomicUsize::new(0),
        }
    }

    /// The next `n` launches fail
    pub fn failing_first(self, n: usize) -> Self {
        self.failing_launches.store(n, Ordering::SeqCst);
        self
    }

    pub fn launched(&self) -> usize {
        self.counters.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn Driver>> {
        let failing = self
            .failing_launches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(Error::BrowserLaunch("simulated crash".to_string()));
        }

        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Session {
            app: self.app.clone(),
            counters: self.counters.clone(),
            page: Page::Blank,
            url: "about:blank".to_string(),
            user: None,
            fields: HashMap::new(),
            armed: None,
            late_redirect: false,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Blank,
    Home,
    Login,
    Register,
    Catalog,
    NotFound,
}

struct Session {
    app: Arc<CatalogApp>,
    counters: Arc<Counters>,
    page: Page,
    url: String,
    user: Option<String>,
    fields: HashMap<&'static str, String>,
    armed: Option<oneshot::Sender<Dialog>>,
    /// Navigate to the catalog once the current URL has been read
    late_redirect: bool,
}

impl Session {
    fn open(&mut self, page: Page, path: &str) {
        self.page = page;
        self.url = format!("{}{}", BASE_URL, path);
        self.fields.clear();
    }

    /// Selector → rendered text for everything on the current page
    fn elements(&self) -> Vec<(&'static str, String)> {
        let mut els = Vec::new();
        if matches!(self.page, Page::Blank | Page::NotFound) {
            return els;
        }

        els.push(("nav.navbar", String::new()));
        els.push((HEADER_LINK, "All Books".to_string()));
        match &self.user {
            None => {
                els.push(("#guest", "Login Register".to_string()));
                els.push((GUEST_LOGIN, "Login".to_string()));
                els.push((GUEST_REGISTER, "Register".to_string()));
            }
            Some(email) => {
                els.push(("#user", format!("Welcome, {}", email)));
                els.push(("#logoutBtn", "Logout".to_string()));
            }
        }

        match self.page {
            Page::Login => {
                els.push(("#login-form", "Login Form\nEmail\nPassword".to_string()));
                for sel in ["#email", "input[name=\"email\"]", "#password", "input[name=\"password\"]"] {
                    els.push((sel, String::new()));
                }
                els.push((LOGIN_SUBMIT, String::new()));
                els.push((SUBMIT, String::new()));
            }
            Page::Register => {
                els.push(("#register-form", "Register".to_string()));
                for sel in [
                    "input[name=\"email\"]",
                    "input[name=\"password\"]",
                    "input[name=\"confirm-pass\"]",
                ] {
                    els.push((sel, String::new()));
                }
                els.push((SUBMIT, String::new()));
            }
            Page::Catalog => els.push(("#dashboard-page", "Books".to_string())),
            _ => {}
        }
        els
    }

    fn has(&self, selector: &str) -> bool {
        self.elements().iter().any(|(s, _)| *s == selector)
    }

    fn field(selector: &str) -> Option<&'static str> {
        match selector {
            "#email" | "input[name=\"email\"]" => Some("email"),
            "#password" | "input[name=\"password\"]" => Some("password"),
            "input[name=\"confirm-pass\"]" => Some("confirm-pass"),
            _ => None,
        }
    }

    fn value(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    async fn alert(&mut self, message: &str) {
        match self.armed.take() {
            Some(tx) => {
                let _ = tx.send(Dialog {
                    kind: DialogKind::Alert,
                    message: message.to_string(),
                });
            }
            None => std::future::pending::<()>().await,
        }
    }

    async fn submit_login(&mut self) {
        let email = self.value("email");
        let password = self.value("password");
        let valid = self.app.accounts.lock().unwrap().get(&email) == Some(&password);
        if !valid {
            self.alert("Invalid email or password").await;
            return;
        }

        self.user = Some(email);
        if self.app.bugs.login_lands_on_home {
            self.open(Page::Home, "/");
        } else {
            self.open(Page::Catalog, "/catalog");
        }
    }

    async fn reject_registration(&mut self, message: &str) {
        self.alert(message).await;
        self.late_redirect = self.app.bugs.redirects_after_rejection;
    }

    async fn submit_registration(&mut self) {
        let email = self.value("email");
        let password = self.value("password");
        let confirm = self.value("confirm-pass");

        if email.is_empty() || password.is_empty() || confirm.is_empty() {
            self.reject_registration("All fields are required!").await;
            return;
        }
        if password != confirm && !self.app.bugs.accepts_mismatched_passwords {
            self.reject_registration("Passwords don't match!").await;
            return;
        }

        let created = {
            let mut accounts = self.app.accounts.lock().unwrap();
            if accounts.contains_key(&email) {
                false
            } else {
                accounts.insert(email.clone(), password);
                true
            }
        };
        if !created {
            self.alert("A user with this email already exists").await;
            return;
        }

        self.user = Some(email);
        self.open(Page::Catalog, "/catalog");
    }
}

#[async_trait]
impl Driver for Session {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let path = url.strip_prefix(BASE_URL).unwrap_or(url);
        let page = match path {
            "" | "/" => Page::Home,
            "/login" => Page::Login,
            "/register" => Page::Register,
            "/catalog" => Page::Catalog,
            _ => Page::NotFound,
        };
        self.open(page, if path.is_empty() { "/" } else { path });
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        let url = self.url.clone();
        if std::mem::take(&mut self.late_redirect) {
            self.open(Page::Catalog, "/catalog");
        }
        Ok(url)
    }

    async fn exists(&mut self, selector: &str) -> Result<bool> {
        Ok(self.has(selector))
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
        if !self.has(selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        let name = Self::field(selector)
            .ok_or_else(|| Error::Browser(format!("'{}' is not an input", selector)))?;
        self.fields.insert(name, value.to_string());
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        if !self.has(selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        match (self.page, selector) {
            (_, HEADER_LINK) => self.open(Page::Catalog, "/catalog"),
            (_, GUEST_LOGIN) => self.open(Page::Login, "/login"),
            (_, GUEST_REGISTER) => self.open(Page::Register, "/register"),
            (_, "#logoutBtn") => {
                self.user = None;
                self.open(Page::Home, "/");
            }
            (Page::Login, LOGIN_SUBMIT | SUBMIT) => self.submit_login().await,
            (Page::Register, SUBMIT) => self.submit_registration().await,
            _ => {}
        }
        Ok(())
    }

    async fn text_of(&mut self, selector: &str) -> Result<Option<String>> {
        Ok(self
            .elements()
            .into_iter()
            .find(|(s, _)| *s == selector)
            .map(|(_, text)| text))
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool> {
        Ok(self.has(selector))
    }

    async fn text_visible(&mut self, text: &str) -> Result<bool> {
        Ok(self.elements().iter().any(|(_, t)| t.contains(text)))
    }

    async fn arm_dialog(&mut self) -> Result<DialogWatch> {
        let (tx, rx) = oneshot::channel();
        self.armed = Some(tx);
        Ok(DialogWatch::from_receiver(rx))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
