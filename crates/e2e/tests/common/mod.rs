//! In-memory stand-in for the Ghost admin members UI
//!
//! `FakeGhost` holds the backend (the member list) shared by every session
//! it opens. `FakeSession` answers the selectors in `members::selectors`
//! the way the real admin renders them.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use ghost_e2e::config::SuiteConfig;
use ghost_e2e::members::selectors as sel;
use ghost_e2e::members::Credentials;
use ghost_e2e::runner::RunnerConfig;
use ghost_e2e::session::{Download, Session, SessionFactory};
use ghost_e2e::wait::WaitPolicy;
use ghost_e2e::{E2eError, E2eResult, Locator, MemberRecord, WorkflowRunner};

pub const BASE_URL: &str = "http://ghost.test";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMember {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub note: String,
    pub labels: Vec<String>,
    pub subscribed: bool,
}

#[derive(Debug)]
pub struct Backend {
    pub members: Vec<FakeMember>,
    next_id: u64,
    hidden: HashSet<String>,
    list_render_delay: usize,
    export_label_lag: usize,
    export_filename: String,
    login: Option<Credentials>,
    pub actions: Vec<String>,
    pub sessions_opened: usize,
    pub sessions_closed: usize,
}

#[derive(Clone)]
pub struct FakeGhost {
    inner: Arc<Mutex<Backend>>,
}

impl FakeGhost {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Backend {
                members: Vec::new(),
                next_id: 1,
                hidden: HashSet::new(),
                list_render_delay: 0,
                export_label_lag: 0,
                export_filename: "members.2024-01-01.csv".to_string(),
                login: None,
                actions: Vec::new(),
                sessions_opened: 0,
                sessions_closed: 0,
            })),
        }
    }

    fn backend(&self) -> MutexGuard<'_, Backend> {
        self.inner.lock().unwrap()
    }

    /// Add a member directly to the backend, bypassing the UI
    pub fn insert(&self, record: &MemberRecord, subscribed: bool) {
        let mut backend = self.backend();
        let id = backend.next_id;
        backend.next_id += 1;
        backend.members.push(FakeMember {
            id,
            name: record.name.clone(),
            email: record.email.clone(),
            note: record.note.clone(),
            labels: vec![record.label.clone()],
            subscribed,
        });
    }

    /// Make a selector never render
    pub fn hide(&self, selector: &str) {
        self.backend().hidden.insert(selector.to_string());
    }

    /// Number of row counts answered with 0 after each list navigation
    pub fn set_list_render_delay(&self, polls: usize) {
        self.backend().list_render_delay = polls;
    }

    /// Number of export label reads that still show the unfiltered label after a filter applies
    pub fn set_export_label_lag(&self, reads: usize) {
        self.backend().export_label_lag = reads;
    }

    pub fn set_export_filename(&self, filename: &str) {
        self.backend().export_filename = filename.to_string();
    }

    pub fn require_login(&self, credentials: Credentials) {
        self.backend().login = Some(credentials);
    }

    pub fn members(&self) -> Vec<FakeMember> {
        self.backend().members.clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.backend().actions.clone()
    }

    pub fn sessions(&self) -> (usize, usize) {
        let backend = self.backend();
        (backend.sessions_opened, backend.sessions_closed)
    }

    pub fn session(&self) -> FakeSession {
        self.backend().sessions_opened += 1;
        FakeSession {
            backend: self.inner.clone(),
            page: Page::Blank,
            authenticated: false,
            downloads: VecDeque::new(),
            closed: false,
        }
    }

    pub fn factory(&self) -> FakeFactory {
        FakeFactory { ghost: self.clone() }
    }
}

pub struct FakeFactory {
    ghost: FakeGhost,
}

#[async_trait]
impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    async fn open(&self) -> E2eResult<FakeSession> {
        Ok(self.ghost.session())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    None,
    Field,
    Labels,
}

#[derive(Debug, Clone, Default)]
struct ListState {
    menu_open: bool,
    filter_menu_open: bool,
    pending_filter: Option<String>,
    filter: Option<String>,
    render_polls_left: usize,
    stale_label_reads: usize,
}

#[derive(Debug, Clone)]
struct FormState {
    id: Option<u64>,
    draft: FakeMember,
    saved: bool,
    focus: Focus,
    pending_label: String,
    actions_open: bool,
    impersonating: bool,
    link_copied: bool,
    confirm_open: bool,
}

impl FormState {
    fn for_member(member: Option<&FakeMember>) -> Self {
        let draft = member.cloned().unwrap_or(FakeMember {
            id: 0,
            name: String::new(),
            email: String::new(),
            note: String::new(),
            labels: Vec::new(),
            subscribed: true,
        });
        Self {
            id: member.map(|m| m.id),
            draft,
            saved: false,
            focus: Focus::None,
            pending_label: String::new(),
            actions_open: false,
            impersonating: false,
            link_copied: false,
            confirm_open: false,
        }
    }
}

#[derive(Debug, Clone)]
enum Page {
    Blank,
    SignIn { email: String, password: String },
    Dashboard,
    List(ListState),
    Member(FormState),
    Portal { member_id: u64, popup: bool },
}

pub struct FakeSession {
    backend: Arc<Mutex<Backend>>,
    page: Page,
    authenticated: bool,
    downloads: VecDeque<Download>,
    closed: bool,
}

fn role(name: &str) -> String {
    Locator::role_button(name).selector
}

/// Members as the list shows them: newest first, filtered
fn visible<'a>(members: &'a [FakeMember], filter: Option<&str>) -> Vec<&'a FakeMember> {
    members
        .iter()
        .rev()
        .filter(|m| match filter {
            None => true,
            Some("subscribed") => m.subscribed,
            Some("unsubscribed") => !m.subscribed,
            Some(_) => false,
        })
        .collect()
}

fn not_found(target: &Locator) -> E2eError {
    E2eError::Driver(format!("element not found: {}", target))
}

impl FakeSession {
    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }

    fn record(&self, action: String) {
        self.lock().actions.push(action);
    }

    fn matches(&self, target: &Locator) -> usize {
        let backend = self.lock();
        let selector = target.selector.as_str();
        if backend.hidden.contains(selector) {
            return 0;
        }

        match (&self.page, target.frame.as_deref()) {
            (Page::Blank, _) => 0,
            (Page::Portal { .. }, Some(sel::PORTAL_TRIGGER_FRAME)) if selector == "div" => 2,
            (Page::Portal { popup: true, .. }, Some(sel::PORTAL_POPUP_FRAME))
                if selector == sel::PORTAL_HEADING =>
            {
                1
            }
            (_, Some(_)) => 0,
            (Page::Portal { .. }, None) => usize::from(selector == sel::BODY),
            (Page::SignIn { .. }, None) => match selector {
                sel::BODY
                | sel::SIGNIN_IDENTIFICATION
                | sel::SIGNIN_PASSWORD
                | sel::SIGNIN_SUBMIT => 1,
                _ => 0,
            },
            (page, None) => admin_matches(page, selector, &backend),
        }
    }

    fn require(&self, target: &Locator) -> E2eResult<()> {
        if self.matches(target) > target.nth.unwrap_or(0) {
            Ok(())
        } else {
            Err(not_found(target))
        }
    }

    fn fresh_list(&self) -> Page {
        Page::List(ListState {
            render_polls_left: self.lock().list_render_delay,
            ..Default::default()
        })
    }
}

fn admin_matches(page: &Page, selector: &str, backend: &Backend) -> usize {
    if matches!(selector, sel::BODY | sel::ADMIN_NAV | sel::NAV_MEMBERS) {
        return 1;
    }

    match page {
        Page::List(list) => {
            let rows = visible(&backend.members, list.filter.as_deref()).len();
            match selector {
                sel::NEW_MEMBER_LINK | sel::NEW_MEMBER | sel::LIST_ACTIONS => 1,
                sel::ROWS | sel::ROW_LINK | sel::ROW_NAME | sel::ROW_EMAIL => {
                    if list.render_polls_left > 0 {
                        0
                    } else {
                        rows
                    }
                }
                sel::EMPTY_STATE => usize::from(backend.members.is_empty()),
                sel::EXPORT | sel::EXPORT_LABEL | sel::FILTER_ACTIONS => {
                    usize::from(list.menu_open)
                }
                sel::FILTER_SELECT | sel::APPLY_FILTER => usize::from(list.filter_menu_open),
                _ => 0,
            }
        }
        Page::Member(form) => match selector {
            sel::NAME_INPUT
            | sel::EMAIL_INPUT
            | sel::NOTE_INPUT
            | sel::LABELS_PICKER
            | sel::SUBSCRIBED_TOGGLE
            | sel::SAVE => 1,
            sel::SAVED => usize::from(form.saved),
            sel::MEMBER_ACTIONS => usize::from(form.id.is_some()),
            sel::LINK_COPIED => usize::from(form.link_copied),
            sel::SIGNIN_URL_INPUT => usize::from(form.impersonating),
            sel::CONFIRM_DELETE => usize::from(form.confirm_open),
            s if s == role(sel::IMPERSONATE) || s == role(sel::DELETE_MEMBER) => {
                usize::from(form.actions_open)
            }
            s if s == role(sel::COPY_LINK) => usize::from(form.impersonating),
            _ => 0,
        },
        _ => 0,
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.record(format!("goto:{}", url));

        let path = url.strip_prefix(BASE_URL).ok_or_else(|| E2eError::NavigationFailure {
            url: url.to_string(),
            reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        })?;

        if path == "/ghost" || path == "/ghost/" {
            let login_required = self.lock().login.is_some();
            self.page = if login_required && !self.authenticated {
                Page::SignIn {
                    email: String::new(),
                    password: String::new(),
                }
            } else {
                Page::Dashboard
            };
            return Ok(());
        }

        if let Some(id) = path.strip_prefix("/members/?token=impersonate-") {
            let id: u64 = id.parse().map_err(|_| E2eError::NavigationFailure {
                url: url.to_string(),
                reason: "invalid token".to_string(),
            })?;
            if self.lock().members.iter().any(|m| m.id == id) {
                self.page = Page::Portal {
                    member_id: id,
                    popup: false,
                };
                return Ok(());
            }
        }

        Err(E2eError::NavigationFailure {
            url: url.to_string(),
            reason: "404 Not Found".to_string(),
        })
    }

    async fn click(&mut self, target: &Locator) -> E2eResult<()> {
        self.record(format!("click:{}", target));
        self.require(target)?;
        let selector = target.selector.as_str();

        if target.frame.as_deref() == Some(sel::PORTAL_TRIGGER_FRAME) {
            if let Page::Portal { popup, .. } = &mut self.page {
                *popup = true;
            }
            return Ok(());
        }

        if selector == sel::NAV_MEMBERS {
            self.page = self.fresh_list();
            return Ok(());
        }

        let mut backend = self.backend.lock().unwrap();
        let mut next_page = None;

        match &mut self.page {
            Page::SignIn { email, password } if selector == sel::SIGNIN_SUBMIT => {
                let accepted = backend
                    .login
                    .as_ref()
                    .map(|c| &c.email == email && &c.password == password)
                    .unwrap_or(true);
                if accepted {
                    self.authenticated = true;
                    next_page = Some(Page::Dashboard);
                }
            }
            Page::List(list) => match selector {
                sel::NEW_MEMBER => next_page = Some(Page::Member(FormState::for_member(None))),
                sel::ROW_LINK => {
                    let rows = visible(&backend.members, list.filter.as_deref());
                    let member = rows.get(target.nth.unwrap_or(0)).copied();
                    next_page = Some(Page::Member(FormState::for_member(member)));
                }
                sel::LIST_ACTIONS => {
                    list.menu_open = !list.menu_open;
                    list.filter_menu_open = false;
                }
                sel::FILTER_ACTIONS => list.filter_menu_open = true,
                sel::APPLY_FILTER => {
                    list.filter = list.pending_filter.clone();
                    list.stale_label_reads = backend.export_label_lag;
                    list.menu_open = false;
                    list.filter_menu_open = false;
                }
                sel::EXPORT => {
                    self.downloads.push_back(Download {
                        suggested_filename: backend.export_filename.clone(),
                    });
                    list.menu_open = false;
                }
                _ => {}
            },
            Page::Member(form) => match selector {
                sel::LABELS_PICKER => form.focus = Focus::Labels,
                sel::BODY => form.focus = Focus::None,
                sel::SUBSCRIBED_TOGGLE => {
                    form.draft.subscribed = !form.draft.subscribed;
                    form.saved = false;
                }
                sel::SAVE => {
                    match form.id {
                        Some(id) => {
                            if let Some(m) = backend.members.iter_mut().find(|m| m.id == id) {
                                *m = FakeMember {
                                    id,
                                    ..form.draft.clone()
                                };
                            }
                        }
                        None => {
                            let id = backend.next_id;
                            backend.next_id += 1;
                            backend.members.push(FakeMember {
                                id,
                                ..form.draft.clone()
                            });
                            form.id = Some(id);
                        }
                    }
                    form.saved = true;
                }
                sel::MEMBER_ACTIONS => form.actions_open = true,
                sel::CONFIRM_DELETE => {
                    if let Some(id) = form.id {
                        backend.members.retain(|m| m.id != id);
                    }
                    next_page = Some(Page::List(ListState::default()));
                }
                s if s == role(sel::IMPERSONATE) => {
                    form.actions_open = false;
                    form.impersonating = true;
                }
                s if s == role(sel::COPY_LINK) => form.link_copied = true,
                s if s == role(sel::DELETE_MEMBER) => {
                    form.actions_open = false;
                    form.confirm_open = true;
                }
                _ => {}
            },
            _ => {}
        }

        drop(backend);
        if let Some(page) = next_page {
            self.page = page;
        }
        Ok(())
    }

    async fn fill(&mut self, target: &Locator, value: &str) -> E2eResult<()> {
        self.record(format!("fill:{}={}", target, value));
        self.require(target)?;

        match &mut self.page {
            Page::SignIn { email, password } => match target.selector.as_str() {
                sel::SIGNIN_IDENTIFICATION => *email = value.to_string(),
                sel::SIGNIN_PASSWORD => *password = value.to_string(),
                _ => {}
            },
            Page::Member(form) => {
                match target.selector.as_str() {
                    sel::NAME_INPUT => form.draft.name = value.to_string(),
                    sel::EMAIL_INPUT => form.draft.email = value.to_string(),
                    sel::NOTE_INPUT => form.draft.note = value.to_string(),
                    _ => return Err(not_found(target)),
                }
                form.focus = Focus::Field;
                form.saved = false;
            }
            _ => return Err(not_found(target)),
        }
        Ok(())
    }

    async fn press_key(&mut self, key: &str) -> E2eResult<()> {
        self.record(format!("press:{}", key));
        if let Page::Member(form) = &mut self.page {
            if form.focus == Focus::Labels {
                match key {
                    "Tab" if !form.pending_label.is_empty() => {
                        let label = std::mem::take(&mut form.pending_label);
                        form.draft.labels.push(label);
                        form.focus = Focus::None;
                        form.saved = false;
                    }
                    "Backspace" if form.pending_label.is_empty() => {
                        form.draft.labels.pop();
                        form.saved = false;
                    }
                    "Backspace" => {
                        form.pending_label.pop();
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    async fn type_text(&mut self, text: &str) -> E2eResult<()> {
        self.record(format!("type:{}", text));
        if let Page::Member(form) = &mut self.page {
            if form.focus == Focus::Labels {
                form.pending_label.push_str(text);
            }
        }
        Ok(())
    }

    async fn select_option(&mut self, target: &Locator, value: &str) -> E2eResult<()> {
        self.record(format!("select:{}={}", target, value));
        self.require(target)?;
        if let Page::List(list) = &mut self.page {
            list.pending_filter = Some(value.to_string());
        }
        Ok(())
    }

    async fn count(&mut self, target: &Locator) -> E2eResult<usize> {
        if let Page::List(list) = &mut self.page {
            let is_row = matches!(
                target.selector.as_str(),
                sel::ROWS | sel::ROW_LINK | sel::ROW_NAME | sel::ROW_EMAIL
            );
            if is_row && list.render_polls_left > 0 {
                list.render_polls_left -= 1;
                return Ok(0);
            }
        }
        Ok(self.matches(target))
    }

    async fn inner_text(&mut self, target: &Locator) -> E2eResult<String> {
        self.require(target)?;
        if let Page::List(list) = &mut self.page {
            if target.selector == sel::EXPORT_LABEL && list.stale_label_reads > 0 {
                list.stale_label_reads -= 1;
                return Ok("Export all members".to_string());
            }
        }
        let backend = self.lock();
        let index = target.nth.unwrap_or(0);

        let text = match (&self.page, target.selector.as_str()) {
            (Page::List(list), sel::ROW_NAME) => visible(&backend.members, list.filter.as_deref())
                .get(index)
                .map(|m| m.name.clone()),
            (Page::List(list), sel::ROW_EMAIL) => visible(&backend.members, list.filter.as_deref())
                .get(index)
                .map(|m| m.email.clone()),
            (Page::List(list), sel::EXPORT_LABEL) => Some(match &list.filter {
                Some(filter) => format!(
                    "Export selected members ({})",
                    visible(&backend.members, Some(filter)).len()
                ),
                None => "Export all members".to_string(),
            }),
            (Page::Portal { popup: true, .. }, sel::PORTAL_HEADING) => {
                Some(format!("  {}\n", ghost_e2e::members::PORTAL_SIGNED_IN_HEADING))
            }
            _ => None,
        };

        text.ok_or_else(|| not_found(target))
    }

    async fn input_value(&mut self, target: &Locator) -> E2eResult<String> {
        self.require(target)?;
        match &self.page {
            Page::Member(form) if target.selector == sel::SIGNIN_URL_INPUT => match form.id {
                Some(id) => Ok(format!("{}/members/?token=impersonate-{}", BASE_URL, id)),
                None => Err(not_found(target)),
            },
            _ => Err(not_found(target)),
        }
    }

    async fn take_download(&mut self) -> E2eResult<Option<Download>> {
        Ok(self.downloads.pop_front())
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        Ok(match &self.page {
            Page::Blank => "about:blank".to_string(),
            Page::SignIn { .. } => format!("{}/ghost/#/signin", BASE_URL),
            Page::Dashboard => format!("{}/ghost/#/dashboard", BASE_URL),
            Page::List(_) => format!("{}/ghost/#/members", BASE_URL),
            Page::Member(form) => match form.id {
                Some(id) => format!("{}/ghost/#/members/{}", BASE_URL, id),
                None => format!("{}/ghost/#/members/new", BASE_URL),
            },
            Page::Portal { .. } => format!("{}/#/portal/account", BASE_URL),
        })
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let url = self.current_url().await?;
        std::fs::write(path, format!("fake-png {}", url))?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        if !self.closed {
            self.closed = true;
            self.lock().sessions_closed += 1;
        }
        Ok(())
    }
}

/// Short budgets so timeouts in tests resolve quickly
pub fn fast_runner_config() -> RunnerConfig {
    RunnerConfig {
        base_url: BASE_URL.to_string(),
        step: WaitPolicy {
            timeout_ms: 200,
            poll_interval_ms: 5,
        },
        download: WaitPolicy {
            timeout_ms: 200,
            poll_interval_ms: 5,
        },
    }
}

pub fn fast_runner() -> WorkflowRunner {
    WorkflowRunner::new(fast_runner_config())
}

pub fn suite_config(output_dir: &Path) -> SuiteConfig {
    let mut config = SuiteConfig::default();
    config.app.base_url = BASE_URL.to_string();
    config.runner = fast_runner_config();
    config.output_dir = output_dir.to_path_buf();
    config
}
