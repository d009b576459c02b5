//! The chat controller: one owner for the session, the transcript and the menu.
//!
//! Every user action is one method here. `login` and `ask` hold `&mut self`
//! across their request, so a form cannot be submitted twice at once. Callers
//! that want overlapping questions use the split form
//! [`ChatApp::begin_ask`] / [`PendingQuery::dispatch`] / [`ChatApp::complete_ask`];
//! completions are then appended in whatever order they arrive.

use crate::api::{AnswerSource, QueryAnswer, SourceKind, WorkerClient};
use crate::config::AppConfig;
use crate::error::{ClientError, NETWORK_ERROR};
use crate::logger::{Logger, SessionMetrics};
use crate::menu::{MenuCategory, MenuItem, MenuPanel};
use crate::session::{Session, SessionStore, DEFAULT_ROLE};
use crate::transcript::{ChatMessage, Role, Transcript};
use crate::utils::escape_html;

pub const LOGIN_REQUIRED: &str = "Please log in first to ask a question.";
const MISSING_FIELDS: &str = "Please enter username, password, and campus.";
const HANDBOOK_NEEDS_CAMPUS: &str = "Select a campus before opening the Parent Handbook.";
const DEFAULT_LINK_LABEL: &str = "Open full document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Chat,
}

/// Values that pre-fill the login form.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub campus: Option<String>,
}

/// A question that has been echoed and is waiting for its HTTP round trip.
#[derive(Debug, Clone)]
pub struct PendingQuery {
    id: u64,
    question: String,
    campus: Option<String>,
    token: Option<String>,
}

#[derive(Debug)]
pub struct QueryOutcome {
    id: u64,
    campus: Option<String>,
    result: Result<QueryAnswer, ClientError>,
}

impl PendingQuery {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Send the question. Does not touch the controller, so several pending
    /// queries may be awaited together.
    pub async fn dispatch(self, client: &WorkerClient) -> QueryOutcome {
        let result = client
            .query(&self.question, self.campus.as_deref(), self.token.as_deref())
            .await;
        QueryOutcome {
            id: self.id,
            campus: self.campus,
            result,
        }
    }
}

impl QueryOutcome {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn result(&self) -> &Result<QueryAnswer, ClientError> {
        &self.result
    }
}

pub struct ChatApp {
    config: AppConfig,
    client: WorkerClient,
    store: SessionStore,
    logger: Logger,
    metrics: SessionMetrics,
    session: Option<Session>,
    transcript: Transcript,
    menu: MenuPanel,
    view: View,
    login_form: LoginForm,
    login_error: Option<String>,
    next_request_id: u64,
}

impl ChatApp {
    pub fn new(config: AppConfig) -> Self {
        let client = WorkerClient::from_config(&config);
        let store = SessionStore::from_config(&config);
        Self {
            config,
            client,
            store,
            logger: Logger::disabled(),
            metrics: SessionMetrics::new(),
            session: None,
            transcript: Transcript::default(),
            menu: MenuPanel::default(),
            view: View::Login,
            login_form: LoginForm::default(),
            login_error: None,
            next_request_id: 0,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> &WorkerClient {
        &self.client
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_authenticated)
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    pub fn is_typing(&self) -> bool {
        self.transcript.is_typing()
    }

    pub fn login_form(&self) -> &LoginForm {
        &self.login_form
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn open_menu(&self) -> Option<MenuCategory> {
        self.menu.open_category()
    }

    /// Campus of the session, or the one remembered for the login form.
    pub fn current_campus(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|s| s.campus.as_str())
            .or(self.login_form.campus.as_deref())
    }

    // ── Session ─────────────────────────────────────────────────────────

    /// Authenticate against the worker. On success the transcript is rebuilt
    /// around a greeting and the chat view is shown; on failure the message is
    /// kept for the login view and the current state is left alone.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        campus: &str,
    ) -> Result<Session, ClientError> {
        self.login_error = None;
        self.login_form.username = username.trim().to_string();
        if let Some(code) = self.config.resolve_campus(campus) {
            self.login_form.campus = Some(code);
        }

        match self.request_session(username, password, campus).await {
            Ok(session) => {
                self.metrics.logins += 1;
                let _ = self.logger.log_login_result(&session.username, "OK");
                if let Err(e) = self.store.save(&session) {
                    let _ = self.logger.log_error(&format!("Failed to persist session: {e:#}"));
                }
                self.enter_chat(session.clone());
                Ok(session)
            }
            Err(err) => {
                self.metrics.failed_logins += 1;
                if matches!(err, ClientError::Transport(_)) {
                    self.metrics.network_errors += 1;
                }
                let _ = self.logger.log_login_result(username.trim(), &format!("FAILED ({err})"));
                self.login_error = Some(err.user_message().to_string());
                Err(err)
            }
        }
    }

    async fn request_session(
        &self,
        username: &str,
        password: &str,
        campus: &str,
    ) -> Result<Session, ClientError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() || campus.trim().is_empty() {
            return Err(ClientError::Validation(MISSING_FIELDS.to_string()));
        }
        let campus = self
            .config
            .resolve_campus(campus)
            .ok_or_else(|| ClientError::Validation(format!("Unknown campus: {}", campus.trim())))?;

        let _ = self.logger.log_login(username, &campus);
        let grant = self.client.login(username, password, &campus).await?;

        Ok(Session {
            token: Some(grant.token),
            username: grant.username.unwrap_or_else(|| username.to_string()),
            campus: grant
                .campus
                .and_then(|c| self.config.resolve_campus(&c))
                .unwrap_or(campus),
            role: grant.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        })
    }

    fn enter_chat(&mut self, session: Session) {
        self.transcript.clear();
        self.transcript.push(Role::Assistant, greeting(&session.campus));
        self.menu.close();
        self.login_form = LoginForm {
            username: session.username.clone(),
            campus: Some(session.campus.clone()),
        };
        self.session = Some(session);
        self.view = View::Chat;
    }

    /// Forget the session everywhere and return to an empty login view.
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = self.logger.log(&format!("LOGOUT: user={}", session.username));
        }
        if let Err(e) = self.store.clear() {
            let _ = self.logger.log_error(&format!("Failed to clear stored session: {e:#}"));
        }
        self.transcript.clear();
        self.menu.close();
        self.login_form = LoginForm::default();
        self.login_error = None;
        self.view = View::Login;
    }

    /// Reinstate the stored session at startup. An entry without a token only
    /// pre-fills the login form.
    pub fn restore_session(&mut self) -> Option<&Session> {
        let stored = self.store.load(&self.config)?;
        if stored.is_authenticated() {
            let _ = self.logger.log(&format!("RESTORED: user={}", stored.username));
            self.enter_chat(stored);
            self.session.as_ref()
        } else {
            self.login_form = LoginForm {
                username: stored.username,
                campus: Some(stored.campus),
            };
            None
        }
    }

    // ── Menu ────────────────────────────────────────────────────────────

    pub fn open_category(&mut self, category: MenuCategory) -> Option<&'static [MenuItem]> {
        self.menu.toggle(category)
    }

    pub fn close_menu(&mut self) {
        self.menu.close();
    }

    pub fn is_item_enabled(&self, category: MenuCategory) -> bool {
        MenuPanel::is_enabled(category, self.current_campus())
    }

    pub fn canned_question(
        &self,
        category: MenuCategory,
        item: &MenuItem,
    ) -> Result<String, ClientError> {
        category
            .canned_question(item, self.current_campus())
            .ok_or_else(|| ClientError::Validation(HANDBOOK_NEEDS_CAMPUS.to_string()))
    }

    /// Close the panel and ask the item's canned question. A disabled item
    /// returns an error and changes nothing.
    pub async fn select_item(
        &mut self,
        category: MenuCategory,
        item: &MenuItem,
    ) -> Result<String, ClientError> {
        let question = self.canned_question(category, item)?;
        self.menu.close();
        self.ask(&question).await;
        Ok(question)
    }

    // ── Chat ────────────────────────────────────────────────────────────

    /// Ask a question and append the reply. Failures end up in the transcript.
    pub async fn ask(&mut self, question: &str) {
        if let Some(pending) = self.begin_ask(question) {
            let outcome = pending.dispatch(&self.client).await;
            self.complete_ask(outcome);
        }
    }

    /// Validate and echo a question. Returns `None` when nothing should be sent:
    /// blank input (transcript untouched) or no session (login hint appended).
    pub fn begin_ask(&mut self, question: &str) -> Option<PendingQuery> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        let (token, campus) = match self.session.as_ref().filter(|s| s.is_authenticated()) {
            Some(s) => (s.token.clone(), s.campus.clone()),
            None => {
                self.transcript.push(Role::Assistant, LOGIN_REQUIRED);
                return None;
            }
        };

        self.next_request_id += 1;
        let id = self.next_request_id;
        self.transcript.push(Role::User, escape_html(question));
        self.transcript.show_typing(id);
        self.metrics.total_queries += 1;
        let _ = self.logger.log_query(id, question);

        Some(PendingQuery {
            id,
            question: question.to_string(),
            campus: Some(campus),
            token,
        })
    }

    /// Clear the query's typing indicator and append its reply or error.
    pub fn complete_ask(&mut self, outcome: QueryOutcome) {
        self.transcript.remove_typing(outcome.id);
        match outcome.result {
            Ok(answer) => {
                self.metrics.answered += 1;
                let _ = self.logger.log_answer(outcome.id, &answer.answer);
                let markup = render_answer(&answer, outcome.campus.as_deref());
                self.transcript.push(Role::Assistant, markup);
            }
            Err(err) => {
                match err {
                    ClientError::Transport(_) => self.metrics.network_errors += 1,
                    _ => self.metrics.api_errors += 1,
                }
                let _ = self.logger.log_error(&format!("query #{}: {}", outcome.id, err));
                self.transcript.push(Role::Assistant, render_error(&err));
            }
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────────

fn greeting(campus: &str) -> String {
    format!(
        "Hi 👋 Ask about any CMS policy or protocol.<br>\
         <span class=\"muted\">Tip: Parent Handbook answers will be campus-specific ({}).</span>",
        escape_html(campus)
    )
}

fn display_title(source: &AnswerSource, session_campus: Option<&str>) -> Option<String> {
    let title = source.title.as_deref();
    let prefix = match source.kind {
        Some(SourceKind::Policy) => "Policy".to_string(),
        Some(SourceKind::Protocol) => "Protocol".to_string(),
        Some(SourceKind::Handbook) => match source.campus.as_deref().or(session_campus) {
            Some(campus) => format!("Parent Handbook ({campus})"),
            None => "Parent Handbook".to_string(),
        },
        None => return title.map(str::to_string),
    };
    Some(match title {
        Some(t) => format!("{prefix}: {t}"),
        None => prefix,
    })
}

fn is_web_link(link: &str) -> bool {
    let lower = link.trim_start().to_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

/// Build the assistant bubble for an answer. Only the wrapper tags are trusted;
/// title, answer and link are escaped. Links that are not http(s) are shown as
/// text rather than made clickable.
pub fn render_answer(answer: &QueryAnswer, session_campus: Option<&str>) -> String {
    let source = answer.source.as_ref();
    let mut html = String::new();

    if let Some(title) = source.and_then(|s| display_title(s, session_campus)) {
        html.push_str(&format!("<div class=\"title\"><b>{}</b></div>", escape_html(&title)));
    }
    html.push_str(&format!("<div class=\"answer\">{}</div>", escape_html(&answer.answer)));

    if let Some(source) = source {
        if let Some(link) = source.link.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            let label = source.kind.map_or(DEFAULT_LINK_LABEL, SourceKind::link_label);
            if is_web_link(link) {
                html.push_str(&format!(
                    "<hr><div class=\"link-wrap\"><a class=\"doc-link\" href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></div>",
                    escape_html(link),
                    label
                ));
            } else {
                html.push_str(&format!(
                    "<hr><div class=\"link-wrap\">{}: <code>{}</code></div>",
                    label,
                    escape_html(link)
                ));
            }
        }
    }
    html
}

pub fn render_error(err: &ClientError) -> String {
    match err {
        ClientError::Transport(_) => NETWORK_ERROR.to_string(),
        ClientError::Parse(_) => escape_html(err.user_message()),
        _ => format!("<b>Error:</b> {}", escape_html(err.user_message())),
    }
}
