//! One curator's console: session, disease browser, QA list and draft, plus
//! the flows that move data between them and the API.
//!
//! Flows take the workspace lock only to read or apply state and release it
//! while a request is in flight. Each request carries a `ScopeTicket`; a
//! result that comes back after its view was replaced is dropped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::types::QaId;
use crate::api::{ApiError, CurationApi};
use crate::auth::{AuthError, DeviceLogin, IdentityProvider, LoginPoll, SessionEvent, SessionState};
use crate::views::diseases::{DiseaseBrowser, DiseaseTab};
use crate::views::form::{DraftError, QaForm, Submission};
use crate::views::qas::{FormMode, QaList};
use crate::views::render;
use crate::views::scope::{ScopeTicket, ViewScope};
use crate::views::Fetch;

/// Query families refetched after mutations.
pub const QAS_FAMILY: &str = "qas";
pub const DISEASE_FAMILIES: [&str; 2] = ["diseaseIds", "diseases"];

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Carries the rendered session status.
    #[error("{0}")]
    NotReady(String),

    #[error("select a disease first with `/disease select`")]
    NoDisease,

    #[error("open the QA entries of a disease first with `/disease qas`")]
    NoQaList,

    #[error("no QA entry is selected")]
    NoQaSelected,

    #[error("no draft is open; start one with `/qa new` or `/qa edit`")]
    NoForm,

    #[error("unknown disease `{0}`")]
    UnknownDisease(String),

    #[error("no delete is awaiting confirmation")]
    NothingToDelete,

    #[error("a dataset refresh is already running")]
    RefreshInFlight,

    #[error("Failure. Please validate form: {0}")]
    Draft(#[from] DraftError),

    #[error("Failure: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub struct Workspace {
    pub session: SessionState,
    /// Scope of login polling and silent token retrieval.
    pub session_scope: ViewScope,
    api: Option<Arc<dyn CurationApi>>,
    api_token: Option<String>,
    pub browser: DiseaseBrowser,
    pub qas: Option<QaList>,
    pub form: Option<QaForm>,
    refreshing: bool,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            session: SessionState::Loading,
            session_scope: ViewScope::default(),
            api: None,
            api_token: None,
            browser: DiseaseBrowser::default(),
            qas: None,
            form: None,
            refreshing: false,
        }
    }

    /// Nothing is persisted between bot runs, so a fresh session resolves to
    /// unauthenticated.
    fn resolve_session(&mut self) {
        if matches!(self.session, SessionState::Loading) {
            let _ = self.session.apply(SessionEvent::Resolved(None));
        }
    }

    /// Client for the current token. Only available in the ready state.
    pub fn api(&self) -> Result<Arc<dyn CurationApi>, WorkspaceError> {
        match &self.api {
            Some(api) if self.session.is_ready() => Ok(api.clone()),
            _ => Err(WorkspaceError::NotReady(render::session(&self.session))),
        }
    }

    /// Install a client built for `token`. Results still in flight on the
    /// old client are dropped; loaded listings and selections are kept.
    fn install_api(&mut self, token: &str, api: Arc<dyn CurationApi>) {
        self.api = Some(api);
        self.api_token = Some(token.to_string());
        self.browser.abandon_requests();
        if let Some(list) = self.qas.as_mut() {
            list.abandon_requests();
        }
        if let Some(form) = self.form.as_mut() {
            form.abandon_requests();
        }
        debug!("api client rebuilt for new token");
    }

    fn needs_api(&self, token: &str) -> bool {
        self.api_token.as_deref() != Some(token) || self.api.is_none()
    }

    fn clear_views(&mut self) {
        self.api = None;
        self.api_token = None;
        self.browser = DiseaseBrowser::default();
        self.qas = None;
        self.form = None;
        self.refreshing = false;
    }

    /// A 401 from the API sends the curator back to login.
    fn note_api_error(&mut self, err: &ApiError) {
        if err.is_unauthorized() {
            warn!("api rejected the access token");
            let _ = self.session.apply(SessionEvent::TokenRejected);
            self.api = None;
            self.api_token = None;
        }
    }

    pub fn qa_list(&self) -> Result<&QaList, WorkspaceError> {
        self.qas.as_ref().ok_or(WorkspaceError::NoQaList)
    }

    pub fn qa_list_mut(&mut self) -> Result<&mut QaList, WorkspaceError> {
        self.qas.as_mut().ok_or(WorkspaceError::NoQaList)
    }

    pub fn form_mut(&mut self) -> Result<&mut QaForm, WorkspaceError> {
        self.form.as_mut().ok_or(WorkspaceError::NoForm)
    }

    /// Select a disease by id and show its info tab.
    pub fn select_disease(&mut self, id: &str) -> Result<(), WorkspaceError> {
        if !self.browser.select_by_id(id) {
            return Err(WorkspaceError::UnknownDisease(id.to_string()));
        }
        self.browser.set_tab(DiseaseTab::Info);
        Ok(())
    }

    /// Select by position in the unfiltered id listing.
    pub fn select_disease_at(&mut self, index: usize) -> Result<String, WorkspaceError> {
        let id = self
            .browser
            .select_by_index(index)
            .map(str::to_string)
            .ok_or_else(|| WorkspaceError::UnknownDisease(format!("#{}", index)))?;
        self.browser.set_tab(DiseaseTab::Info);
        Ok(id)
    }

    /// Switch to the QA tab of the selected disease. Returns true when the
    /// list is new and needs loading.
    pub fn open_qa_tab(&mut self) -> Result<bool, WorkspaceError> {
        let disease_id = self
            .browser
            .selected_disease()
            .map(|d| d.id.clone())
            .or_else(|| self.browser.selected_id().map(str::to_string))
            .ok_or(WorkspaceError::NoDisease)?;
        self.browser.set_tab(DiseaseTab::Qas);

        if self.qas.as_ref().map(QaList::disease_id) == Some(disease_id.as_str()) {
            return Ok(false);
        }
        self.qas = Some(QaList::new(&disease_id));
        self.form = None;
        Ok(true)
    }

    /// Open the draft form. `Edit` pre-fills from the selected entry.
    pub fn open_form(&mut self, mode: FormMode) -> Result<&QaForm, WorkspaceError> {
        let list = self.qas.as_mut().ok_or(WorkspaceError::NoQaList)?;
        let form = match mode {
            FormMode::Add => {
                list.open_add();
                QaForm::create(list.disease_id())
            }
            FormMode::Edit => {
                let disease_id = list.disease_id().to_string();
                let qa = list.open_edit().ok_or(WorkspaceError::NoQaSelected)?;
                QaForm::edit(&disease_id, qa)
            }
            FormMode::Closed => {
                self.close_form();
                return Err(WorkspaceError::NoForm);
            }
        };
        Ok(&*self.form.insert(form))
    }

    pub fn close_form(&mut self) {
        if let Some(list) = self.qas.as_mut() {
            list.close_form();
        }
        self.form = None;
    }

    /// Open the delete confirmation for the selected entry.
    pub fn request_delete(&mut self) -> Result<QaId, WorkspaceError> {
        let list = self.qa_list_mut()?;
        let qa_id = list
            .selected()
            .map(|qa| qa.id.clone())
            .ok_or(WorkspaceError::NoQaSelected)?;
        list.delete_dialog.request(&qa_id);
        Ok(qa_id)
    }
}

/// Builds an API client for an access token.
pub trait Connector: Send + Sync {
    fn connect(&self, token: &str) -> Result<Arc<dyn CurationApi>, ApiError>;
}

impl<F> Connector for F
where
    F: Fn(&str) -> Result<Arc<dyn CurationApi>, ApiError> + Send + Sync,
{
    fn connect(&self, token: &str) -> Result<Arc<dyn CurationApi>, ApiError> {
        self(token)
    }
}

/// Bring the session to `Ready`, acquiring or refreshing the access token
/// silently when possible. Fails with the session status otherwise.
pub async fn ensure_ready(
    ws: &Mutex<Workspace>,
    identity: &dyn IdentityProvider,
    connector: &dyn Connector,
) -> Result<(), WorkspaceError> {
    let (creds, ticket) = {
        let mut w = ws.lock().await;
        w.resolve_session();
        let creds = match &w.session {
            SessionState::Ready(creds) if !creds.is_expired(Utc::now()) => {
                let token = creds.access_token.clone();
                if w.needs_api(&token) {
                    let api = connector.connect(&token)?;
                    w.install_api(&token, api);
                }
                return Ok(());
            }
            SessionState::Ready(creds) | SessionState::AuthenticatedNoToken(creds) => creds.clone(),
            other => return Err(WorkspaceError::NotReady(render::session(other))),
        };
        (creds, w.session_scope.ticket())
    };

    let result = identity.token_silently(&creds).await;

    let mut w = ws.lock().await;
    if !w.session_scope.is_current(ticket) {
        return Err(WorkspaceError::NotReady(render::session(&w.session)));
    }
    match result {
        Ok(fresh) => {
            let token = fresh.access_token.clone();
            w.session.apply(SessionEvent::TokenAcquired(fresh))?;
            if w.needs_api(&token) {
                let api = connector.connect(&token)?;
                w.install_api(&token, api);
            }
            info!("session ready");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "silent token retrieval failed");
            w.session.apply(SessionEvent::TokenRejected)?;
            Err(e.into())
        }
    }
}

/// Start a device login, or return the pending one. `None` when already ready.
pub async fn begin_login(
    ws: &Mutex<Workspace>,
    identity: &dyn IdentityProvider,
) -> Result<Option<(DeviceLogin, ScopeTicket)>, WorkspaceError> {
    let ticket = {
        let mut w = ws.lock().await;
        w.resolve_session();
        match &w.session {
            SessionState::Ready(_) | SessionState::AuthenticatedNoToken(_) => return Ok(None),
            SessionState::Redirecting(login) if login.expires_at > Utc::now() => {
                return Ok(Some((login.clone(), w.session_scope.ticket())));
            }
            SessionState::Redirecting(_) => {
                w.session.apply(SessionEvent::LoginAbandoned)?;
            }
            _ => {}
        }
        w.session_scope.reset();
        w.session_scope.ticket()
    };

    let login = identity.start_login().await?;

    let mut w = ws.lock().await;
    if !w.session_scope.is_current(ticket) {
        return Err(WorkspaceError::NotReady(render::session(&w.session)));
    }
    w.session.apply(SessionEvent::LoginStarted(login.clone()))?;
    Ok(Some((login, ticket)))
}

/// Poll the identity provider until the device login settles. Returns true
/// once credentials are in the session.
pub async fn await_login(
    ws: &Mutex<Workspace>,
    identity: &dyn IdentityProvider,
    login: &DeviceLogin,
    ticket: ScopeTicket,
) -> Result<bool, WorkspaceError> {
    let mut interval = login.interval;
    loop {
        tokio::time::sleep(interval).await;
        {
            let mut w = ws.lock().await;
            if !w.session_scope.is_current(ticket) {
                debug!("login superseded, polling stopped");
                return Ok(false);
            }
            if Utc::now() >= login.expires_at {
                info!("device login expired");
                w.session.apply(SessionEvent::LoginAbandoned)?;
                return Ok(false);
            }
        }

        let poll = identity.poll_login(login).await?;

        let mut w = ws.lock().await;
        if !w.session_scope.is_current(ticket) {
            return Ok(false);
        }
        match poll {
            LoginPoll::Pending => {}
            LoginPoll::SlowDown => interval += std::time::Duration::from_secs(5),
            LoginPoll::Complete(creds) => {
                w.session.apply(SessionEvent::LoginCompleted(creds))?;
                info!("device login completed");
                return Ok(true);
            }
            LoginPoll::Expired | LoginPoll::Denied => {
                info!(outcome = ?poll, "device login abandoned");
                w.session.apply(SessionEvent::LoginAbandoned)?;
                return Ok(false);
            }
        }
    }
}

/// End the session and return the identity provider's logout URL.
pub async fn logout(
    ws: &Mutex<Workspace>,
    identity: &dyn IdentityProvider,
    return_to: &str,
) -> Result<String, WorkspaceError> {
    let mut w = ws.lock().await;
    w.session.apply(SessionEvent::LoggedOut)?;
    w.session_scope.reset();
    w.clear_views();
    Ok(identity.logout_url(return_to)?)
}

/// Fetch the id listing and the full listing concurrently. With `force`
/// false, already-loaded listings are kept.
pub async fn load_diseases(ws: &Mutex<Workspace>, force: bool) -> Result<(), WorkspaceError> {
    let (api, ticket) = {
        let mut w = ws.lock().await;
        let api = w.api()?;
        let loaded = w.browser.ids().loaded().is_some() && w.browser.details().loaded().is_some();
        if loaded && !force {
            return Ok(());
        }
        w.browser.mark_loading();
        (api, w.browser.scope.ticket())
    };

    let (ids, details) = futures::join!(api.disease_ids(), api.diseases());

    let mut w = ws.lock().await;
    if !w.browser.scope.is_current(ticket) {
        debug!("stale disease listing dropped");
        return Ok(());
    }
    for err in [ids.as_ref().err(), details.as_ref().err()].into_iter().flatten() {
        warn!(error = %err, "disease listing failed");
        w.note_api_error(err);
    }
    info!(
        ids = ids.as_ref().map(Vec::len).unwrap_or(0),
        details = details.as_ref().map(Vec::len).unwrap_or(0),
        "disease listings loaded"
    );
    w.browser.set_ids(Fetch::from_result(ids));
    w.browser.set_details(Fetch::from_result(details));
    Ok(())
}

/// Fetch the QA entries of the open list. A failed read is stored in the
/// list, not returned.
pub async fn load_qas(ws: &Mutex<Workspace>) -> Result<(), WorkspaceError> {
    let (api, disease_id, ticket) = {
        let mut w = ws.lock().await;
        let api = w.api()?;
        let list = w.qa_list_mut()?;
        list.mark_loading();
        (api, list.disease_id().to_string(), list.scope.ticket())
    };

    let result = api.qas(&disease_id).await;

    let mut w = ws.lock().await;
    if let Err(err) = &result {
        warn!(disease_id = %disease_id, error = %err, "qa listing failed");
        w.note_api_error(err);
    }
    match w.qas.as_mut() {
        Some(list) if list.scope.is_current(ticket) => {
            debug!(disease_id = %disease_id, "qa listing applied");
            list.replace_entries(Fetch::from_result(result));
        }
        _ => debug!(disease_id = %disease_id, "stale qa listing dropped"),
    }
    Ok(())
}

/// Drop cached QA listings and fetch the open list again, so entries saved
/// by other curators show up.
pub async fn refetch_qas(ws: &Mutex<Workspace>) -> Result<(), WorkspaceError> {
    let api = {
        let w = ws.lock().await;
        let api = w.api()?;
        w.qa_list()?;
        api
    };
    api.invalidate(QAS_FAMILY).await;
    load_qas(ws).await
}

/// Look up the draft's article so answers can be marked in its text.
pub async fn load_article(ws: &Mutex<Workspace>) -> Result<(), WorkspaceError> {
    let (api, article_id, ticket) = {
        let mut w = ws.lock().await;
        let api = w.api()?;
        let form = w.form_mut()?;
        if form.article_id().is_empty() {
            form.set_article(Fetch::Idle);
            return Ok(());
        }
        form.mark_article_loading();
        (api, form.article_id().to_string(), form.scope.ticket())
    };

    let result = api.article(&article_id).await;

    let mut w = ws.lock().await;
    if let Err(err) = &result {
        debug!(article_id = %article_id, error = %err, "article lookup failed");
        w.note_api_error(err);
    }
    match w.form.as_mut() {
        Some(form) if form.scope.is_current(ticket) => form.set_article(Fetch::from_result(result)),
        _ => debug!(article_id = %article_id, "stale article lookup dropped"),
    }
    Ok(())
}

/// Send the draft as a create or whole-list update. Invalid drafts are
/// refused before any request is made. On success the form closes and the
/// QA listing is refetched.
pub async fn submit_form(ws: &Mutex<Workspace>) -> Result<Option<QaId>, WorkspaceError> {
    let (api, submission) = {
        let mut w = ws.lock().await;
        let api = w.api()?;
        let submission = w.form_mut()?.begin_submit()?;
        (api, submission)
    };

    let result = match submission {
        Submission::Create(vars) => {
            info!(disease_id = %vars.disease_id, article_id = %vars.article_id, questions = vars.questions.len(), "creating qa");
            api.create_qa(vars).await
        }
        Submission::Update(vars) => {
            info!(qa_id = %vars.id, questions = vars.questions.len(), "updating qa");
            api.update_qa(vars).await
        }
    };

    {
        let mut w = ws.lock().await;
        if let Some(form) = w.form.as_mut() {
            form.finish_submit();
        }
        match &result {
            Ok(_) => w.close_form(),
            Err(err) => {
                warn!(error = %err, "qa submission failed");
                w.note_api_error(err);
            }
        }
    }

    let qa_id = result?;
    api.invalidate(QAS_FAMILY).await;
    load_qas(ws).await?;
    Ok(qa_id)
}

/// Run the confirmed delete. The dialog closes whatever the outcome; the
/// listing is refetched only when the delete went through.
pub async fn confirm_delete(ws: &Mutex<Workspace>) -> Result<QaId, WorkspaceError> {
    let (api, qa_id) = {
        let mut w = ws.lock().await;
        let api = w.api()?;
        let qa_id = w
            .qa_list_mut()?
            .delete_dialog
            .confirm()
            .ok_or(WorkspaceError::NothingToDelete)?;
        (api, qa_id)
    };

    info!(qa_id = %qa_id, "deleting qa");
    let result = api.delete_qa(&qa_id).await;

    {
        let mut w = ws.lock().await;
        if let Some(list) = w.qas.as_mut() {
            list.delete_dialog.settle();
        }
        if let Err(err) = &result {
            warn!(qa_id = %qa_id, error = %err, "qa delete failed");
            w.note_api_error(err);
        }
    }

    result?;
    api.invalidate(QAS_FAMILY).await;
    load_qas(ws).await?;
    Ok(qa_id)
}

/// Ask the server to re-fetch its disease dataset, then refetch both
/// disease listings.
pub async fn refresh_dataset(ws: &Mutex<Workspace>) -> Result<bool, WorkspaceError> {
    let api = {
        let mut w = ws.lock().await;
        let api = w.api()?;
        if w.refreshing {
            return Err(WorkspaceError::RefreshInFlight);
        }
        w.refreshing = true;
        api
    };

    info!("dataset refresh requested");
    let result = api.fetch_diseases().await;

    {
        let mut w = ws.lock().await;
        w.refreshing = false;
        if let Err(err) = &result {
            warn!(error = %err, "dataset refresh failed");
            w.note_api_error(err);
        }
    }

    let refreshed = result?;
    for family in DISEASE_FAMILIES {
        api.invalidate(family).await;
    }
    load_diseases(ws, true).await?;
    Ok(refreshed)
}
