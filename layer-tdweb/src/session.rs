//! The session: one client, its login state and the UI actions on top.

use crate::auth::{AuthPhase, AuthorizationMachine, Effect};
use crate::catalog::{ChatCatalog, ChatSummary};
use crate::config::Config;
use crate::errors::{ActionError, InitError, InvocationError};
use crate::factory::ClientFactory;
use crate::functions::{
    CheckAuthenticationCode, CheckDatabaseEncryptionKey, RemoteCall, Request, Response,
    SetAuthenticationPhoneNumber, SetTdlibParameters,
};
use crate::host::{Binding, GlobalScope, HostMap};
use crate::invoker::Invoker;
use crate::locator::ModuleLocator;
use crate::ui::{Ui, UiSignal};
use crate::update::{self, Update, UpdateSink, UpdateStream};

// ─── SessionContext ───────────────────────────────────────────────────────────

/// Everything the session knows about its client.
///
/// Empty until [`Session::initialize`] succeeds; cleared again when the
/// authorization state reaches `closed`.
#[derive(Debug, Default)]
pub struct SessionContext {
    client:      Option<Binding>,
    invoker:     Option<Invoker>,
    authorized:  bool,
    phone_entry: bool,
}

impl SessionContext {
    pub fn is_initialized(&self) -> bool { self.invoker.is_some() }

    pub fn is_authorized(&self) -> bool { self.authorized }

    /// Whether a phone number may currently be submitted.
    pub fn phone_entry_enabled(&self) -> bool { self.phone_entry }

    pub fn client(&self) -> Option<&Binding> { self.client.as_ref() }

    pub fn invoker(&self) -> Result<&Invoker, InvocationError> {
        self.invoker.as_ref().ok_or(InvocationError::NotInitialized)
    }

    pub async fn invoke(&self, request: &Request) -> Result<Response, InvocationError> {
        self.invoker()?.invoke(request).await
    }

    pub async fn call<R: RemoteCall>(&self, call: &R) -> Result<Response, InvocationError> {
        self.invoker()?.call(call).await
    }

    fn clear(&mut self) {
        self.client      = None;
        self.invoker     = None;
        self.authorized  = false;
        self.phone_entry = false;
    }
}

// ─── Session ──────────────────────────────────────────────────────────────────

/// A TDLib web session driven by UI actions and pushed updates.
///
/// ```rust,no_run
/// # async fn f(scope: layer_tdweb::HostMap, ui: impl layer_tdweb::Ui) -> Result<(), Box<dyn std::error::Error>> {
/// use layer_tdweb::{Config, Session};
///
/// let config  = Config::from_ui_input("12345", "0123456789abcdef")?;
/// let mut session = Session::new(config, ui);
/// let mut updates = session.initialize(&scope).await?;
/// session.send_phone_number("+15550100").await?;
/// while let Some(update) = updates.next().await {
///     session.handle_update(&update).await;
/// }
/// # Ok(()) }
/// ```
pub struct Session<U: Ui> {
    config:  Config,
    ui:      U,
    context: SessionContext,
    machine: AuthorizationMachine,
}

impl<U: Ui> Session<U> {
    pub fn new(config: Config, ui: U) -> Self {
        ui.set_status("Ready. Enter API_ID/API_HASH and initialize TDLib.");
        Self { config, ui, context: SessionContext::default(), machine: AuthorizationMachine::new() }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn ui(&self) -> &U { &self.ui }

    pub fn context(&self) -> &SessionContext { &self.context }

    pub fn phase(&self) -> AuthPhase { self.machine.phase() }

    // ── Initialization ─────────────────────────────────────────────────────

    /// Locate the module in `scope`, create and adapt a client, attach the
    /// update handler and send the TDLib parameters.
    ///
    /// Replaces any previous client. The returned stream yields the updates
    /// the client pushes; feed them to [`Session::handle_update`].
    pub async fn initialize(&mut self, scope: &dyn GlobalScope) -> Result<UpdateStream, InitError> {
        self.ui.set_status("Loading TDLib (WASM) module …");
        self.context.clear();
        self.machine = AuthorizationMachine::new();

        match self.try_initialize(scope).await {
            Ok((client, invoker, updates)) => {
                self.context.client  = Some(client);
                self.context.invoker = Some(invoker);
                self.set_phone_entry(true);
                self.ui.set_status("TDLib initialized. Please send your phone number.");
                tracing::info!("[layer-tdweb] client initialized ✓");
                Ok(updates)
            }
            Err(e) => {
                tracing::error!("[layer-tdweb] initialization failed: {e}");
                self.ui.set_status(&format!("Initialization failed: {e}"));
                Err(e)
            }
        }
    }

    async fn try_initialize(
        &self,
        scope: &dyn GlobalScope,
    ) -> Result<(Binding, Invoker, UpdateStream), InitError> {
        let locator = ModuleLocator::new(self.config.candidates.iter().cloned());
        let located = locator.locate(scope).await.ok_or_else(|| InitError::ModuleNotFound {
            candidates: locator.candidates().to_vec(),
        })?;
        tracing::info!("[layer-tdweb] TDLib module found under {}", located.name);

        let (sink, updates) = UpdateSink::channel();
        let options = Binding::from(HostMap::new().with("onUpdate", sink.callback()));

        let client  = ClientFactory::from_config(&self.config).instantiate(&located.module, &options).await?;
        let invoker = Invoker::adapt(&client, self.config.key_sample_limit)?;
        update::register(&client, &sink);

        tracing::info!(
            "[layer-tdweb] sending setTdlibParameters with api_id={} (api_hash not logged)",
            self.config.api_id
        );
        let params = SetTdlibParameters { parameters: self.config.tdlib_parameters() };
        invoker.call(&params).await?.into_result()?;
        invoker.call(&CheckDatabaseEncryptionKey::default()).await?.into_result()?;

        Ok((client, invoker, updates))
    }

    // ── Requests ───────────────────────────────────────────────────────────

    /// Send a raw request through the current client.
    pub async fn invoke(&self, request: &Request) -> Result<Response, InvocationError> {
        self.context.invoke(request).await
    }

    /// Submit the phone number typed into the UI.
    pub async fn send_phone_number(&mut self, raw: &str) -> Result<(), ActionError> {
        let phone = raw.trim();
        let result = self.submit_phone(phone).await;
        match &result {
            Ok(()) => {
                self.ui.set_status("Phone number sent. Waiting for the code (check SMS or the Telegram app).");
                self.ui.signal(UiSignal::CodeEntry(true));
            }
            Err(e) => self.report("Sending the phone number failed", e),
        }
        result
    }

    async fn submit_phone(&self, phone: &str) -> Result<(), ActionError> {
        if phone.is_empty() {
            return Err(ActionError::EmptyInput("phone number"));
        }
        self.context.invoker()?;
        if !self.context.phone_entry {
            return Err(ActionError::PhoneEntryDisabled);
        }
        self.ui.set_status("Sending phone number to Telegram …");
        self.context.call(&SetAuthenticationPhoneNumber::new(phone)).await?.into_result()?;
        Ok(())
    }

    /// Submit the login code typed into the UI.
    pub async fn send_code(&mut self, raw: &str) -> Result<(), ActionError> {
        let code = raw.trim();
        let result = self.submit_code(code).await;
        match &result {
            Ok(())  => self.ui.set_status("Code sent. Waiting for authorization …"),
            Err(e)  => self.report("Verifying the code failed", e),
        }
        result
    }

    async fn submit_code(&self, code: &str) -> Result<(), ActionError> {
        if code.is_empty() {
            return Err(ActionError::EmptyInput("code"));
        }
        self.context.invoker()?;
        self.ui.set_status("Sending code for verification …");
        let call = CheckAuthenticationCode { code: code.to_string() };
        self.context.call(&call).await?.into_result()?;
        Ok(())
    }

    // ── Chats ──────────────────────────────────────────────────────────────

    /// The chat list, without touching the UI.
    pub async fn fetch_chats(&self) -> Result<Vec<ChatSummary>, InvocationError> {
        ChatCatalog::new(self.config.chat_limit).fetch(&self.context).await
    }

    /// Fetch the chat list and render it.
    pub async fn refresh_chats(&mut self) -> Result<Vec<ChatSummary>, InvocationError> {
        self.ui.set_status("Loading chats …");
        let result = self.fetch_chats().await;
        match &result {
            Ok(chats) => {
                self.ui.render_chats(chats);
                if chats.is_empty() {
                    self.ui.set_status("No chats found.");
                } else {
                    self.ui.set_status(&format!("Chats loaded ({}).", chats.len()));
                }
            }
            Err(e) => self.report("Loading chats failed", e),
        }
        result
    }

    // ── Updates ────────────────────────────────────────────────────────────

    /// Apply one pushed update.
    pub async fn handle_update(&mut self, update: &Update) {
        for effect in self.machine.on_update(update) {
            match effect {
                Effect::Status(text)   => self.ui.set_status(&text),
                Effect::Signal(signal) => self.emit(signal),
                Effect::MarkAuthorized => self.context.authorized = true,
                Effect::ClearSession   => {
                    tracing::info!("[layer-tdweb] session closed, dropping client");
                    self.context.clear();
                }
                Effect::FetchChats => {
                    // Failures are already on the status line.
                    let _ = self.refresh_chats().await;
                }
            }
        }
    }

    /// Apply every update already queued on `updates`. Returns how many there were.
    pub async fn drain(&mut self, updates: &mut UpdateStream) -> usize {
        let mut n = 0;
        while let Some(update) = updates.try_next() {
            self.handle_update(&update).await;
            n += 1;
        }
        n
    }

    /// Apply updates until the session closes or the client stops sending.
    pub async fn run(&mut self, mut updates: UpdateStream) {
        while let Some(update) = updates.next().await {
            self.handle_update(&update).await;
            if self.machine.is_closed() {
                break;
            }
        }
    }

    fn emit(&mut self, signal: UiSignal) {
        if let UiSignal::PhoneEntry(enabled) = signal {
            self.context.phone_entry = enabled;
        }
        self.ui.signal(signal);
    }

    fn set_phone_entry(&mut self, enabled: bool) {
        self.emit(UiSignal::PhoneEntry(enabled));
    }

    fn report(&self, action: &str, error: &dyn std::error::Error) {
        tracing::warn!("[layer-tdweb] {action}: {error}");
        self.ui.set_status(&format!("{action}: {error}"));
    }
}
