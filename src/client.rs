use crate::{
    config::AppConfig,
    cursor::BetCursor,
    dispatcher::{
        self,
        Action,
    },
    error::{
        ActionError,
        ConnectError,
        FetchError,
        ValidationError,
    },
    error_channel::ErrorChannel,
    network::ChainParams,
    projector::{
        self,
        BetView,
    },
    provider::{
        BetContract,
        WalletEvent,
        WalletEvents,
        WalletProvider,
    },
    session::{
        self,
        Session,
        SessionTransition,
    },
    ui,
    units,
    wallets::{
        self,
        KeystoreWallet,
    },
};
use alloy::primitives::Address;
use color_eyre::eyre::Result;
use tokio::time::{
    self,
    Instant,
};
use tracing::{
    debug,
    info,
    warn,
};

pub const NO_ACTIVE_BETS: &str = "No active bets available";

/// Everything the presentation layer reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppSnapshot {
    pub connected: bool,
    pub account: Option<Address>,
    pub is_privileged: bool,
    pub chain_ok: bool,
    pub current_index: u64,
    pub total_count: u64,
    pub bet: Option<BetView>,
    pub loading: bool,
    pub status: String,
    pub error: Option<String>,
}

/// Identifies the session and cursor position a fetch was started for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RefreshTicket {
    epoch: u64,
    position: u64,
}

pub struct AppController<W: WalletProvider> {
    wallet: Option<W>,
    chain: ChainParams,
    contract_address: Address,
    session: Session,
    contract: Option<W::Contract>,
    registry_total: u64,
    cursor: BetCursor,
    bet: Option<BetView>,
    loading: bool,
    status: String,
    errors: ErrorChannel,
    events: Option<WalletEvents>,
    epoch: u64,
}

impl<W: WalletProvider> AppController<W> {
    pub fn new(wallet: Option<W>, chain: ChainParams, contract_address: Address) -> Self {
        Self {
            wallet,
            chain,
            contract_address,
            session: Session::empty(),
            contract: None,
            registry_total: 0,
            cursor: BetCursor::new(),
            bet: None,
            loading: false,
            status: String::from("Press c to connect your wallet"),
            errors: ErrorChannel::default(),
            events: None,
            epoch: 0,
        }
    }

    /// Registry position and size are only reported for a live session.
    pub fn snapshot(&self) -> AppSnapshot {
        let connected = self.session.is_connected();
        AppSnapshot {
            connected,
            account: self.session.wallet_address,
            is_privileged: self.session.is_privileged,
            chain_ok: self.session.chain_ok,
            current_index: if connected { self.cursor.position() } else { 0 },
            total_count: if connected { self.registry_total } else { 0 },
            bet: self.bet.clone(),
            loading: self.loading,
            status: self.status.clone(),
            error: self.errors.current().map(str::to_string),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn wallet(&self) -> Option<&W> {
        self.wallet.as_ref()
    }

    pub fn wallet_mut(&mut self) -> Option<&mut W> {
        self.wallet.as_mut()
    }

    pub fn is_subscribed(&self) -> bool {
        self.events.is_some()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn ticket(&self) -> RefreshTicket {
        RefreshTicket {
            epoch: self.epoch,
            position: self.cursor.position(),
        }
    }

    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        if self.loading {
            debug!("connect ignored while another request is in flight");
            return Ok(());
        }
        self.loading = true;
        self.status = String::from("Connecting wallet...");
        let result = self.establish().await;
        self.loading = false;
        if let Err(e) = &result {
            warn!(error = %e, "connect failed");
            self.collapse();
            self.status = String::from("Not connected");
            self.errors.report(e.to_string());
        }
        result
    }

    async fn establish(&mut self) -> Result<(), ConnectError> {
        let wallet = self.wallet.as_mut().ok_or(ConnectError::NoProvider)?;
        let connection =
            session::connect(wallet, &self.chain, self.contract_address).await?;
        if self.events.is_none() {
            self.events = Some(wallet.subscribe());
        }

        self.epoch += 1;
        self.session = connection.session;
        self.contract = Some(connection.contract);
        self.registry_total = connection.bet_count;
        self.bet = None;
        self.errors.clear();
        self.status = match self.session.wallet_address {
            Some(address) if self.session.is_privileged => {
                format!("Connected as {address} (owner)")
            }
            Some(address) => format!("Connected as {address}"),
            None => String::from("Connected"),
        };
        if let Err(e) = self.refresh_from_cursor().await {
            self.errors.report(e.to_string());
        }
        Ok(())
    }

    /// Scans from the cursor and projects the first unresolved bet. The
    /// result only lands if session and cursor are unchanged meanwhile.
    async fn refresh_from_cursor(&mut self) -> Result<(), FetchError> {
        let Some(contract) = self.contract.as_ref() else {
            return Ok(());
        };
        let ticket = self.ticket();
        let view = match self.cursor.scan(contract, self.registry_total).await? {
            Some((id, raw)) => Some(projector::project_with(contract, id, raw).await?),
            None => None,
        };
        self.commit(ticket, view);
        Ok(())
    }

    async fn reproject(&mut self, id: u64) -> Result<(), FetchError> {
        let Some(contract) = self.contract.as_ref() else {
            return Ok(());
        };
        let ticket = self.ticket();
        let view = projector::project(contract, id).await?;
        self.commit(ticket, Some(view));
        Ok(())
    }

    fn commit(&mut self, ticket: RefreshTicket, view: Option<BetView>) {
        if ticket != self.ticket() {
            debug!(?ticket, current = ?self.ticket(), "discarding stale bet refresh");
            return;
        }
        match view {
            Some(view) => {
                if view.is_resolved {
                    self.cursor.mark_resolved(view.id);
                }
                self.cursor.set(view.id);
                self.bet = Some(view);
            }
            None => {
                self.bet = None;
                self.status = NO_ACTIVE_BETS.to_string();
            }
        }
    }

    /// Moves the cursor and loads the first unresolved bet from there.
    pub async fn navigate(&mut self, delta: i64) {
        if self.loading || self.contract.is_none() {
            return;
        }
        let previous = self.cursor.position();
        if !self.cursor.move_by(delta, self.registry_total) {
            return;
        }
        self.loading = true;
        let result = self.refresh_from_cursor().await;
        self.loading = false;
        if let Err(e) = result {
            // keep cursor and displayed bet in agreement
            self.cursor.set(previous);
            self.errors.report(e.to_string());
        }
    }

    pub async fn create_bet(&mut self, topic: &str, options_csv: &str) -> Result<(), ActionError> {
        let action = Action::create(&self.session, topic, options_csv);
        self.run(action).await
    }

    pub async fn place_bet(&mut self, option: &str, amount: &str) -> Result<(), ActionError> {
        let action = Action::place(&self.session, self.bet.as_ref(), option, amount);
        self.run(action).await
    }

    pub async fn resolve_bet(&mut self, option: &str) -> Result<(), ActionError> {
        let action = Action::resolve(&self.session, self.bet.as_ref(), option);
        self.run(action).await
    }

    async fn run(&mut self, action: Result<Action, ValidationError>) -> Result<(), ActionError> {
        if self.loading {
            self.errors.report(ActionError::InFlight.to_string());
            return Err(ActionError::InFlight);
        }
        let action = match action {
            Ok(action) => action,
            Err(e) => {
                self.errors.report(e.to_string());
                return Err(e.into());
            }
        };

        self.loading = true;
        self.status = action.progress();
        let result = match self.execute(&action).await {
            Ok(()) => Ok(self.settle(&action).await),
            Err(e) => Err(e),
        };
        self.loading = false;

        match result {
            Ok((status, refreshed)) => {
                info!(action = action.label(), %status, "action completed");
                self.errors.clear();
                self.status = match (&refreshed, &self.bet) {
                    (Ok(()), None) => format!("{status}. {NO_ACTIVE_BETS}"),
                    _ => status,
                };
                if let Err(e) = refreshed {
                    warn!(
                        action = action.label(),
                        error = %e,
                        "refresh after confirmed action failed"
                    );
                    self.errors.report(e.to_string());
                }
                Ok(())
            }
            Err(e) => {
                self.status = format!("Failed to {}", action.label());
                self.errors.report(e.to_string());
                Err(e)
            }
        }
    }

    async fn execute(&self, action: &Action) -> Result<(), ActionError> {
        let contract = self
            .contract
            .as_ref()
            .ok_or(ValidationError::NotConnected)?;
        dispatcher::submit(contract, action).await?;
        Ok(())
    }

    /// Refreshes whatever a confirmed action changed. The action itself has
    /// landed, so a failed read only travels alongside the outcome status.
    async fn settle(&mut self, action: &Action) -> (String, Result<(), FetchError>) {
        match action {
            Action::CreateBet { topic, options } => {
                let created = format!("\"{topic}\" with {} options", options.len());
                match self.reload_bet_count().await {
                    Ok(new_id) => (
                        format!("Bet #{new_id} created: {created}"),
                        self.refresh_from_cursor().await,
                    ),
                    Err(e) => (format!("Bet created: {created}"), Err(e)),
                }
            }
            Action::PlaceBet {
                bet_id,
                option,
                value,
            } => {
                let status = format!(
                    "Placed {} on \"{}\"",
                    units::to_display_with_symbol(*value),
                    option.label
                );
                (status, self.reproject(*bet_id).await)
            }
            Action::ResolveBet { bet_id, winner } => {
                self.cursor.mark_resolved(*bet_id);
                let status = format!("Bet #{bet_id} resolved: \"{}\" wins", winner.label);
                (status, self.refresh_from_cursor().await)
            }
        }
    }

    /// Re-reads the registry size and points the cursor at the newest bet.
    async fn reload_bet_count(&mut self) -> Result<u64, FetchError> {
        let Some(contract) = self.contract.as_ref() else {
            return Err(FetchError::Rpc(String::from("no contract bound")));
        };
        self.registry_total = contract.bet_count().await?;
        let new_id = self.registry_total.saturating_sub(1);
        self.cursor.set(new_id);
        Ok(new_id)
    }

    pub async fn handle_wallet_event(&mut self, event: WalletEvent) {
        info!(?event, "wallet event");
        match session::transition_for(&event) {
            SessionTransition::Reset => self.reset(),
            SessionTransition::Collapse => {
                self.collapse();
                self.status = String::from("Wallet locked, press c to reconnect");
            }
            SessionTransition::Reconnect => {
                // failures already land in the error slot
                let _ = self.connect().await;
            }
        }
    }

    /// Drops the session and every piece of state derived from it, including
    /// the wallet subscription. The user has to connect again.
    pub fn reset(&mut self) {
        info!("session reset");
        self.epoch += 1;
        self.session = Session::empty();
        self.contract = None;
        self.registry_total = 0;
        self.cursor.reset();
        self.bet = None;
        self.loading = false;
        self.events = None;
        self.errors.clear();
        self.status = String::from("Network changed, press c to reconnect");
    }

    /// Session back to empty. Subscription and cursor survive.
    fn collapse(&mut self) {
        if self.session.is_connected() {
            info!("session collapsed");
        }
        self.epoch += 1;
        self.session = Session::empty();
        self.contract = None;
        self.bet = None;
    }

    /// Next notification from the wallet. Never resolves without a
    /// subscription.
    pub async fn next_wallet_event(&mut self) -> Option<WalletEvent> {
        let Some(events) = self.events.as_mut() else {
            return std::future::pending().await;
        };
        let event = events.recv().await;
        if event.is_none() {
            warn!("wallet event stream closed");
            self.events = None;
        }
        event
    }

    pub fn error_deadline(&self) -> Option<Instant> {
        self.errors.deadline()
    }

    pub fn expire_errors(&mut self) -> bool {
        self.errors.expire()
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let wallet = wallets::load_keystore_wallet(&config)?;
    let mut controller = AppController::new(wallet, config.chain(), config.contract_address);
    let mut ui_state = ui::UiState::default();

    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut controller, &mut ui_state).await;
    ui::terminal_exit()?;
    res
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn run_loop(
    controller: &mut AppController<KeystoreWallet>,
    ui_state: &mut ui::UiState,
) -> Result<()> {
    let mut input = ui::input_event_stream();
    ui::draw(ui_state, &controller.snapshot())?;
    loop {
        let deadline = controller.error_deadline();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            _ = until(deadline) => {
                controller.expire_errors();
            }
            event = controller.next_wallet_event() => {
                if let Some(event) = event {
                    controller.handle_wallet_event(event).await;
                }
            }
            ev = ui::next_event(ui_state, &mut input) => {
                let Some(ev) = ev? else { break };
                if ev.reaches_wallet() {
                    // redraw before blocking on the wallet
                    let mut busy = controller.snapshot();
                    busy.loading = true;
                    busy.status = String::from("Processing, confirm in wallet if asked...");
                    ui::draw(ui_state, &busy)?;
                }
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Connect => { let _ = controller.connect().await; }
                    ui::UserEvent::Navigate(delta) => controller.navigate(delta).await,
                    ui::UserEvent::PlaceBet { option, amount } => { let _ = controller.place_bet(&option, &amount).await; }
                    ui::UserEvent::CreateBet { topic, options } => { let _ = controller.create_bet(&topic, &options).await; }
                    ui::UserEvent::ResolveBet { option } => { let _ = controller.resolve_bet(&option).await; }
                    ui::UserEvent::SwitchAccount => {
                        if let Some(name) = controller.wallet_mut().and_then(|w| w.select_next_account()).map(str::to_string) {
                            controller.set_status(format!("Active keystore: {name}"));
                        }
                    }
                    ui::UserEvent::LockWallet => {
                        if let Some(wallet) = controller.wallet_mut() { wallet.lock(); }
                    }
                    ui::UserEvent::Redraw => {}
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot())?;
    }
    Ok(())
}
