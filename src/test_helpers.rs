//! In-memory chain, wallet and contract handle for tests.

use crate::{
    error::{
        FetchError,
        TransactionError,
        WalletError,
    },
    network::ChainParams,
    provider::{
        BetContract,
        PendingTx,
        RawBet,
        RawOptionInfos,
        WalletEvent,
        WalletEvents,
        WalletProvider,
    },
};
use alloy::primitives::{
    Address,
    TxHash,
    U256,
};
use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};
use tokio::sync::mpsc;

pub fn owner_address() -> Address {
    Address::repeat_byte(0x0a)
}

pub fn player_address() -> Address {
    Address::repeat_byte(0x0b)
}

pub fn contract_address() -> Address {
    Address::repeat_byte(0xcc)
}

/// One ether in wei.
pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(1_000_000_000_000_000_000u128)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeBet {
    pub topic: String,
    pub options: Vec<String>,
    pub totals: Vec<U256>,
    pub is_resolved: bool,
    pub winning_option: String,
}

impl FakeBet {
    fn new(topic: &str, options: &[String]) -> Self {
        Self {
            topic: topic.to_string(),
            options: options.to_vec(),
            totals: vec![U256::ZERO; options.len()],
            is_resolved: false,
            winning_option: String::new(),
        }
    }

    fn total(&self) -> U256 {
        self.totals.iter().copied().fold(U256::ZERO, |acc, t| acc + t)
    }
}

#[derive(Debug)]
struct ChainState {
    owner: Address,
    bets: Vec<FakeBet>,
    reads: usize,
    submitted: usize,
    unreachable: bool,
    reject_next: bool,
    drop_after_write: bool,
}

/// Shared state of the fake bet contract. Clones see the same chain.
#[derive(Clone, Debug)]
pub struct FakeChain {
    state: Arc<Mutex<ChainState>>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                owner: owner_address(),
                bets: Vec::new(),
                reads: 0,
                submitted: 0,
                unreachable: false,
                reject_next: false,
                drop_after_write: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contract_for(&self, signer: Address) -> FakeContract {
        FakeContract {
            chain: self.clone(),
            signer,
        }
    }

    pub fn seed_bet(&self, topic: &str, options: &[&str]) -> u64 {
        let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        let mut state = self.state();
        state.bets.push(FakeBet::new(topic, &options));
        state.bets.len() as u64 - 1
    }

    pub fn seed_resolved_bet(&self, topic: &str, options: &[&str], winner: &str) -> u64 {
        let id = self.seed_bet(topic, options);
        let mut state = self.state();
        if let Some(bet) = state.bets.get_mut(id as usize) {
            bet.is_resolved = true;
            bet.winning_option = winner.to_string();
        }
        id
    }

    /// Resolves a bet behind the client's back.
    pub fn resolve_externally(&self, id: u64, winner: &str) {
        if let Some(bet) = self.state().bets.get_mut(id as usize) {
            bet.is_resolved = true;
            bet.winning_option = winner.to_string();
        }
    }

    pub fn bet(&self, id: u64) -> Option<FakeBet> {
        self.state().bets.get(id as usize).cloned()
    }

    pub fn bet_count(&self) -> u64 {
        self.state().bets.len() as u64
    }

    pub fn set_owner(&self, owner: Address) {
        self.state().owner = owner;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Drops the last option total so reads disagree on lengths.
    pub fn corrupt_option_totals(&self, id: u64) {
        if let Some(bet) = self.state().bets.get_mut(id as usize) {
            bet.totals.pop();
        }
    }

    /// The next write is refused as if the user declined it in the wallet.
    pub fn reject_next_transaction(&self) {
        self.state().reject_next = true;
    }

    /// The next write lands on chain, then the node stops answering.
    pub fn disconnect_after_next_write(&self) {
        self.state().drop_after_write = true;
    }

    /// Contract reads served so far.
    pub fn reads(&self) -> usize {
        self.state().reads
    }

    /// Writes that reached the contract handle, refused ones included.
    pub fn submitted(&self) -> usize {
        self.state().submitted
    }

    fn read<T>(&self, f: impl FnOnce(&ChainState) -> Result<T, FetchError>) -> Result<T, FetchError> {
        let mut state = self.state();
        if state.unreachable {
            return Err(FetchError::Rpc("connection refused".to_string()));
        }
        state.reads += 1;
        f(&state)
    }

    fn write(
        &self,
        f: impl FnOnce(&mut ChainState) -> bool,
    ) -> Result<FakePendingTx, TransactionError> {
        let mut state = self.state();
        state.submitted += 1;
        if std::mem::take(&mut state.reject_next) {
            return Err(TransactionError::Rejected);
        }
        if state.unreachable {
            return Err(TransactionError::Submit("connection refused".to_string()));
        }
        let applied = f(&mut state);
        if std::mem::take(&mut state.drop_after_write) {
            state.unreachable = true;
        }
        let tx_hash = TxHash::from(U256::from(state.submitted).to_be_bytes::<32>());
        Ok(FakePendingTx {
            tx_hash,
            reverted: !applied,
        })
    }
}

#[derive(Clone, Debug)]
pub struct FakeContract {
    chain: FakeChain,
    signer: Address,
}

#[derive(Debug)]
pub struct FakePendingTx {
    tx_hash: TxHash,
    reverted: bool,
}

impl PendingTx for FakePendingTx {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    async fn confirm(self) -> Result<TxHash, TransactionError> {
        if self.reverted {
            Err(TransactionError::Reverted {
                tx_hash: self.tx_hash,
            })
        } else {
            Ok(self.tx_hash)
        }
    }
}

fn missing(id: u64) -> FetchError {
    FetchError::Rpc(format!("execution reverted: bet {id} does not exist"))
}

impl BetContract for FakeContract {
    type Pending = FakePendingTx;

    async fn owner(&self) -> Result<Address, FetchError> {
        self.chain.read(|s| Ok(s.owner))
    }

    async fn bet_count(&self) -> Result<u64, FetchError> {
        self.chain.read(|s| Ok(s.bets.len() as u64))
    }

    async fn get_bet(&self, id: u64) -> Result<RawBet, FetchError> {
        self.chain.read(|s| {
            let bet = s.bets.get(id as usize).ok_or_else(|| missing(id))?;
            Ok(RawBet {
                topic: bet.topic.clone(),
                is_resolved: bet.is_resolved,
                total_amount: bet.total(),
                winning_option: bet.winning_option.clone(),
            })
        })
    }

    async fn get_bet_option_infos(&self, id: u64) -> Result<RawOptionInfos, FetchError> {
        self.chain.read(|s| {
            let bet = s.bets.get(id as usize).ok_or_else(|| missing(id))?;
            Ok(RawOptionInfos {
                options: bet.options.clone(),
                option_bets: bet.totals.clone(),
            })
        })
    }

    async fn create_bet(
        &self,
        topic: &str,
        options: &[String],
    ) -> Result<FakePendingTx, TransactionError> {
        let signer = self.signer;
        self.chain.write(|s| {
            if signer != s.owner || options.len() < 2 {
                return false;
            }
            s.bets.push(FakeBet::new(topic, options));
            true
        })
    }

    async fn place_bet(
        &self,
        id: u64,
        option: &str,
        value: U256,
    ) -> Result<FakePendingTx, TransactionError> {
        self.chain.write(|s| {
            let Some(bet) = s.bets.get_mut(id as usize) else {
                return false;
            };
            let Some(index) = bet.options.iter().position(|o| o == option) else {
                return false;
            };
            if bet.is_resolved || value.is_zero() {
                return false;
            }
            let Some(total) = bet.totals.get_mut(index) else {
                return false;
            };
            *total += value;
            true
        })
    }

    async fn resolve_bet(
        &self,
        id: u64,
        winning_option: &str,
    ) -> Result<FakePendingTx, TransactionError> {
        let signer = self.signer;
        self.chain.write(|s| {
            if signer != s.owner {
                return false;
            }
            let Some(bet) = s.bets.get_mut(id as usize) else {
                return false;
            };
            if bet.is_resolved || !bet.options.iter().any(|o| o == winning_option) {
                return false;
            }
            bet.is_resolved = true;
            bet.winning_option = winning_option.to_string();
            true
        })
    }
}

/// Scripted wallet in front of a [`FakeChain`].
#[derive(Debug)]
pub struct FakeWallet {
    chain: FakeChain,
    accounts: Vec<Address>,
    active_chain: Option<u64>,
    known_chains: BTreeSet<u64>,
    switch_requests: Vec<u64>,
    added_chains: Vec<u64>,
    account_requests: usize,
    subscriptions: usize,
    fail_switch: Option<WalletError>,
    fail_add_chain: Option<WalletError>,
    fail_accounts: Option<WalletError>,
    subscribers: Vec<mpsc::UnboundedSender<WalletEvent>>,
}

impl FakeWallet {
    pub fn on_chain(chain: &FakeChain, active_chain: Option<u64>) -> Self {
        Self {
            chain: chain.clone(),
            accounts: vec![player_address()],
            active_chain,
            known_chains: active_chain.into_iter().collect(),
            switch_requests: Vec::new(),
            added_chains: Vec::new(),
            account_requests: 0,
            subscriptions: 0,
            fail_switch: None,
            fail_add_chain: None,
            fail_accounts: None,
            subscribers: Vec::new(),
        }
    }

    pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn know_chain(&mut self, chain_id: u64) {
        self.known_chains.insert(chain_id);
    }

    pub fn fail_switch(&mut self, err: WalletError) {
        self.fail_switch = Some(err);
    }

    pub fn fail_add_chain(&mut self, err: WalletError) {
        self.fail_add_chain = Some(err);
    }

    pub fn fail_accounts(&mut self, err: WalletError) {
        self.fail_accounts = Some(err);
    }

    /// Every switch attempt, failed ones included.
    pub fn switch_requests(&self) -> Vec<u64> {
        self.switch_requests.clone()
    }

    pub fn added_chains(&self) -> Vec<u64> {
        self.added_chains.clone()
    }

    pub fn account_requests(&self) -> usize {
        self.account_requests
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions
    }

    pub fn active_chain(&self) -> Option<u64> {
        self.active_chain
    }

    fn emit(&mut self, event: WalletEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// The user picked other accounts (or locked the wallet with `vec![]`).
    pub fn emit_accounts_changed(&mut self, accounts: Vec<Address>) {
        self.accounts = accounts.clone();
        self.emit(WalletEvent::AccountsChanged(accounts));
    }

    /// The user moved the wallet to another network.
    pub fn emit_chain_changed(&mut self, chain_id: u64) {
        self.known_chains.insert(chain_id);
        self.active_chain = Some(chain_id);
        self.emit(WalletEvent::ChainChanged(chain_id));
    }
}

impl WalletProvider for FakeWallet {
    type Contract = FakeContract;

    async fn chain_id(&self) -> Result<Option<u64>, WalletError> {
        Ok(self.active_chain)
    }

    async fn switch_chain(&mut self, chain_id: u64) -> Result<(), WalletError> {
        self.switch_requests.push(chain_id);
        if let Some(err) = self.fail_switch.take() {
            return Err(err);
        }
        if !self.known_chains.contains(&chain_id) {
            return Err(WalletError::UnrecognizedChain(chain_id));
        }
        if self.active_chain != Some(chain_id) {
            self.active_chain = Some(chain_id);
            self.emit(WalletEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    async fn add_chain(&mut self, chain: &ChainParams) -> Result<(), WalletError> {
        if let Some(err) = self.fail_add_chain.take() {
            return Err(err);
        }
        self.added_chains.push(chain.chain_id);
        self.known_chains.insert(chain.chain_id);
        Ok(())
    }

    async fn request_accounts(&mut self) -> Result<Vec<Address>, WalletError> {
        self.account_requests += 1;
        if let Some(err) = self.fail_accounts.take() {
            return Err(err);
        }
        Ok(self.accounts.clone())
    }

    fn bind_contract(&self, signer: Address, _at: Address) -> Result<FakeContract, WalletError> {
        Ok(self.chain.contract_for(signer))
    }

    fn subscribe(&mut self) -> WalletEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriptions += 1;
        self.subscribers.push(tx);
        rx
    }
}
