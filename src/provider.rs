use crate::{
    error::{
        FetchError,
        TransactionError,
        WalletError,
    },
    network::ChainParams,
};
use alloy::primitives::{
    Address,
    TxHash,
    U256,
};
use tokio::sync::mpsc;

/// Notifications a wallet pushes without being asked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

pub type WalletEvents = mpsc::UnboundedReceiver<WalletEvent>;

/// The wallet side of a session: network negotiation, account access and
/// signing contract handles.
pub trait WalletProvider {
    type Contract: BetContract;

    /// `None` while the wallet is not attached to any chain.
    fn chain_id(&self) -> impl Future<Output = Result<Option<u64>, WalletError>>;

    fn switch_chain(
        &mut self,
        chain_id: u64,
    ) -> impl Future<Output = Result<(), WalletError>>;

    fn add_chain(
        &mut self,
        chain: &ChainParams,
    ) -> impl Future<Output = Result<(), WalletError>>;

    fn request_accounts(&mut self)
    -> impl Future<Output = Result<Vec<Address>, WalletError>>;

    /// Contract handle at `at` that signs as `signer` on the active chain.
    fn bind_contract(
        &self,
        signer: Address,
        at: Address,
    ) -> Result<Self::Contract, WalletError>;

    fn subscribe(&mut self) -> WalletEvents;
}

/// `getBet(id)` as returned by the contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawBet {
    pub topic: String,
    pub is_resolved: bool,
    pub total_amount: U256,
    pub winning_option: String,
}

/// `getBetOptionInfos(id)` as returned by the contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawOptionInfos {
    pub options: Vec<String>,
    pub option_bets: Vec<U256>,
}

pub trait PendingTx {
    fn tx_hash(&self) -> TxHash;

    /// Resolves once the transaction is mined, failing if it reverted.
    fn confirm(self) -> impl Future<Output = Result<TxHash, TransactionError>>;
}

pub trait BetContract {
    type Pending: PendingTx;

    fn owner(&self) -> impl Future<Output = Result<Address, FetchError>>;

    fn bet_count(&self) -> impl Future<Output = Result<u64, FetchError>>;

    fn get_bet(&self, id: u64) -> impl Future<Output = Result<RawBet, FetchError>>;

    fn get_bet_option_infos(
        &self,
        id: u64,
    ) -> impl Future<Output = Result<RawOptionInfos, FetchError>>;

    fn create_bet(
        &self,
        topic: &str,
        options: &[String],
    ) -> impl Future<Output = Result<Self::Pending, TransactionError>>;

    fn place_bet(
        &self,
        id: u64,
        option: &str,
        value: U256,
    ) -> impl Future<Output = Result<Self::Pending, TransactionError>>;

    fn resolve_bet(
        &self,
        id: u64,
        winning_option: &str,
    ) -> impl Future<Output = Result<Self::Pending, TransactionError>>;
}
