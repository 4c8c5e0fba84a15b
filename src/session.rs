use crate::{
    error::ConnectError,
    network::{
        ChainParams,
        ensure_network,
    },
    provider::{
        BetContract,
        WalletEvent,
        WalletProvider,
    },
};
use alloy::primitives::Address;
use tracing::{
    info,
    warn,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub wallet_address: Option<Address>,
    pub is_privileged: bool,
    pub chain_ok: bool,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn connected(address: Address, is_privileged: bool) -> Self {
        Self {
            wallet_address: Some(address),
            is_privileged,
            chain_ok: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.wallet_address.is_some()
    }
}

/// Everything a successful connect hands to the orchestrator.
pub struct Connection<C> {
    pub session: Session,
    pub contract: C,
    pub bet_count: u64,
}

/// Negotiates the network, picks the signer and reads the owner and bet
/// count through a contract handle bound to that signer.
pub async fn connect<W: WalletProvider>(
    wallet: &mut W,
    chain: &ChainParams,
    contract_address: Address,
) -> Result<Connection<W::Contract>, ConnectError> {
    ensure_network(wallet, chain).await?;

    let accounts = wallet
        .request_accounts()
        .await
        .map_err(ConnectError::from_account_request)?;
    let signer = *accounts.first().ok_or(ConnectError::NoAccounts)?;

    let contract = wallet
        .bind_contract(signer, contract_address)
        .map_err(ConnectError::Wallet)?;
    let contract_err = |e: crate::error::FetchError| {
        warn!(%contract_address, error = %e, "contract read failed during connect");
        ConnectError::ContractUnreachable(e.to_string())
    };
    let owner = contract.owner().await.map_err(contract_err)?;
    // byte equality, so hex casing of either side is irrelevant
    let is_privileged = owner == signer;
    let bet_count = contract.bet_count().await.map_err(contract_err)?;

    info!(%signer, is_privileged, bet_count, "wallet session established");
    Ok(Connection {
        session: Session::connected(signer, is_privileged),
        contract,
        bet_count,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionTransition {
    /// Chain changed under the session: drop everything.
    Reset,
    /// Wallet exposes no account anymore.
    Collapse,
    /// Another account became active.
    Reconnect,
}

pub fn transition_for(event: &WalletEvent) -> SessionTransition {
    match event {
        WalletEvent::ChainChanged(_) => SessionTransition::Reset,
        WalletEvent::AccountsChanged(accounts) if accounts.is_empty() => {
            SessionTransition::Collapse
        }
        WalletEvent::AccountsChanged(_) => SessionTransition::Reconnect,
    }
}
