use alloy::primitives::TxHash;
use std::fmt::Display;
use thiserror::Error;

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 "unauthorized": the wallet has no account to expose.
pub const UNAUTHORIZED_CODE: i64 = 4100;
/// EIP-3326 "unrecognized chain id": the wallet must add the chain first.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;
/// JSON-RPC internal error.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// Failure reported by the wallet provider itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("request rejected in wallet")]
    UserRejected,
    #[error("chain {0} is not known to the wallet")]
    UnrecognizedChain(u64),
    #[error("wallet request failed ({code}): {message}")]
    Rpc { code: i64, message: String },
}

impl WalletError {
    pub fn code(&self) -> i64 {
        match self {
            WalletError::UserRejected => USER_REJECTED_CODE,
            WalletError::UnrecognizedChain(_) => UNRECOGNIZED_CHAIN_CODE,
            WalletError::Rpc { code, .. } => *code,
        }
    }

    pub fn internal(message: impl Display) -> Self {
        WalletError::Rpc {
            code: INTERNAL_ERROR_CODE,
            message: message.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("could not read the wallet network: {0}")]
    Query(WalletError),
    #[error("failed to switch to chain {chain_id}: {source}")]
    SwitchFailed {
        chain_id: u64,
        #[source]
        source: WalletError,
    },
    #[error("failed to add {chain_name} network: {source}")]
    AddFailed {
        chain_name: String,
        #[source]
        source: WalletError,
    },
    #[error("wallet is on chain {actual:?} after switching, expected {expected}")]
    StillMismatched { expected: u64, actual: Option<u64> },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("No wallet available: add a keystore account and restart")]
    NoProvider,
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Connection request was rejected in the wallet")]
    UserRejected,
    #[error("Wallet did not expose any account")]
    NoAccounts,
    #[error(transparent)]
    Wallet(WalletError),
    #[error("Bet contract unreachable: {0}")]
    ContractUnreachable(String),
}

impl ConnectError {
    /// Account-access failures carry wallet codes; only 4001 is a rejection.
    pub fn from_account_request(err: WalletError) -> Self {
        if err.code() == USER_REJECTED_CODE {
            ConnectError::UserRejected
        } else {
            ConnectError::Wallet(err)
        }
    }
}

/// Malformed local input. Never reaches the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Wallet is not connected")]
    NotConnected,
    #[error("Only owner can {0} bets")]
    NotPrivileged(&'static str),
    #[error("Bet topic must not be empty")]
    EmptyTopic,
    #[error("At least two options are required (got {found})")]
    TooFewOptions { found: usize },
    #[error("Option \"{0}\" is listed more than once")]
    DuplicateOption(String),
    #[error("Please select option and enter amount")]
    MissingSelection,
    #[error("Invalid bet amount \"{0}\"")]
    BadAmount(String),
    #[error("\"{0}\" is not an option of this bet")]
    UnknownOption(String),
    #[error("No active bet selected")]
    NoActiveBet,
    #[error("Bet #{0} is already resolved")]
    AlreadyResolved(u64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("contract read failed: {0}")]
    Rpc(String),
    #[error("bet #{bet_id} has {options} options but {totals} option totals")]
    Inconsistent {
        bet_id: u64,
        options: usize,
        totals: usize,
    },
    #[error("on-chain value out of range: {0}")]
    OutOfRange(String),
}

impl FetchError {
    pub fn rpc(err: impl Display) -> Self {
        FetchError::Rpc(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transaction rejected in wallet")]
    Rejected,
    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },
    #[error("Transaction failed: {0}")]
    Submit(String),
    #[error("Waiting for confirmation failed: {0}")]
    Confirmation(String),
}

impl TransactionError {
    pub fn submit(err: impl Display) -> Self {
        TransactionError::Submit(err.to_string())
    }
}

/// Everything an action intent can fail with after it leaves the UI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Another action is still in flight")]
    InFlight,
}
