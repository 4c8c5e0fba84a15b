pub mod client;
pub mod config;
pub mod contract;
pub mod cursor;
pub mod dispatcher;
pub mod error;
pub mod error_channel;
pub mod network;
pub mod projector;
pub mod provider;
pub mod session;
pub mod ui;
pub mod units;
pub mod wallets;

pub mod test_helpers;

pub use multibet_abi::multibet_types;
