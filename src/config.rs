use crate::network::ChainParams;
use alloy::primitives::Address;
use clap::Parser;
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "multibet",
    version,
    about = "Terminal client for the MultiBet betting contract on Holesky"
)]
pub struct AppConfig {
    /// Deployed MultiBet contract
    #[arg(long, env = "MULTIBET_CONTRACT_ADDRESS")]
    pub contract_address: Address,
    /// JSON-RPC endpoint of the Holesky network
    #[arg(long, env = "HOLESKY_RPC_URL")]
    pub rpc_url: Url,
    /// Keystore to unlock, repeatable. Every keystore in the directory when omitted
    #[arg(long = "wallet", value_name = "NAME")]
    pub wallets: Vec<String>,
    /// Keystore directory (defaults to ~/.foundry/keystores)
    #[arg(long, value_name = "PATH")]
    pub wallet_dir: Option<String>,
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,
    /// Used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}

impl AppConfig {
    pub fn chain(&self) -> ChainParams {
        ChainParams::holesky(self.rpc_url.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::network::HOLESKY_CHAIN_ID;

    #[test]
    fn try_parse_from__reads_repeated_wallets_and_defaults() {
        // when
        let config = AppConfig::try_parse_from([
            "multibet",
            "--contract-address",
            "0x00000000000000000000000000000000000000cc",
            "--rpc-url",
            "https://holesky.example.org",
            "--wallet",
            "owner",
            "--wallet",
            "alice",
        ])
        .unwrap();

        // then
        assert_eq!(config.contract_address, Address::with_last_byte(0xcc));
        assert_eq!(config.wallets, vec!["owner", "alice"]);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.chain().chain_id, HOLESKY_CHAIN_ID);
    }

    #[test]
    fn try_parse_from__rejects_malformed_address() {
        let result = AppConfig::try_parse_from([
            "multibet",
            "--contract-address",
            "not-an-address",
            "--rpc-url",
            "https://holesky.example.org",
        ]);
        assert!(result.is_err());
    }
}
