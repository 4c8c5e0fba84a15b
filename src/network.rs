use crate::{
    error::{
        NetworkError,
        UNRECOGNIZED_CHAIN_CODE,
    },
    provider::WalletProvider,
};
use serde::{
    Serialize,
    Serializer,
};
use tracing::{
    info,
    warn,
};
use url::Url;

pub const HOLESKY_CHAIN_ID: u64 = 17_000;
pub const HOLESKY_CHAIN_NAME: &str = "Holesky Testnet";
pub const HOLESKY_EXPLORER_URL: &str = "https://holesky.etherscan.io";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn ether() -> Self {
        Self {
            name: String::from("ETH"),
            symbol: String::from("ETH"),
            decimals: 18,
        }
    }
}

/// Parameter object of `wallet_addEthereumChain` (EIP-3085).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    #[serde(serialize_with = "serialize_hex_chain_id")]
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<Url>,
    pub block_explorer_urls: Vec<Url>,
}

impl ChainParams {
    /// The one network the bet contract is deployed on.
    pub fn holesky(rpc_url: Url) -> Self {
        let explorer = Url::parse(HOLESKY_EXPLORER_URL).ok();
        Self {
            chain_id: HOLESKY_CHAIN_ID,
            chain_name: HOLESKY_CHAIN_NAME.to_string(),
            native_currency: NativeCurrency::ether(),
            rpc_urls: vec![rpc_url],
            block_explorer_urls: explorer.into_iter().collect(),
        }
    }

    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn rpc_url(&self) -> Option<&Url> {
        self.rpc_urls.first()
    }
}

fn serialize_hex_chain_id<S: Serializer>(id: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{id:#x}"))
}

/// Makes sure the wallet is attached to `chain`, adding it to the wallet when
/// the wallet does not know it yet.
pub async fn ensure_network<W: WalletProvider>(
    wallet: &mut W,
    chain: &ChainParams,
) -> Result<(), NetworkError> {
    let current = wallet.chain_id().await.map_err(NetworkError::Query)?;
    if current == Some(chain.chain_id) {
        return Ok(());
    }

    info!(
        current = ?current,
        required = %chain.hex_chain_id(),
        "wallet on wrong network, requesting switch"
    );
    match wallet.switch_chain(chain.chain_id).await {
        Ok(()) => {}
        Err(err) if err.code() == UNRECOGNIZED_CHAIN_CODE => {
            info!(chain = %chain.chain_name, "chain unknown to wallet, adding it");
            wallet
                .add_chain(chain)
                .await
                .map_err(|source| NetworkError::AddFailed {
                    chain_name: chain.chain_name.clone(),
                    source,
                })?;
            wallet.switch_chain(chain.chain_id).await.map_err(|source| {
                NetworkError::SwitchFailed {
                    chain_id: chain.chain_id,
                    source,
                }
            })?;
        }
        Err(source) => {
            warn!(error = %source, "network switch refused");
            return Err(NetworkError::SwitchFailed {
                chain_id: chain.chain_id,
                source,
            });
        }
    }

    let actual = wallet.chain_id().await.map_err(NetworkError::Query)?;
    if actual != Some(chain.chain_id) {
        return Err(NetworkError::StillMismatched {
            expected: chain.chain_id,
            actual,
        });
    }
    Ok(())
}
