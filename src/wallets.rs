use crate::{
    config::AppConfig,
    contract::AlloyBetContract,
    error::{
        UNAUTHORIZED_CODE,
        WalletError,
    },
    network::ChainParams,
    provider::{
        WalletEvent,
        WalletEvents,
        WalletProvider,
    },
};
use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{
        Provider,
        ProviderBuilder,
    },
    signers::local::{
        MnemonicBuilder,
        PrivateKeySigner,
        coins_bip39::English,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use rpassword::prompt_password;
use std::{
    collections::BTreeMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use tokio::sync::mpsc;
use tracing::{
    debug,
    info,
    warn,
};

/// JSON-RPC "invalid params".
const INVALID_PARAMS_CODE: i64 = -32602;

#[derive(Clone, Debug)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".foundry").join("keystores"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

/// Keystore files in `dir`, sorted by name. Hidden files are skipped.
pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read keystore directory")? {
        let entry = entry.wrap_err("Failed to read keystore entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| eyre!("Invalid keystore filename {:?}", path))?
            .to_owned();
        if name.starts_with('.') {
            continue;
        }
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor> {
    let wallets = list_wallets(dir)?;
    wallets
        .into_iter()
        .find(|w| w.name == name)
        .ok_or_else(|| eyre!("Keystore '{name}' not found in {}", dir.to_string_lossy()))
}

pub fn unlock_wallet(descriptor: &WalletDescriptor) -> Result<PrivateKeySigner> {
    let prompt = format!("Enter password for keystore '{}': ", descriptor.name);
    let password = prompt_password(prompt).wrap_err("Failed to read keystore password")?;

    let secret = decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for keystore '{}'", descriptor.name))?;
    signer_from_secret(&descriptor.name, &secret)
}

/// Keystores hold either a raw 32 byte key or a mnemonic phrase.
pub fn signer_from_secret(name: &str, secret: &[u8]) -> Result<PrivateKeySigner> {
    if secret.len() == 32 {
        if let Ok(signer) = PrivateKeySigner::from_slice(secret) {
            return Ok(signer);
        }
    }

    if let Ok(mnemonic) = std::str::from_utf8(secret) {
        let word_count = mnemonic.split_whitespace().count();
        if word_count >= 12 {
            return MnemonicBuilder::<English>::default()
                .phrase(mnemonic.trim())
                .build()
                .wrap_err_with(|| format!("Keystore '{name}' holds an invalid mnemonic"));
        }
    }

    Err(eyre!("Keystore '{name}' contained unsupported key material"))
}

pub struct KeystoreAccount {
    pub name: String,
    signer: PrivateKeySigner,
}

impl KeystoreAccount {
    pub fn new(name: impl Into<String>, signer: PrivateKeySigner) -> Self {
        Self {
            name: name.into(),
            signer,
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

/// Wallet over unlocked keystore accounts. Exposes one account at a time and
/// starts out attached to no chain.
pub struct KeystoreWallet {
    accounts: Vec<KeystoreAccount>,
    selected: usize,
    unlocked: bool,
    chains: BTreeMap<u64, ChainParams>,
    active_chain: Option<u64>,
    subscribers: Vec<mpsc::UnboundedSender<WalletEvent>>,
}

impl KeystoreWallet {
    pub fn new(accounts: Vec<KeystoreAccount>) -> Self {
        Self {
            accounts,
            selected: 0,
            unlocked: false,
            chains: BTreeMap::new(),
            active_chain: None,
            subscribers: Vec::new(),
        }
    }

    pub fn selected(&self) -> Option<&KeystoreAccount> {
        self.accounts.get(self.selected)
    }

    fn exposed_accounts(&self) -> Vec<Address> {
        if !self.unlocked {
            return Vec::new();
        }
        self.selected().map(KeystoreAccount::address).into_iter().collect()
    }

    fn emit(&mut self, event: WalletEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Makes the next keystore account the active one.
    pub fn select_next_account(&mut self) -> Option<&str> {
        if self.accounts.is_empty() {
            return None;
        }
        self.selected = (self.selected + 1) % self.accounts.len();
        if self.unlocked {
            let accounts = self.exposed_accounts();
            self.emit(WalletEvent::AccountsChanged(accounts));
        }
        self.selected().map(|a| a.name.as_str())
    }

    /// Stops exposing accounts until the next account request.
    pub fn lock(&mut self) {
        if !self.unlocked {
            return;
        }
        self.unlocked = false;
        info!("keystore wallet locked");
        self.emit(WalletEvent::AccountsChanged(Vec::new()));
    }
}

impl WalletProvider for KeystoreWallet {
    type Contract = AlloyBetContract;

    async fn chain_id(&self) -> Result<Option<u64>, WalletError> {
        Ok(self.active_chain)
    }

    async fn switch_chain(&mut self, chain_id: u64) -> Result<(), WalletError> {
        if !self.chains.contains_key(&chain_id) {
            return Err(WalletError::UnrecognizedChain(chain_id));
        }
        if self.active_chain != Some(chain_id) {
            self.active_chain = Some(chain_id);
            self.emit(WalletEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    async fn add_chain(&mut self, chain: &ChainParams) -> Result<(), WalletError> {
        debug!(
            request = %serde_json::to_string(chain).unwrap_or_default(),
            "wallet_addEthereumChain"
        );
        let url = chain.rpc_url().ok_or_else(|| WalletError::Rpc {
            code: INVALID_PARAMS_CODE,
            message: format!("{} has no rpc url", chain.chain_name),
        })?;
        let reported = ProviderBuilder::new()
            .connect_http(url.clone())
            .get_chain_id()
            .await
            .map_err(WalletError::internal)?;
        if reported != chain.chain_id {
            warn!(%url, reported, expected = chain.chain_id, "rpc endpoint serves another chain");
            return Err(WalletError::Rpc {
                code: INVALID_PARAMS_CODE,
                message: format!(
                    "rpc endpoint reports chain {reported}, expected {}",
                    chain.hex_chain_id()
                ),
            });
        }
        info!(chain = %chain.chain_name, %url, "chain added to keystore wallet");
        self.chains.insert(chain.chain_id, chain.clone());
        Ok(())
    }

    async fn request_accounts(&mut self) -> Result<Vec<Address>, WalletError> {
        if self.accounts.is_empty() {
            return Err(WalletError::Rpc {
                code: UNAUTHORIZED_CODE,
                message: "no keystore account unlocked".to_string(),
            });
        }
        self.unlocked = true;
        Ok(self.exposed_accounts())
    }

    fn bind_contract(
        &self,
        signer: Address,
        at: Address,
    ) -> Result<AlloyBetContract, WalletError> {
        let account = self
            .accounts
            .iter()
            .find(|a| a.address() == signer)
            .ok_or_else(|| WalletError::Rpc {
                code: UNAUTHORIZED_CODE,
                message: format!("account {signer} is not managed by this wallet"),
            })?;
        let url = self
            .active_chain
            .and_then(|id| self.chains.get(&id))
            .and_then(ChainParams::rpc_url)
            .ok_or_else(|| WalletError::internal("wallet is not attached to a chain"))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(account.signer.clone()))
            .connect_http(url.clone())
            .erased();
        Ok(AlloyBetContract::new(at, provider))
    }

    fn subscribe(&mut self) -> WalletEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }
}

/// Unlocks the configured keystores, prompting for each password. `None` when
/// there is no keystore to use.
pub fn load_keystore_wallet(config: &AppConfig) -> Result<Option<KeystoreWallet>> {
    let dir = resolve_wallet_dir(config.wallet_dir.as_deref())?;
    let descriptors = if config.wallets.is_empty() {
        list_wallets(&dir)?
    } else {
        config
            .wallets
            .iter()
            .map(|name| find_wallet(&dir, name))
            .collect::<Result<Vec<_>>>()?
    };
    if descriptors.is_empty() {
        warn!(dir = %dir.display(), "no keystore found");
        return Ok(None);
    }

    let mut accounts = Vec::with_capacity(descriptors.len());
    for descriptor in &descriptors {
        let signer = unlock_wallet(descriptor)?;
        info!(name = %descriptor.name, address = %signer.address(), "keystore unlocked");
        accounts.push(KeystoreAccount::new(descriptor.name.clone(), signer));
    }
    Ok(Some(KeystoreWallet::new(accounts)))
}
