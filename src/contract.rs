use crate::{
    error::{
        FetchError,
        TransactionError,
    },
    provider::{
        BetContract,
        PendingTx,
        RawBet,
        RawOptionInfos,
    },
};
use alloy::{
    network::Ethereum,
    primitives::{
        Address,
        TxHash,
        U256,
    },
    providers::{
        DynProvider,
        PendingTransactionBuilder,
    },
};
use multibet_abi::{
    bet_id_word,
    multibet_types::MultiBetExp,
};
use tracing::{
    debug,
    info,
};

/// `MultiBetExp` over an alloy provider that signs with the session account.
#[derive(Clone)]
pub struct AlloyBetContract {
    instance: MultiBetExp::MultiBetExpInstance<DynProvider>,
}

impl AlloyBetContract {
    pub fn new(address: Address, provider: DynProvider) -> Self {
        Self {
            instance: MultiBetExp::new(address, provider),
        }
    }
}

pub struct AlloyPendingTx {
    inner: PendingTransactionBuilder<Ethereum>,
}

impl PendingTx for AlloyPendingTx {
    fn tx_hash(&self) -> TxHash {
        *self.inner.tx_hash()
    }

    async fn confirm(self) -> Result<TxHash, TransactionError> {
        let tx_hash = self.tx_hash();
        debug!(%tx_hash, "waiting for receipt");
        let receipt = self
            .inner
            .get_receipt()
            .await
            .map_err(|e| TransactionError::Confirmation(e.to_string()))?;
        if !receipt.status() {
            return Err(TransactionError::Reverted { tx_hash });
        }
        info!(%tx_hash, block = ?receipt.block_number, "transaction confirmed");
        Ok(tx_hash)
    }
}

fn submit_error(err: alloy::contract::Error) -> TransactionError {
    let message = err.to_string();
    if message.contains("user rejected") || message.contains("denied") {
        TransactionError::Rejected
    } else {
        TransactionError::Submit(message)
    }
}

impl BetContract for AlloyBetContract {
    type Pending = AlloyPendingTx;

    async fn owner(&self) -> Result<Address, FetchError> {
        self.instance.owner().call().await.map_err(FetchError::rpc)
    }

    async fn bet_count(&self) -> Result<u64, FetchError> {
        let count = self
            .instance
            .betCount()
            .call()
            .await
            .map_err(FetchError::rpc)?;
        u64::try_from(count).map_err(|_| FetchError::OutOfRange(format!("betCount {count}")))
    }

    async fn get_bet(&self, id: u64) -> Result<RawBet, FetchError> {
        let bet = self
            .instance
            .getBet(bet_id_word(id))
            .call()
            .await
            .map_err(FetchError::rpc)?;
        Ok(RawBet {
            topic: bet.topic,
            is_resolved: bet.isResolved,
            total_amount: bet.totalAmount,
            winning_option: bet.winningOption,
        })
    }

    async fn get_bet_option_infos(&self, id: u64) -> Result<RawOptionInfos, FetchError> {
        let infos = self
            .instance
            .getBetOptionInfos(bet_id_word(id))
            .call()
            .await
            .map_err(FetchError::rpc)?;
        Ok(RawOptionInfos {
            options: infos.options,
            option_bets: infos.optionBets,
        })
    }

    async fn create_bet(
        &self,
        topic: &str,
        options: &[String],
    ) -> Result<AlloyPendingTx, TransactionError> {
        let inner = self
            .instance
            .createBet(topic.to_string(), options.to_vec())
            .send()
            .await
            .map_err(submit_error)?;
        Ok(AlloyPendingTx { inner })
    }

    async fn place_bet(
        &self,
        id: u64,
        option: &str,
        value: U256,
    ) -> Result<AlloyPendingTx, TransactionError> {
        let inner = self
            .instance
            .placeBet(bet_id_word(id), option.to_string())
            .value(value)
            .send()
            .await
            .map_err(submit_error)?;
        Ok(AlloyPendingTx { inner })
    }

    async fn resolve_bet(
        &self,
        id: u64,
        winning_option: &str,
    ) -> Result<AlloyPendingTx, TransactionError> {
        let inner = self
            .instance
            .resolveBet(bet_id_word(id), winning_option.to_string())
            .send()
            .await
            .map_err(submit_error)?;
        Ok(AlloyPendingTx { inner })
    }
}
