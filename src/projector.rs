use crate::{
    error::FetchError,
    provider::{
        BetContract,
        RawBet,
        RawOptionInfos,
    },
    units,
};
use alloy::primitives::U256;

/// One outcome of a bet. Labels are unique within a bet, the index is its
/// position in the on-chain option list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BetOption {
    pub index: usize,
    pub label: String,
}

/// Display-ready snapshot of a bet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetView {
    pub id: u64,
    pub topic: String,
    pub is_resolved: bool,
    pub total_amount: U256,
    pub total_display: String,
    pub winning_option: Option<String>,
    pub options: Vec<BetOption>,
    pub option_totals: Vec<U256>,
    pub option_totals_display: Vec<String>,
}

impl BetView {
    pub fn option(&self, label: &str) -> Option<&BetOption> {
        self.options.iter().find(|o| o.label == label)
    }

    pub fn option_total(&self, label: &str) -> Option<U256> {
        self.option(label)
            .and_then(|o| self.option_totals.get(o.index).copied())
    }

    /// `(label, display total)` pairs in on-chain order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options
            .iter()
            .zip(&self.option_totals_display)
            .map(|(o, total)| (o.label.as_str(), total.as_str()))
    }
}

pub fn assemble(
    id: u64,
    raw: RawBet,
    infos: RawOptionInfos,
) -> Result<BetView, FetchError> {
    if infos.options.len() != infos.option_bets.len() {
        return Err(FetchError::Inconsistent {
            bet_id: id,
            options: infos.options.len(),
            totals: infos.option_bets.len(),
        });
    }
    let options = infos
        .options
        .into_iter()
        .enumerate()
        .map(|(index, label)| BetOption { index, label })
        .collect();
    let option_totals_display =
        infos.option_bets.iter().copied().map(units::to_display).collect();
    let winning_option = Some(raw.winning_option).filter(|w| !w.is_empty());
    Ok(BetView {
        id,
        topic: raw.topic,
        is_resolved: raw.is_resolved,
        total_amount: raw.total_amount,
        total_display: units::to_display(raw.total_amount),
        winning_option,
        options,
        option_totals: infos.option_bets,
        option_totals_display,
    })
}

pub async fn project<C: BetContract>(contract: &C, id: u64) -> Result<BetView, FetchError> {
    let raw = contract.get_bet(id).await?;
    project_with(contract, id, raw).await
}

/// Like [`project`] for a bet record the caller already holds.
pub async fn project_with<C: BetContract>(
    contract: &C,
    id: u64,
    raw: RawBet,
) -> Result<BetView, FetchError> {
    let infos = contract.get_bet_option_infos(id).await?;
    assemble(id, raw, infos)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::{
        FakeChain,
        player_address,
    };

    fn eth(milli: u64) -> U256 {
        U256::from(milli) * U256::from(1_000_000_000_000_000u64)
    }

    #[test]
    fn assemble__aligns_options_with_totals() {
        // given
        let raw = RawBet {
            topic: "Will it rain?".to_string(),
            is_resolved: false,
            total_amount: eth(1_750),
            winning_option: String::new(),
        };
        let infos = RawOptionInfos {
            options: vec!["Yes".to_string(), "No".to_string()],
            option_bets: vec![eth(1_500), eth(250)],
        };

        // when
        let view = assemble(7, raw, infos).unwrap();

        // then
        assert_eq!(view.total_display, "1.75");
        assert_eq!(view.winning_option, None);
        assert_eq!(
            view.rows().collect::<Vec<_>>(),
            vec![("Yes", "1.5"), ("No", "0.25")]
        );
        assert_eq!(view.option("No").map(|o| o.index), Some(1));
        assert_eq!(view.option_total("Yes"), Some(eth(1_500)));
    }

    #[test]
    fn assemble__length_mismatch_is_inconsistent() {
        // given
        let raw = RawBet {
            topic: "t".to_string(),
            is_resolved: false,
            total_amount: U256::ZERO,
            winning_option: String::new(),
        };
        let infos = RawOptionInfos {
            options: vec!["A".to_string(), "B".to_string()],
            option_bets: vec![U256::ZERO],
        };

        // when
        let result = assemble(3, raw, infos);

        // then
        assert_eq!(
            result,
            Err(FetchError::Inconsistent {
                bet_id: 3,
                options: 2,
                totals: 1,
            })
        );
    }

    #[tokio::test]
    async fn project__reads_resolved_bet_with_winner() {
        // given
        let chain = FakeChain::new();
        let id = chain.seed_resolved_bet("Derby", &["Red", "Blue"], "Blue");
        let contract = chain.contract_for(player_address());

        // when
        let view = project(&contract, id).await.unwrap();

        // then
        assert!(view.is_resolved);
        assert_eq!(view.winning_option.as_deref(), Some("Blue"));
        assert_eq!(view.option_totals_display, vec!["0.0", "0.0"]);
    }

    #[tokio::test]
    async fn project__surfaces_corrupted_option_totals() {
        // given
        let chain = FakeChain::new();
        let id = chain.seed_bet("Derby", &["Red", "Blue"]);
        chain.corrupt_option_totals(id);
        let contract = chain.contract_for(player_address());

        // when
        let result = project(&contract, id).await;

        // then
        assert!(matches!(result, Err(FetchError::Inconsistent { .. })));
    }
}
