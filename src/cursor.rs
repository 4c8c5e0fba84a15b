use crate::{
    error::FetchError,
    provider::{
        BetContract,
        RawBet,
    },
};
use std::collections::BTreeSet;
use tracing::debug;

/// Position in the bet registry plus the ids already seen resolved in this
/// session.
///
/// Resolution is one-way, so a resolved id never needs to be read again until
/// the session is reset.
#[derive(Clone, Debug, Default)]
pub struct BetCursor {
    current: u64,
    known_resolved: BTreeSet<u64>,
}

impl BetCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> u64 {
        self.current
    }

    pub fn set(&mut self, index: u64) {
        self.current = index;
    }

    /// Moves by `delta`, clamped to `[0, total - 1]`. Returns whether the
    /// position changed.
    pub fn move_by(&mut self, delta: i64, total: u64) -> bool {
        if total == 0 {
            return false;
        }
        let last = total - 1;
        let target = if delta.is_negative() {
            self.current.saturating_sub(delta.unsigned_abs())
        } else {
            self.current.saturating_add(delta.unsigned_abs())
        }
        .min(last);
        let changed = target != self.current;
        self.current = target;
        changed
    }

    pub fn mark_resolved(&mut self, id: u64) {
        self.known_resolved.insert(id);
    }

    pub fn is_known_resolved(&self, id: u64) -> bool {
        self.known_resolved.contains(&id)
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.known_resolved.clear();
    }

    /// Lowest unresolved bet at or after the cursor. Leaves the position
    /// untouched; the caller decides whether the result is still wanted.
    pub async fn scan<C: BetContract>(
        &mut self,
        contract: &C,
        total: u64,
    ) -> Result<Option<(u64, RawBet)>, FetchError> {
        for id in self.current..total {
            if self.known_resolved.contains(&id) {
                continue;
            }
            let bet = contract.get_bet(id).await?;
            if bet.is_resolved {
                self.known_resolved.insert(id);
                continue;
            }
            return Ok(Some((id, bet)));
        }
        debug!(from = self.current, total, "no unresolved bet at or after cursor");
        Ok(None)
    }
}

/// Plain ascending scan without any cache.
pub async fn find_first_unresolved_from<C: BetContract>(
    contract: &C,
    start: u64,
    total: u64,
) -> Result<Option<(u64, RawBet)>, FetchError> {
    for id in start..total {
        let bet = contract.get_bet(id).await?;
        if !bet.is_resolved {
            return Ok(Some((id, bet)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::{
        FakeChain,
        player_address,
    };
    use proptest::prelude::*;

    fn chain_with(resolved: &[bool]) -> FakeChain {
        let chain = FakeChain::new();
        for (i, is_resolved) in resolved.iter().enumerate() {
            let topic = format!("bet {i}");
            if *is_resolved {
                chain.seed_resolved_bet(&topic, &["Yes", "No"], "Yes");
            } else {
                chain.seed_bet(&topic, &["Yes", "No"]);
            }
        }
        chain
    }

    fn block_on<F: Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[tokio::test]
    async fn scan__skips_resolved_bet_at_cursor() {
        // given
        let chain = chain_with(&[true, false, false]);
        let contract = chain.contract_for(player_address());
        let mut cursor = BetCursor::new();

        // when
        let found = cursor.scan(&contract, 3).await.unwrap();

        // then
        let (id, bet) = found.unwrap();
        assert_eq!(id, 1);
        assert_eq!(bet.topic, "bet 1");
        assert_eq!(cursor.position(), 0);
        assert!(cursor.is_known_resolved(0));
    }

    #[tokio::test]
    async fn scan__returns_none_when_everything_after_cursor_is_resolved() {
        // given
        let chain = chain_with(&[false, true, true]);
        let contract = chain.contract_for(player_address());
        let mut cursor = BetCursor::new();
        cursor.set(1);

        // when
        let found = cursor.scan(&contract, 3).await.unwrap();

        // then
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn scan__does_not_reread_known_resolved_ids() {
        // given
        let chain = chain_with(&[true, true, false]);
        let contract = chain.contract_for(player_address());
        let mut cursor = BetCursor::new();
        cursor.scan(&contract, 3).await.unwrap();
        let reads_after_first_scan = chain.reads();

        // when
        let found = cursor.scan(&contract, 3).await.unwrap();

        // then
        assert_eq!(found.map(|(id, _)| id), Some(2));
        assert_eq!(chain.reads() - reads_after_first_scan, 1);
    }

    #[tokio::test]
    async fn scan__start_past_total_is_none_without_reads() {
        // given
        let chain = chain_with(&[false]);
        let contract = chain.contract_for(player_address());
        let mut cursor = BetCursor::new();
        cursor.set(5);

        // when
        let found = cursor.scan(&contract, 1).await.unwrap();

        // then
        assert_eq!(found, None);
        assert_eq!(chain.reads(), 0);
    }

    #[test]
    fn move_by__forward_at_last_index_is_noop() {
        // given
        let mut cursor = BetCursor::new();
        cursor.set(2);

        // when
        let changed = cursor.move_by(1, 3);

        // then
        assert!(!changed);
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn move_by__backward_at_zero_is_noop() {
        let mut cursor = BetCursor::new();
        assert!(!cursor.move_by(-1, 3));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn move_by__empty_registry_never_moves() {
        let mut cursor = BetCursor::new();
        assert!(!cursor.move_by(1, 0));
        assert!(!cursor.move_by(-1, 0));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn reset__forgets_position_and_resolved_ids() {
        // given
        let mut cursor = BetCursor::new();
        cursor.set(4);
        cursor.mark_resolved(1);

        // when
        cursor.reset();

        // then
        assert_eq!(cursor.position(), 0);
        assert!(!cursor.is_known_resolved(1));
    }

    proptest! {
        #[test]
        fn scan__finds_lowest_unresolved_id(
            resolved in proptest::collection::vec(any::<bool>(), 0..24),
            start in 0u64..26,
        ) {
            let chain = chain_with(&resolved);
            let contract = chain.contract_for(player_address());
            let total = resolved.len() as u64;
            let expected = (start..total).find(|id| !resolved[*id as usize]);

            let mut cursor = BetCursor::new();
            cursor.set(start);
            let cached = block_on(cursor.scan(&contract, total)).unwrap();
            let rescanned = block_on(cursor.scan(&contract, total)).unwrap();
            let plain = block_on(find_first_unresolved_from(&contract, start, total)).unwrap();

            prop_assert_eq!(cached.map(|(id, _)| id), expected);
            prop_assert_eq!(rescanned.map(|(id, _)| id), expected);
            prop_assert_eq!(plain.map(|(id, _)| id), expected);
        }
    }
}
