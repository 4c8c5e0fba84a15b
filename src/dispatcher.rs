//! Validation and submission of the three state-changing bet actions.
//!
//! Actions are built through validating constructors, so holding an
//! [`Action`] means the input already passed every local check. Nothing in
//! this module touches the network before that point.

use crate::{
    error::{
        TransactionError,
        ValidationError,
    },
    projector::{
        BetOption,
        BetView,
    },
    provider::{
        BetContract,
        PendingTx,
    },
    session::Session,
    units,
};
use alloy::primitives::{
    TxHash,
    U256,
};
use itertools::Itertools;
use std::collections::HashSet;
use tracing::{
    info,
    warn,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    CreateBet {
        topic: String,
        options: Vec<String>,
    },
    PlaceBet {
        bet_id: u64,
        option: BetOption,
        value: U256,
    },
    ResolveBet {
        bet_id: u64,
        winner: BetOption,
    },
}

/// Comma separated option labels, trimmed, empties dropped.
pub fn parse_options(csv: &str) -> Result<Vec<String>, ValidationError> {
    let options: Vec<String> = csv
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if options.len() < 2 {
        return Err(ValidationError::TooFewOptions {
            found: options.len(),
        });
    }
    let mut seen = HashSet::new();
    for option in &options {
        if !seen.insert(option.as_str()) {
            return Err(ValidationError::DuplicateOption(option.clone()));
        }
    }
    Ok(options)
}

fn open_bet(bet: Option<&BetView>) -> Result<&BetView, ValidationError> {
    let bet = bet.ok_or(ValidationError::NoActiveBet)?;
    if bet.is_resolved {
        return Err(ValidationError::AlreadyResolved(bet.id));
    }
    Ok(bet)
}

fn known_option(bet: &BetView, label: &str) -> Result<BetOption, ValidationError> {
    bet.option(label)
        .cloned()
        .ok_or_else(|| ValidationError::UnknownOption(label.to_string()))
}

impl Action {
    pub fn create(
        session: &Session,
        topic: &str,
        options_csv: &str,
    ) -> Result<Self, ValidationError> {
        if !session.is_connected() {
            return Err(ValidationError::NotConnected);
        }
        if !session.is_privileged {
            return Err(ValidationError::NotPrivileged("create"));
        }
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        let options = parse_options(options_csv)?;
        Ok(Action::CreateBet {
            topic: topic.to_string(),
            options,
        })
    }

    pub fn place(
        session: &Session,
        bet: Option<&BetView>,
        option: &str,
        amount: &str,
    ) -> Result<Self, ValidationError> {
        if !session.is_connected() {
            return Err(ValidationError::NotConnected);
        }
        let option = option.trim();
        if option.is_empty() || amount.trim().is_empty() {
            return Err(ValidationError::MissingSelection);
        }
        let bet = open_bet(bet)?;
        let option = known_option(bet, option)?;
        let value = units::parse_amount(amount)?;
        Ok(Action::PlaceBet {
            bet_id: bet.id,
            option,
            value,
        })
    }

    pub fn resolve(
        session: &Session,
        bet: Option<&BetView>,
        winner: &str,
    ) -> Result<Self, ValidationError> {
        if !session.is_connected() {
            return Err(ValidationError::NotConnected);
        }
        if !session.is_privileged {
            return Err(ValidationError::NotPrivileged("resolve"));
        }
        let bet = open_bet(bet)?;
        let winner = known_option(bet, winner.trim())?;
        Ok(Action::ResolveBet {
            bet_id: bet.id,
            winner,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::CreateBet { .. } => "create bet",
            Action::PlaceBet { .. } => "place bet",
            Action::ResolveBet { .. } => "resolve bet",
        }
    }

    /// Status line while the transaction is pending.
    pub fn progress(&self) -> String {
        match self {
            Action::CreateBet { topic, options } => format!(
                "Creating bet \"{topic}\" ({})...",
                options.iter().join(" / ")
            ),
            Action::PlaceBet {
                bet_id,
                option,
                value,
            } => format!(
                "Placing {} on \"{}\" in bet #{bet_id}...",
                units::to_display_with_symbol(*value),
                option.label
            ),
            Action::ResolveBet { bet_id, winner } => {
                format!("Resolving bet #{bet_id} with \"{}\"...", winner.label)
            }
        }
    }
}

/// Sends the transaction and waits until it is mined.
pub async fn submit<C: BetContract>(
    contract: &C,
    action: &Action,
) -> Result<TxHash, TransactionError> {
    let sent = match action {
        Action::CreateBet { topic, options } => contract.create_bet(topic, options).await,
        Action::PlaceBet {
            bet_id,
            option,
            value,
        } => contract.place_bet(*bet_id, &option.label, *value).await,
        Action::ResolveBet { bet_id, winner } => {
            contract.resolve_bet(*bet_id, &winner.label).await
        }
    };
    let pending = sent.inspect_err(|e| {
        warn!(action = action.label(), error = %e, "transaction not submitted");
    })?;
    let tx_hash = pending.tx_hash();
    info!(action = action.label(), %tx_hash, "transaction submitted");
    pending.confirm().await.inspect_err(|e| {
        warn!(action = action.label(), %tx_hash, error = %e, "transaction failed");
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        projector::assemble,
        provider::{
            RawBet,
            RawOptionInfos,
        },
        test_helpers::{
            owner_address,
            player_address,
        },
    };
    use proptest::prelude::*;

    fn owner_session() -> Session {
        Session::connected(owner_address(), true)
    }

    fn player_session() -> Session {
        Session::connected(player_address(), false)
    }

    fn open_view(id: u64) -> BetView {
        let raw = RawBet {
            topic: "Will it rain?".to_string(),
            is_resolved: false,
            total_amount: U256::ZERO,
            winning_option: String::new(),
        };
        let infos = RawOptionInfos {
            options: vec!["Yes".to_string(), "No".to_string()],
            option_bets: vec![U256::ZERO, U256::ZERO],
        };
        assemble(id, raw, infos).unwrap()
    }

    #[test]
    fn parse_options__trims_and_drops_empties() {
        assert_eq!(
            parse_options(" Yes, No ,, Maybe ,"),
            Ok(vec!["Yes".to_string(), "No".to_string(), "Maybe".to_string()])
        );
    }

    #[test]
    fn parse_options__rejects_duplicate_labels() {
        assert_eq!(
            parse_options("Yes, No, Yes"),
            Err(ValidationError::DuplicateOption("Yes".to_string()))
        );
    }

    #[test]
    fn create__requires_privilege() {
        // when
        let result = Action::create(&player_session(), "Rain?", "Yes, No");

        // then
        assert_eq!(result, Err(ValidationError::NotPrivileged("create")));
    }

    #[test]
    fn create__rejects_blank_topic() {
        let result = Action::create(&owner_session(), "   ", "Yes, No");
        assert_eq!(result, Err(ValidationError::EmptyTopic));
    }

    #[test]
    fn create__builds_trimmed_action() {
        // when
        let action = Action::create(&owner_session(), " Will it rain? ", "Yes, No, Maybe");

        // then
        assert_eq!(
            action,
            Ok(Action::CreateBet {
                topic: "Will it rain?".to_string(),
                options: vec!["Yes".to_string(), "No".to_string(), "Maybe".to_string()],
            })
        );
    }

    #[test]
    fn place__requires_option_and_amount() {
        let bet = open_view(0);
        let session = player_session();
        assert_eq!(
            Action::place(&session, Some(&bet), "", "1"),
            Err(ValidationError::MissingSelection)
        );
        assert_eq!(
            Action::place(&session, Some(&bet), "Yes", "  "),
            Err(ValidationError::MissingSelection)
        );
    }

    #[test]
    fn place__rejects_malformed_amount() {
        // given
        let bet = open_view(0);

        // when
        let result = Action::place(&player_session(), Some(&bet), "Yes", "abc");

        // then
        assert_eq!(result, Err(ValidationError::BadAmount("abc".to_string())));
    }

    #[test]
    fn place__rejects_unknown_option_and_missing_bet() {
        let bet = open_view(0);
        let session = player_session();
        assert_eq!(
            Action::place(&session, Some(&bet), "Maybe", "1"),
            Err(ValidationError::UnknownOption("Maybe".to_string()))
        );
        assert_eq!(
            Action::place(&session, None, "Yes", "1"),
            Err(ValidationError::NoActiveBet)
        );
    }

    #[test]
    fn place__carries_exact_wei_value() {
        // given
        let bet = open_view(4);

        // when
        let action = Action::place(&player_session(), Some(&bet), "No", "0.000000000000000123");

        // then
        assert_eq!(
            action,
            Ok(Action::PlaceBet {
                bet_id: 4,
                option: BetOption {
                    index: 1,
                    label: "No".to_string(),
                },
                value: U256::from(123u64),
            })
        );
    }

    #[test]
    fn resolve__requires_privilege_before_anything_else() {
        // when
        let result = Action::resolve(&player_session(), None, "Yes");

        // then
        assert_eq!(result, Err(ValidationError::NotPrivileged("resolve")));
    }

    #[test]
    fn resolve__rejects_already_resolved_bet() {
        // given
        let mut bet = open_view(2);
        bet.is_resolved = true;

        // when
        let result = Action::resolve(&owner_session(), Some(&bet), "Yes");

        // then
        assert_eq!(result, Err(ValidationError::AlreadyResolved(2)));
    }

    #[test]
    fn actions__require_connected_session() {
        let bet = open_view(0);
        let empty = Session::empty();
        assert_eq!(
            Action::create(&empty, "t", "a, b"),
            Err(ValidationError::NotConnected)
        );
        assert_eq!(
            Action::place(&empty, Some(&bet), "Yes", "1"),
            Err(ValidationError::NotConnected)
        );
        assert_eq!(
            Action::resolve(&empty, Some(&bet), "Yes"),
            Err(ValidationError::NotConnected)
        );
    }

    proptest! {
        #[test]
        fn create__rejects_fewer_than_two_options(
            label in proptest::option::of("[A-Za-z]{1,8}"),
            before in "[ ,]{0,6}",
            after in "[ ,]{0,6}",
        ) {
            let csv = format!("{before}{}{after}", label.clone().unwrap_or_default());
            let found = usize::from(label.is_some());

            let result = Action::create(&owner_session(), "Topic", &csv);

            prop_assert_eq!(result, Err(ValidationError::TooFewOptions { found }));
        }
    }
}
