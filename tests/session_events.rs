#![allow(non_snake_case)]
use alloy::primitives::Address;
use multibet_client::{
    client::AppController,
    error::ConnectError,
    network::{
        ChainParams,
        HOLESKY_CHAIN_ID,
    },
    test_helpers::{
        FakeChain,
        FakeWallet,
        contract_address,
        owner_address,
        player_address,
    },
};
use std::time::Duration;
use url::Url;

fn holesky() -> ChainParams {
    ChainParams::holesky(Url::parse("http://localhost:8545").unwrap())
}

fn controller_with(wallet: FakeWallet) -> AppController<FakeWallet> {
    AppController::new(Some(wallet), holesky(), contract_address())
}

async fn deliver_next_event(controller: &mut AppController<FakeWallet>) {
    let event = controller.next_wallet_event().await.unwrap();
    controller.handle_wallet_event(event).await;
}

fn wallet(chain: &FakeChain, account: Address) -> FakeWallet {
    FakeWallet::on_chain(chain, Some(HOLESKY_CHAIN_ID)).with_accounts(vec![account])
}

#[tokio::test]
async fn accounts_changed__empty_list_collapses_session() {
    // given
    let chain = FakeChain::new();
    chain.seed_bet("Derby", &["Red", "Blue"]);
    let mut controller = controller_with(wallet(&chain, owner_address()));
    controller.connect().await.unwrap();

    // when
    controller.wallet_mut().unwrap().emit_accounts_changed(vec![]);
    deliver_next_event(&mut controller).await;

    // then
    let snapshot = controller.snapshot();
    assert!(!snapshot.connected);
    assert!(!snapshot.is_privileged);
    assert_eq!(snapshot.account, None);
    assert_eq!(snapshot.bet, None);
    assert!(controller.is_subscribed());
}

#[tokio::test]
async fn accounts_changed__collapsed_session_hides_registry_position() {
    // given
    let chain = FakeChain::new();
    chain.seed_bet("a", &["Yes", "No"]);
    chain.seed_bet("b", &["Yes", "No"]);
    let mut controller = controller_with(wallet(&chain, player_address()));
    controller.connect().await.unwrap();
    controller.navigate(1).await;

    // when
    controller.wallet_mut().unwrap().emit_accounts_changed(vec![]);
    deliver_next_event(&mut controller).await;

    // then
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.total_count, 0);
    assert_eq!(snapshot.current_index, 0);
}

#[tokio::test]
async fn accounts_changed__new_account_reconnects_without_privilege() {
    // given
    let chain = FakeChain::new();
    chain.seed_bet("Derby", &["Red", "Blue"]);
    let mut controller = controller_with(wallet(&chain, owner_address()));
    controller.connect().await.unwrap();
    assert!(controller.snapshot().is_privileged);

    // when
    controller
        .wallet_mut()
        .unwrap()
        .emit_accounts_changed(vec![player_address()]);
    deliver_next_event(&mut controller).await;

    // then
    let snapshot = controller.snapshot();
    assert!(snapshot.connected);
    assert_eq!(snapshot.account, Some(player_address()));
    assert!(!snapshot.is_privileged);
    assert_eq!(snapshot.bet.map(|b| b.id), Some(0));
}

#[tokio::test]
async fn chain_changed__resets_session_and_drops_subscription() {
    // given
    let chain = FakeChain::new();
    chain.seed_bet("a", &["Yes", "No"]);
    chain.seed_bet("b", &["Yes", "No"]);
    let mut controller = controller_with(wallet(&chain, player_address()));
    controller.connect().await.unwrap();
    controller.navigate(1).await;

    // when
    controller.wallet_mut().unwrap().emit_chain_changed(1);
    deliver_next_event(&mut controller).await;

    // then
    let snapshot = controller.snapshot();
    assert!(!snapshot.connected);
    assert_eq!(snapshot.total_count, 0);
    assert_eq!(snapshot.current_index, 0);
    assert_eq!(snapshot.bet, None);
    assert!(!controller.is_subscribed());
}

#[tokio::test]
async fn connect__after_reset_switches_back_and_subscribes_again() {
    // given
    let chain = FakeChain::new();
    chain.seed_bet("a", &["Yes", "No"]);
    let mut controller = controller_with(wallet(&chain, player_address()));
    controller.connect().await.unwrap();
    controller.wallet_mut().unwrap().emit_chain_changed(1);
    deliver_next_event(&mut controller).await;

    // when
    controller.connect().await.unwrap();

    // then
    let wallet = controller.wallet().unwrap();
    assert_eq!(wallet.active_chain(), Some(HOLESKY_CHAIN_ID));
    assert_eq!(wallet.switch_requests(), vec![HOLESKY_CHAIN_ID]);
    assert_eq!(wallet.subscriptions(), 2);
    assert!(controller.snapshot().connected);
}

#[tokio::test]
async fn connect__wallet_without_chain_adds_and_switches() {
    // given
    let chain = FakeChain::new();
    let wallet = FakeWallet::on_chain(&chain, None).with_accounts(vec![player_address()]);
    let mut controller = controller_with(wallet);

    // when
    controller.connect().await.unwrap();

    // then
    let wallet = controller.wallet().unwrap();
    assert_eq!(wallet.added_chains(), vec![HOLESKY_CHAIN_ID]);
    assert_eq!(wallet.active_chain(), Some(HOLESKY_CHAIN_ID));
    assert!(controller.snapshot().chain_ok);
}

#[tokio::test]
async fn connect__without_wallet_is_no_provider() {
    // given
    let mut controller: AppController<FakeWallet> =
        AppController::new(None, holesky(), contract_address());

    // when
    let result = controller.connect().await;

    // then
    assert_eq!(result, Err(ConnectError::NoProvider));
    let snapshot = controller.snapshot();
    assert!(!snapshot.connected);
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn connect_error__expires_after_five_seconds() {
    // given
    let chain = FakeChain::new();
    let mut controller = controller_with(wallet(&chain, player_address()).with_accounts(vec![]));
    let _ = controller.connect().await;
    assert!(controller.snapshot().error.is_some());

    // when
    tokio::time::advance(Duration::from_secs(5)).await;
    let expired = controller.expire_errors();

    // then
    assert!(expired);
    assert_eq!(controller.snapshot().error, None);
    assert_eq!(controller.error_deadline(), None);
}
