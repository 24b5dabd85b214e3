// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use shop_core::Money;

#[test]
fn apply_save_inserts_then_overwrites() {
    let mut state = MaterializedState::default();
    let mut product = Product::new(ProductId(1), "lamp", Money(2_000), 5);
    state.apply(&StoreOp::SaveProduct(product.clone()));

    product.reserve(2).unwrap();
    state.apply(&StoreOp::SaveProduct(product));

    assert_eq!(state.products.len(), 1);
    assert_eq!(state.products[&ProductId(1)].reserved_stock, 2);
}

#[test]
fn next_id_skips_ids_already_saved() {
    let mut state = MaterializedState::default();
    state.apply(&StoreOp::SaveUser(User::new(UserId(7), "ada")));

    assert_eq!(state.next_id(Table::Users), 8);
    assert_eq!(state.next_id(Table::Users), 9);
    assert_eq!(state.next_id(Table::Orders), 1);
}

#[test]
fn saving_an_older_id_keeps_the_sequence() {
    let mut state = MaterializedState::default();
    state.apply(&StoreOp::SaveUser(User::new(UserId(7), "ada")));
    state.apply(&StoreOp::SaveUser(User::new(UserId(3), "bob")));

    assert_eq!(state.next_id(Table::Users), 8);
}

#[test]
fn balances_are_keyed_by_user() {
    let mut state = MaterializedState::default();
    let now = chrono::Utc::now();
    let mut balance = Balance::empty(UserId(1), now);
    state.apply(&StoreOp::SaveBalance(balance.clone()));
    balance.charge(Money(500), now).unwrap();
    state.apply(&StoreOp::SaveBalance(balance));

    assert_eq!(state.balances[&UserId(1)].amount, Money(500));
    assert!(!state.last_ids.contains_key(&Table::Balances));
}
