use std::collections::HashMap;

use tempdir::TempDir;

use spos_common::{account::VersionedBalance, block::Height, crypto::{Address, KeyPair}};

use crate::core::{
    error::LedgerError,
    storage::{BalanceProvider, Storage},
    tests::{address_of, genesis_block, open_ledger, payment, test_block},
};

#[tokio::test]
async fn test_empty_store() {
    let dir = TempDir::new("spos-state").unwrap();
    let ledger = open_ledger(&dir);

    let anyone = address_of(&KeyPair::new());
    assert_eq!(ledger.get_state_height().await.unwrap(), 0);
    assert_eq!(ledger.get_balance(&anyone).await.unwrap(), 0);
    assert!(ledger.validate(&[], None).await.unwrap().is_empty());
    assert!(ledger.get_account_transactions(&anyone).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_genesis_and_payment() {
    let dir = TempDir::new("spos-state").unwrap();
    let ledger = open_ledger(&dir);

    let forger = KeyPair::new();
    let alice = KeyPair::new();
    let alice_address = address_of(&alice);
    let bob = address_of(&KeyPair::new());

    ledger
        .process_block(&genesis_block(&forger, &alice_address, 1_000))
        .await
        .unwrap();
    assert_eq!(ledger.get_state_height().await.unwrap(), 1);
    assert_eq!(ledger.get_balance(&alice_address).await.unwrap(), 1_000);

    let tx = payment(&alice, &bob, 100, 10, 1_000);
    ledger
        .process_block(&test_block(&forger, 2, vec![tx.clone()]))
        .await
        .unwrap();

    assert_eq!(ledger.get_balance(&alice_address).await.unwrap(), 890);
    assert_eq!(ledger.get_balance(&bob).await.unwrap(), 100);
    assert_eq!(ledger.get_balance(&address_of(&forger)).await.unwrap(), 10);
    assert_eq!(ledger.get_state_height().await.unwrap(), 2);
    assert_eq!(ledger.is_included(tx.get_signature()).await.unwrap(), Some(2));

    // both accounts report the payment, newest first
    let of_alice = ledger.get_account_transactions(&alice_address).await.unwrap();
    assert_eq!(of_alice.len(), 2, "payment and the genesis entry");
    assert_eq!(of_alice[0].get_signature(), tx.get_signature());
    let of_bob = ledger.get_account_transactions(&bob).await.unwrap();
    assert_eq!(of_bob.len(), 1);
}

#[tokio::test]
async fn test_duplicate_transaction_rejected() {
    let dir = TempDir::new("spos-state").unwrap();
    let ledger = open_ledger(&dir);

    let forger = KeyPair::new();
    let alice = KeyPair::new();
    let alice_address = address_of(&alice);
    let bob = address_of(&KeyPair::new());

    ledger
        .process_block(&genesis_block(&forger, &alice_address, 1_000))
        .await
        .unwrap();

    let tx = payment(&alice, &bob, 100, 10, 1_000);
    ledger
        .process_block(&test_block(&forger, 2, vec![tx.clone()]))
        .await
        .unwrap();

    let result = ledger.process_block(&test_block(&forger, 3, vec![tx])).await;
    assert!(matches!(result, Err(LedgerError::DuplicateTransaction(_))));
    // the failed block left no trace
    assert_eq!(ledger.get_state_height().await.unwrap(), 2);
    assert_eq!(ledger.get_balance(&bob).await.unwrap(), 100);
}

#[tokio::test]
async fn test_negative_balance_rejected() {
    let dir = TempDir::new("spos-state").unwrap();
    let ledger = open_ledger(&dir);

    let forger = KeyPair::new();
    let alice = KeyPair::new();
    let alice_address = address_of(&alice);
    let bob = address_of(&KeyPair::new());

    ledger
        .process_block(&genesis_block(&forger, &alice_address, 50))
        .await
        .unwrap();

    let first = payment(&alice, &bob, 40, 5, 1_000);
    let second = payment(&alice, &bob, 30, 5, 1_001);
    let result = ledger
        .process_block(&test_block(&forger, 2, vec![first, second]))
        .await;

    assert!(matches!(result, Err(LedgerError::NegativeBalance(_, -30))));
    assert_eq!(ledger.get_state_height().await.unwrap(), 1);
    assert_eq!(ledger.get_balance(&alice_address).await.unwrap(), 50);
    assert_eq!(ledger.get_balance(&bob).await.unwrap(), 0);
}

// Full dump of everything the store tracks, for exact-restore checks
async fn capture_state<S: Storage>(
    storage: &S,
) -> (Height, HashMap<Address, (Height, Vec<(Height, VersionedBalance)>)>) {
    let height = storage.get_state_height().await.unwrap();
    let mut accounts = HashMap::new();
    for address in storage.get_registered_addresses().await.unwrap() {
        let last = storage.get_last_state_height(&address).await.unwrap().unwrap();
        let mut rows = Vec::new();
        let mut current = last;
        while current > 0 {
            let row = storage
                .get_balance_version(&address, current)
                .await
                .unwrap()
                .unwrap();
            let previous = row.get_previous_height();
            rows.push((current, row));
            current = previous;
        }
        accounts.insert(address, (last, rows));
    }
    (height, accounts)
}

#[tokio::test]
async fn test_rollback_restores_exact_state() {
    let dir = TempDir::new("spos-state").unwrap();
    let ledger = open_ledger(&dir);

    let forger = KeyPair::new();
    let alice = KeyPair::new();
    let alice_address = address_of(&alice);
    let bob = address_of(&KeyPair::new());

    ledger
        .process_block(&genesis_block(&forger, &alice_address, 1_000))
        .await
        .unwrap();

    let before = capture_state(&*ledger.get_storage().read().await).await;

    let tx = payment(&alice, &bob, 100, 10, 1_000);
    ledger
        .process_block(&test_block(&forger, 2, vec![tx.clone()]))
        .await
        .unwrap();
    assert_eq!(ledger.get_state_height().await.unwrap(), 2);

    ledger.rollback_to(1).await.unwrap();

    assert_eq!(ledger.get_state_height().await.unwrap(), 1);
    assert_eq!(ledger.get_balance(&alice_address).await.unwrap(), 1_000);
    assert_eq!(ledger.get_balance(&bob).await.unwrap(), 0);
    assert_eq!(ledger.is_included(tx.get_signature()).await.unwrap(), None);

    let after = capture_state(&*ledger.get_storage().read().await).await;
    assert_eq!(before, after, "rollback must restore the exact prior state");

    // rolling back to a height at or above the current one is a no-op
    ledger.rollback_to(5).await.unwrap();
    assert_eq!(ledger.get_state_height().await.unwrap(), 1);
}

#[tokio::test]
async fn test_rollback_to_empty_chain() {
    let dir = TempDir::new("spos-state").unwrap();
    let ledger = open_ledger(&dir);

    let forger = KeyPair::new();
    let alice_address = address_of(&KeyPair::new());

    ledger
        .process_block(&genesis_block(&forger, &alice_address, 1_000))
        .await
        .unwrap();
    ledger.rollback_to(0).await.unwrap();

    assert_eq!(ledger.get_state_height().await.unwrap(), 0);
    assert_eq!(ledger.get_balance(&alice_address).await.unwrap(), 0);
    let storage = ledger.get_storage().read().await;
    assert!(storage.get_registered_addresses().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_confirmation_window() {
    let dir = TempDir::new("spos-state").unwrap();
    let ledger = open_ledger(&dir);

    let forger = KeyPair::new();
    let alice = KeyPair::new();
    let alice_address = address_of(&alice);
    let bob = address_of(&KeyPair::new());

    ledger
        .process_block(&genesis_block(&forger, &alice_address, 1_000))
        .await
        .unwrap();
    ledger
        .process_block(&test_block(&forger, 2, vec![payment(&alice, &bob, 100, 10, 1_000)]))
        .await
        .unwrap();
    for i in 0..5 {
        ledger
            .process_block(&test_block(&forger, 3 + i, vec![]))
            .await
            .unwrap();
    }
    assert_eq!(ledger.get_state_height().await.unwrap(), 7);

    assert_eq!(ledger.get_balance(&bob).await.unwrap(), 100);
    // the receiving row is 5 blocks deep, enough for 3 confirmations
    assert_eq!(
        ledger
            .get_balance_with_confirmations(&bob, 3, None)
            .await
            .unwrap(),
        100
    );
    // before the transfer the account held nothing
    assert_eq!(
        ledger
            .get_balance_with_confirmations(&bob, 10, None)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_json_dump_and_hash() {
    let dir = TempDir::new("spos-state").unwrap();
    let ledger = open_ledger(&dir);

    let forger = KeyPair::new();
    let alice = KeyPair::new();
    let alice_address = address_of(&alice);
    let bob = address_of(&KeyPair::new());

    assert_eq!(ledger.to_json().await.unwrap(), serde_json::json!({}));
    let empty_hash = ledger.ledger_hash().await.unwrap();

    ledger
        .process_block(&genesis_block(&forger, &alice_address, 1_000))
        .await
        .unwrap();

    let dump = ledger.to_json().await.unwrap();
    assert_eq!(dump[alice_address.as_str()], 1_000);
    assert_ne!(ledger.ledger_hash().await.unwrap(), empty_hash);

    // an account drained to zero disappears from the dump
    ledger
        .process_block(&test_block(&forger, 2, vec![payment(&alice, &bob, 990, 10, 1_000)]))
        .await
        .unwrap();
    let dump = ledger.to_json().await.unwrap();
    assert!(dump.get(alice_address.as_str()).is_none());
    assert_eq!(dump[bob.as_str()], 990);
}
