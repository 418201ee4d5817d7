use tempdir::TempDir;

use spos_common::crypto::KeyPair;

use crate::core::{
    ledger::Ledger,
    storage::{BalanceProvider, SledStorage, StateProvider, Storage},
    tests::{address_of, genesis_block, open_ledger, payment, test_block},
};

#[tokio::test]
async fn test_fresh_substrate_versions() {
    let dir = TempDir::new("spos-state").unwrap();
    let ledger = open_ledger(&dir);

    let storage = ledger.get_storage().read().await;
    assert_eq!(storage.store_version().await.unwrap(), 0);
    assert_eq!(storage.get_state_height().await.unwrap(), 0);
}

#[tokio::test]
async fn test_version_increments_per_commit() {
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
    assert_eq!(
        ledger.get_storage().read().await.store_version().await.unwrap(),
        1
    );

    ledger
        .process_block(&test_block(&forger, 2, vec![payment(&alice, &bob, 100, 10, 1_000)]))
        .await
        .unwrap();
    assert_eq!(
        ledger.get_storage().read().await.store_version().await.unwrap(),
        2
    );

    ledger.rollback_to(1).await.unwrap();
    assert_eq!(
        ledger.get_storage().read().await.store_version().await.unwrap(),
        3
    );
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new("spos-state").unwrap();
    let path = dir.path().join("db");

    let forger = KeyPair::new();
    let alice = KeyPair::new();
    let alice_address = address_of(&alice);
    let bob = address_of(&KeyPair::new());
    let tx = payment(&alice, &bob, 100, 10, 1_000);

    {
        let ledger = Ledger::new(SledStorage::open(&path).unwrap());
        ledger
            .process_block(&genesis_block(&forger, &alice_address, 1_000))
            .await
            .unwrap();
        ledger
            .process_block(&test_block(&forger, 2, vec![tx.clone()]))
            .await
            .unwrap();
    }

    let ledger = Ledger::new(SledStorage::open(&path).unwrap());
    assert_eq!(ledger.get_state_height().await.unwrap(), 2);
    assert_eq!(ledger.get_balance(&alice_address).await.unwrap(), 890);
    assert_eq!(ledger.get_balance(&bob).await.unwrap(), 100);
    assert_eq!(ledger.is_included(tx.get_signature()).await.unwrap(), Some(2));
    assert_eq!(
        ledger.get_storage().read().await.store_version().await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_failed_block_leaves_no_buffered_writes() {
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

    // overdraft, rejected before commit
    let result = ledger
        .process_block(&test_block(&forger, 2, vec![payment(&alice, &bob, 100, 10, 1_000)]))
        .await;
    assert!(result.is_err());

    // the version did not move and a follow-up block applies cleanly
    assert_eq!(
        ledger.get_storage().read().await.store_version().await.unwrap(),
        1
    );
    ledger
        .process_block(&test_block(&forger, 2, vec![payment(&alice, &bob, 30, 10, 1_000)]))
        .await
        .unwrap();
    assert_eq!(ledger.get_balance(&bob).await.unwrap(), 30);
    assert_eq!(ledger.get_balance(&alice_address).await.unwrap(), 10);
}

#[tokio::test]
async fn test_registered_addresses_track_rows() {
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

    let storage = ledger.get_storage().read().await;
    let mut addresses = storage.get_registered_addresses().await.unwrap();
    addresses.sort();

    let mut expected = vec![alice_address, bob, address_of(&forger)];
    expected.sort();
    assert_eq!(addresses, expected);
}
