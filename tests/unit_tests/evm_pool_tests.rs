// EVM wallet units driven through the pool

use crate::test_utils::TestUtils;
use hdwallet_keykeeper::services::encryption::EncryptionBoundary;
use hdwallet_keykeeper::services::wallet::{
    EvmWalletFactory, PoolError, PoolSettings, WalletPool, WalletUnitError, WalletUnitFactory,
};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const DEV_PHRASE: &str = "test test test test test test test test test test test junk";
const DEV_ADDRESS_0: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const DEV_ADDRESS_1: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

fn evm_pool() -> (Arc<WalletPool>, Arc<EvmWalletFactory>) {
    let factory = Arc::new(EvmWalletFactory::new(Some(31337), 24).unwrap());
    let pool = Arc::new(WalletPool::new(
        factory.clone(),
        TestUtils::app_encryptor(),
        TestUtils::settings(),
    ));
    (pool, factory)
}

#[tokio::test]
async fn test_transit_to_sign_flow() {
    let (pool, factory) = evm_pool();
    let boundary =
        EncryptionBoundary::new(TestUtils::transit_encryptor(), TestUtils::app_encryptor());
    let wallet_uuid = Uuid::new_v4();

    let transit = TestUtils::transit_encrypted(DEV_PHRASE).await;
    let encrypted = boundary
        .encrypt_transit_mnemonic(factory.as_ref(), &transit)
        .await
        .unwrap();

    pool.admit(wallet_uuid, Duration::from_secs(60), &encrypted.encrypted_mnemonic)
        .await
        .unwrap();

    let params = json!({"account_index": 0, "internal_index": 0, "address_index": 1});
    let address = pool.load_account(wallet_uuid, &params).await.unwrap();
    assert_eq!(address.as_deref(), Some(DEV_ADDRESS_1));

    let (signer, signature) = pool.sign(wallet_uuid, &params, b"hello").await.unwrap();
    assert_eq!(signer, DEV_ADDRESS_1);
    assert_eq!(signature.len(), 65);

    pool.shutdown().await;
}

#[tokio::test]
async fn test_derive_through_pool() {
    let (pool, _) = evm_pool();
    let wallet_uuid = Uuid::new_v4();
    let blob = TestUtils::app_encrypted(DEV_PHRASE).await;

    pool.admit(wallet_uuid, Duration::from_secs(60), &blob)
        .await
        .unwrap();

    // Omitted indices default to zero
    let address = pool.derive_address(wallet_uuid, &json!({})).await.unwrap();
    assert_eq!(address.as_deref(), Some(DEV_ADDRESS_0));

    let range = json!({
        "account_index": 0,
        "internal_index": 0,
        "from_address_index": 0,
        "to_address_index": 1
    });
    let (count, accounts) = pool
        .derive_multiple(wallet_uuid, &range)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(accounts[0].address, DEV_ADDRESS_0);
    assert_eq!(accounts[1].address, DEV_ADDRESS_1);
    assert_eq!(accounts[1].parameters["address_index"], 1);
}

#[tokio::test]
async fn test_bad_parameters_surface_as_unit_error() {
    let (pool, _) = evm_pool();
    let wallet_uuid = Uuid::new_v4();
    let blob = TestUtils::app_encrypted(DEV_PHRASE).await;
    pool.admit(wallet_uuid, Duration::from_secs(60), &blob)
        .await
        .unwrap();

    let result = pool
        .derive_address(wallet_uuid, &json!({"account_index": "zero"}))
        .await;
    assert!(matches!(
        result,
        Err(PoolError::Unit(WalletUnitError::InvalidParameters(_)))
    ));

    // The wallet stays loaded after a rejected call
    assert!(pool.contains(wallet_uuid).await);
}

#[tokio::test]
async fn test_invalid_phrase_is_not_admitted() {
    let (pool, _) = evm_pool();
    let blob = TestUtils::app_encrypted("definitely not a mnemonic").await;

    let result = pool.admit(Uuid::new_v4(), Duration::from_secs(60), &blob).await;
    assert!(matches!(result, Err(PoolError::UnitConstruction(_))));
    assert!(pool.is_empty().await);
}

#[tokio::test]
async fn test_generated_mnemonic_round_trip() {
    let (pool, factory) = evm_pool();
    let boundary =
        EncryptionBoundary::new(TestUtils::transit_encryptor(), TestUtils::app_encryptor());

    let generated = boundary.generate_mnemonic(factory.as_ref()).await.unwrap();
    assert!(
        boundary
            .validate_mnemonic(factory.as_ref(), &generated.encrypted_mnemonic)
            .await
            .unwrap()
    );

    let wallet_uuid = Uuid::new_v4();
    pool.admit(wallet_uuid, Duration::from_secs(60), &generated.encrypted_mnemonic)
        .await
        .unwrap();

    let address = pool
        .derive_address(wallet_uuid, &json!({}))
        .await
        .unwrap()
        .unwrap();
    assert!(address.starts_with("0x"));
    assert_eq!(address.len(), 42);
    assert_eq!(factory.info().name, "evm");
}

#[tokio::test]
async fn test_derive_multiple_respects_call_timeout() {
    let factory = Arc::new(EvmWalletFactory::new(Some(31337), 24).unwrap());
    let pool = WalletPool::new(
        factory,
        TestUtils::app_encryptor(),
        PoolSettings {
            shutdown_grace: Duration::from_secs(5),
            unit_call_timeout: Some(Duration::from_millis(1)),
        },
    );
    let wallet_uuid = Uuid::new_v4();
    let blob = TestUtils::app_encrypted(DEV_PHRASE).await;

    // Seed stretching happens here, outside the per-call bound
    pool.admit(wallet_uuid, Duration::from_secs(60), &blob)
        .await
        .unwrap();

    let range = json!({"from_address_index": 0, "to_address_index": 999});
    let started = Instant::now();
    let result = pool.derive_multiple(wallet_uuid, &range).await;

    assert!(matches!(result, Err(PoolError::UnitTimeout(_))));
    assert!(started.elapsed() < Duration::from_millis(500));

    // The lock was released and the wallet is still usable
    assert!(pool.contains(wallet_uuid).await);

    pool.shutdown().await;
}
