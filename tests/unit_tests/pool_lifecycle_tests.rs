// Wallet pool lease, eviction and shutdown behaviour under a paused clock

use crate::test_utils::TestUtils;
use hdwallet_keykeeper::services::wallet::{
    AdmitOutcome, HandleState, MockWalletFactory, PoolError,
};
use serde_json::json;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use uuid::Uuid;

/// Let watchers and the reaper run without moving the clock far
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_expired_wallet_becomes_absent() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::app_encrypted_mock().await;
    let u1 = Uuid::new_v4();

    let outcome = pool.admit(u1, Duration::from_secs(2), &blob).await.unwrap();
    assert_eq!(outcome, AdmitOutcome::Loaded);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        pool.derive_address(u1, &json!({})).await.unwrap().as_deref(),
        Some("addr1")
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(pool.derive_address(u1, &json!({})).await.unwrap(), None);
    assert!(!pool.contains(u1).await);
    assert_eq!(factory.unloads(), 1);

    // No second unload however long we wait
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(factory.unloads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shorter_ttl_does_not_shrink_lease() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::app_encrypted_mock().await;
    let u1 = Uuid::new_v4();

    let start = Instant::now();
    pool.admit(u1, Duration::from_secs(5), &blob).await.unwrap();
    let outcome = pool.admit(u1, Duration::from_secs(1), &blob).await.unwrap();

    assert_eq!(outcome, AdmitOutcome::Extended);
    assert_eq!(pool.deadline_of(u1).await, Some(start + Duration::from_secs(5)));
    assert_eq!(factory.constructions(), 1);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(pool.state_of(u1).await, Some(HandleState::Armed));

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!pool.contains(u1).await);
}

#[tokio::test(start_paused = true)]
async fn test_longer_ttl_extends_lease() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::app_encrypted_mock().await;
    let u1 = Uuid::new_v4();

    pool.admit(u1, Duration::from_secs(2), &blob).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let refreshed_at = Instant::now();
    pool.admit(u1, Duration::from_secs(10), &blob).await.unwrap();
    assert_eq!(
        pool.deadline_of(u1).await,
        Some(refreshed_at + Duration::from_secs(10))
    );

    // Past the original deadline the wallet is still served
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(
        pool.derive_address(u1, &json!({})).await.unwrap().as_deref(),
        Some("addr1")
    );
    assert_eq!(factory.unloads(), 0);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(!pool.contains(u1).await);
    assert_eq!(factory.unloads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admit_constructs_once() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::app_encrypted_mock().await;
    let u1 = Uuid::new_v4();

    let mut set = JoinSet::new();
    for _ in 0..16 {
        let pool = pool.clone();
        let blob = blob.clone();
        set.spawn(async move { pool.admit(u1, Duration::from_secs(60), &blob).await });
    }

    let mut loaded = 0;
    let mut extended = 0;
    while let Some(result) = set.join_next().await {
        match result.unwrap().unwrap() {
            AdmitOutcome::Loaded => loaded += 1,
            AdmitOutcome::Extended => extended += 1,
        }
    }

    assert_eq!(loaded, 1);
    assert_eq!(extended, 15);
    assert_eq!(factory.constructions(), 1);
    assert_eq!(pool.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_release_is_one_shot() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::app_encrypted_mock().await;
    let u1 = Uuid::new_v4();

    pool.admit(u1, Duration::from_secs(2), &blob).await.unwrap();
    assert_eq!(pool.release(u1).await, Some(u1));
    // A second trigger before teardown finishes has no further effect
    let _ = pool.release(u1).await;
    settle().await;

    assert!(!pool.contains(u1).await);
    assert_eq!(factory.unloads(), 1);

    // The timer that would have fired at 2s is gone with the unit
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(factory.unloads(), 1);
    assert_eq!(pool.release(u1).await, None);
}

#[tokio::test(start_paused = true)]
async fn test_release_many_skips_unloaded() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::app_encrypted_mock().await;
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
    let bystander = Uuid::new_v4();

    pool.admit(u1, Duration::from_secs(60), &blob).await.unwrap();
    pool.admit(bystander, Duration::from_secs(60), &blob).await.unwrap();
    assert_eq!(pool.len().await, 2);

    let released = pool.release_many(&[u1, u2]).await.unwrap();
    assert_eq!(released, 1);
    settle().await;

    assert_eq!(pool.len().await, 1);
    assert!(pool.contains(bystander).await);
    assert_eq!(factory.unloads(), 1);
}

#[tokio::test]
async fn test_sign_never_admitted_is_not_found() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let u3 = Uuid::new_v4();

    let result = pool.sign(u3, &json!({}), b"payload").await;
    assert!(matches!(result, Err(PoolError::WalletNotFound(id)) if id == u3));

    // Read accessors answer the same situation with an absent result
    assert_eq!(pool.derive_address(u3, &json!({})).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_sign_after_expiry_is_not_found() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::app_encrypted_mock().await;
    let u1 = Uuid::new_v4();

    pool.admit(u1, Duration::from_secs(1), &blob).await.unwrap();
    let (address, signature) = pool.sign(u1, &json!({}), b"payload").await.unwrap();
    assert_eq!(address, "addr1");
    assert_eq!(signature.len(), 32);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(matches!(
        pool.sign(u1, &json!({}), b"payload").await,
        Err(PoolError::WalletNotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unload_error_still_removes_entry() {
    let factory = MockWalletFactory::new("addr1");
    factory.fail_unload(true);
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::app_encrypted_mock().await;
    let u1 = Uuid::new_v4();

    pool.admit(u1, Duration::from_secs(1), &blob).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(!pool.contains(u1).await);
    assert_eq!(factory.unloads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_admit_rejects_tampered_ciphertext() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let mut blob = TestUtils::app_encrypted_mock().await;
    let last = blob.len() - 1;
    blob[last] ^= 0x01;

    let result = pool.admit(Uuid::new_v4(), Duration::from_secs(5), &blob).await;
    assert!(matches!(result, Err(PoolError::Decryption(_))));
    assert_eq!(factory.constructions(), 0);
    assert!(pool.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_admit_rejects_transit_encrypted_blob() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::transit_encrypted(
        hdwallet_keykeeper::services::wallet::mock::MOCK_PHRASE,
    )
    .await;

    let result = pool.admit(Uuid::new_v4(), Duration::from_secs(5), &blob).await;
    assert!(matches!(result, Err(PoolError::Decryption(_))));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_unloads_everything() {
    let factory = MockWalletFactory::new("addr1");
    let pool = TestUtils::pool(&factory);
    let blob = TestUtils::app_encrypted_mock().await;

    for _ in 0..5 {
        pool.admit(Uuid::new_v4(), Duration::from_secs(3600), &blob)
            .await
            .unwrap();
    }

    let started = Instant::now();
    pool.shutdown().await;

    assert!(pool.is_empty().await);
    assert_eq!(factory.unloads(), 5);
    assert!(pool.is_shutting_down());
    // Drained well inside the grace period
    assert!(started.elapsed() < TestUtils::settings().shutdown_grace);
}
