// Encryption boundary tests against the mock factory

use crate::test_utils::TestUtils;
use hdwallet_keykeeper::services::encryption::boundary::mnemonic_hash;
use hdwallet_keykeeper::services::encryption::{EncryptionBoundary, Encryptor, MnemonicError};
use hdwallet_keykeeper::services::wallet::MockWalletFactory;
use hdwallet_keykeeper::services::wallet::mock::MOCK_PHRASE;

fn boundary() -> EncryptionBoundary {
    EncryptionBoundary::new(TestUtils::transit_encryptor(), TestUtils::app_encryptor())
}

#[tokio::test]
async fn test_round_trip_both_keys() {
    let boundary = boundary();

    let samples: [&[u8]; 4] = [b"", b"x", MOCK_PHRASE.as_bytes(), &[0, 255, 7, 0]];

    for plaintext in samples {
        for encryptor in [boundary.transit(), boundary.application()] {
            let ciphertext = encryptor.encrypt(plaintext).await.unwrap();
            let decrypted = encryptor.decrypt(&ciphertext).await.unwrap();
            assert_eq!(decrypted.as_slice(), plaintext);
        }
    }
}

#[tokio::test]
async fn test_keys_are_independent() {
    let boundary = boundary();
    let ciphertext = boundary.transit().encrypt(b"secret").await.unwrap();

    assert!(boundary.application().decrypt(&ciphertext).await.is_err());
}

#[tokio::test]
async fn test_generate_returns_hash_of_plaintext() {
    let boundary = boundary();
    let factory = MockWalletFactory::new("addr1");

    let generated = boundary.generate_mnemonic(&factory).await.unwrap();
    assert_eq!(generated.wallet_hash, mnemonic_hash(MOCK_PHRASE.as_bytes()));

    let plaintext = boundary
        .application()
        .decrypt(&generated.encrypted_mnemonic)
        .await
        .unwrap();
    assert_eq!(plaintext.as_slice(), MOCK_PHRASE.as_bytes());
}

#[tokio::test]
async fn test_generate_rejects_phrase_failing_validation() {
    let boundary = boundary();
    let factory = MockWalletFactory::new("addr1").with_generated_phrase("Not A Valid Phrase");

    assert!(matches!(
        boundary.generate_mnemonic(&factory).await,
        Err(MnemonicError::GeneratedInvalid)
    ));
}

#[tokio::test]
async fn test_transit_reencryption() {
    let boundary = boundary();
    let factory = MockWalletFactory::new("addr1");
    let transit = TestUtils::transit_encrypted(MOCK_PHRASE).await;

    let encrypted = boundary
        .encrypt_transit_mnemonic(&factory, &transit)
        .await
        .unwrap();

    assert_eq!(encrypted.wallet_hash, mnemonic_hash(MOCK_PHRASE.as_bytes()));
    assert!(
        boundary
            .validate_mnemonic(&factory, &encrypted.encrypted_mnemonic)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_transit_reencryption_rejects_invalid_phrase() {
    let boundary = boundary();
    let factory = MockWalletFactory::new("addr1");
    let transit = TestUtils::transit_encrypted("too short").await;

    assert!(matches!(
        boundary.encrypt_transit_mnemonic(&factory, &transit).await,
        Err(MnemonicError::InvalidMnemonic)
    ));
}

#[tokio::test]
async fn test_transit_reencryption_rejects_application_ciphertext() {
    let boundary = boundary();
    let factory = MockWalletFactory::new("addr1");
    let wrong_key = TestUtils::app_encrypted_mock().await;

    assert!(matches!(
        boundary.encrypt_transit_mnemonic(&factory, &wrong_key).await,
        Err(MnemonicError::TransitDecrypt(_))
    ));
}

#[tokio::test]
async fn test_validate_reports_false_for_bad_phrase() {
    let boundary = boundary();
    let factory = MockWalletFactory::new("addr1");
    let blob = TestUtils::app_encrypted("one two three").await;

    assert!(!boundary.validate_mnemonic(&factory, &blob).await.unwrap());
}
