//! Derivation Tests
//!
//! 1. **Golden Tests** - Published vectors (BIP39 seed, SLIP-0010, Solana address)
//! 2. **Determinism** - Same mnemonic + index always yields the same address
//! 3. **Distinctness** - Different indices yield different addresses
//! 4. **Error Handling** - Corrupt mnemonics and bad paths fail with the right variant

// Well-known test mnemonic (BIP39 test vector #0)
const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

// Alternative mnemonic for isolation tests
const ALT_MNEMONIC: &str =
    "legal winner thank year wave sausage worth useful legal winner thank yellow";

// ============================================================================
// 1. GOLDEN TESTS
// ============================================================================

mod golden_tests {
    use super::*;
    use beeseed::seed::derive_seed_from_phrase;
    use beeseed::slip10::derive_path_from_bytes;
    use beeseed::{derive_address, DerivationPath, Keypair};

    /// m/44'/501'/0'/0' of the test mnemonic, as shown by Solana wallets
    #[test]
    fn golden_solana_address_index_zero() {
        let seed = derive_seed_from_phrase(TEST_MNEMONIC, "").expect("seed");
        let (keypair, address) = derive_address(&seed, 0).expect("derive");

        assert_eq!(address.to_string(), "HAgk14JpMQLgt6rVgv7cBQFJWFto5Dqxi472uT3DKpqk");
        assert_eq!(&keypair.public_key(), address.public_key());
        assert_eq!(bs58::encode(keypair.public_key()).into_string(), address.to_string());
    }

    #[test]
    fn golden_seed_from_test_mnemonic() {
        let seed = derive_seed_from_phrase(TEST_MNEMONIC, "").expect("seed");
        assert_eq!(
            hex::encode(&seed.as_bytes()[..16]),
            "5eb00bbddcf069084889a8ab91555681"
        );
    }

    /// SLIP-0010 ed25519 vector 1, chain m/0H: public key 008c8a13...
    #[test]
    fn golden_slip10_vector1_child_public_key() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let path: DerivationPath = "m/0'".parse().unwrap();
        let node = derive_path_from_bytes(&seed, &path).expect("derive");
        let keypair = Keypair::from_secret(node.secret_key());
        assert_eq!(
            hex::encode(keypair.public_key()),
            "8c8a13df77a28f3445213a0f432fde644acaa215fc72dcdf300d5efaa85d350c"
        );
    }
}

// ============================================================================
// 2. DETERMINISM TESTS
// ============================================================================

mod determinism_tests {
    use super::*;
    use beeseed::seed::derive_seed_from_phrase;
    use beeseed::{derive_address, derive_seed, Mnemonic};

    #[test]
    fn deterministic_across_calls() {
        for index in [0u32, 1, 17, 1_000_000] {
            let results: Vec<String> = (0..3)
                .map(|_| {
                    let seed = derive_seed_from_phrase(TEST_MNEMONIC, "").expect("seed");
                    derive_address(&seed, index).expect("derive").1.to_string()
                })
                .collect();
            assert!(results.windows(2).all(|w| w[0] == w[1]), "index {index} not deterministic");
        }
    }

    #[test]
    fn generated_mnemonic_roundtrips_through_text() {
        let original = Mnemonic::generate().expect("generate");
        let reparsed = Mnemonic::parse(original.phrase()).expect("parse");

        let a = derive_address(&derive_seed(&original, "").unwrap(), 3).unwrap().1;
        let b = derive_address(&derive_seed(&reparsed, "").unwrap(), 3).unwrap().1;
        assert_eq!(a, b);
    }

    #[test]
    fn passphrase_composed_and_decomposed_agree() {
        let composed = derive_seed_from_phrase(TEST_MNEMONIC, "na\u{ef}ve").unwrap();
        let decomposed = derive_seed_from_phrase(TEST_MNEMONIC, "nai\u{308}ve").unwrap();
        assert_eq!(
            derive_address(&composed, 0).unwrap().1,
            derive_address(&decomposed, 0).unwrap().1
        );
    }

    #[test]
    fn different_mnemonics_differ() {
        let a = derive_address(&derive_seed_from_phrase(TEST_MNEMONIC, "").unwrap(), 0).unwrap().1;
        let b = derive_address(&derive_seed_from_phrase(ALT_MNEMONIC, "").unwrap(), 0).unwrap().1;
        assert_ne!(a, b);
    }
}

// ============================================================================
// 3. DISTINCTNESS TESTS
// ============================================================================

mod distinctness_tests {
    use super::*;
    use beeseed::seed::derive_seed_from_phrase;
    use beeseed::derive_address;
    use std::collections::HashSet;

    #[test]
    fn distinct_indices_distinct_addresses() {
        let seed = derive_seed_from_phrase(TEST_MNEMONIC, "").expect("seed");
        let addresses: HashSet<String> = (0..256)
            .map(|i| derive_address(&seed, i).expect("derive").1.to_string())
            .collect();
        assert_eq!(addresses.len(), 256);
    }

    #[test]
    fn highest_valid_index_derives() {
        let seed = derive_seed_from_phrase(TEST_MNEMONIC, "").expect("seed");
        let (_, top) = derive_address(&seed, beeseed::HARDENED_OFFSET - 1).expect("derive");
        let (_, zero) = derive_address(&seed, 0).expect("derive");
        assert_ne!(top, zero);
    }
}

// ============================================================================
// 4. ERROR HANDLING TESTS
// ============================================================================

mod error_tests {
    use super::*;
    use beeseed::seed::derive_seed_from_phrase;
    use beeseed::{derive_address, DerivationPath, Seed, VaultError};

    #[test]
    fn corrupt_checksum_produces_no_seed() {
        let corrupt = TEST_MNEMONIC.replace("about", "abandon");
        let result = derive_seed_from_phrase(&corrupt, "");
        assert!(matches!(result, Err(VaultError::CorruptSecret(_))));
    }

    #[test]
    fn wrong_checksum_word_rejected() {
        // same entropy bits as ALT_MNEMONIC, different checksum nibble
        let tampered = ALT_MNEMONIC.replace("yellow", "zoo");
        let result = derive_seed_from_phrase(&tampered, "");
        assert!(matches!(result, Err(VaultError::CorruptSecret(_))));
    }

    #[test]
    fn index_at_hardened_boundary_is_invalid_path() {
        let seed = Seed::from_bytes([9u8; 64]);
        let result = derive_address(&seed, beeseed::HARDENED_OFFSET);
        assert!(matches!(result, Err(VaultError::InvalidDerivationPath(_))));
    }

    #[test]
    fn non_hardened_path_rejected() {
        let result = "m/44'/501'/0'/0".parse::<DerivationPath>();
        assert!(matches!(result, Err(VaultError::InvalidDerivationPath(_))));
    }
}
