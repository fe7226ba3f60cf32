use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::id::generate_salt;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2_sha256";

/// Salt for the derivation run when there is no stored hash to check.
const ABSENT_SALT: &str = "chorus-absent-credential";

/// Derives and checks credential hashes (PBKDF2-HMAC-SHA256).
///
/// Encoded form: `pbkdf2_sha256$<iterations>$<salt>$<base64 key>`.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn hash(&self, password: &str) -> String {
        let salt = generate_salt();
        let key = pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), self.iterations);
        format!("{SCHEME}${}${salt}${}", self.iterations, STANDARD.encode(key))
    }

    /// Checks `password` against an encoded hash. Malformed hashes never verify.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let mut parts = encoded.split('$');
        let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let Ok(iterations) = iterations.parse::<u32>() else {
            return false;
        };
        let Ok(expected) = STANDARD.decode(expected) else {
            return false;
        };
        let derived = pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), iterations.max(1));
        constant_time_eq(&derived, &expected)
    }

    /// Spends the same derivation work as `verify` for an account that does
    /// not exist. Always `false`.
    pub fn verify_absent(&self, password: &str) -> bool {
        let derived = pbkdf2_sha256(password.as_bytes(), ABSENT_SALT.as_bytes(), self.iterations);
        let expected = vec![0u8; derived.len()];
        std::hint::black_box(constant_time_eq(&derived, &expected));
        false
    }
}

/// Single-block PBKDF2 (RFC 8018) with HMAC-SHA256; the output is 32 bytes.
fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
    let prf = HmacSha256::new_from_slice(password).expect("HMAC can take key of any size");

    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut block = mac.finalize().into_bytes();
    let mut output = block.to_vec();

    for _ in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&block);
        block = mac.finalize().into_bytes();
        for (out, byte) in output.iter_mut().zip(block.iter()) {
            *out ^= byte;
        }
    }

    output
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    left.len() == right.len() && left.iter().zip(right).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}
