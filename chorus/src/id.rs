use nanoid::nanoid;

/// Alphabet for opaque identifiers (no ambiguous glyphs).
const OPAQUE_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// Length of a token identifier (`jti` claim).
const TOKEN_ID_LENGTH: usize = 24;
/// Length of a password salt.
const SALT_LENGTH: usize = 16;

/// Generates a fresh token identifier.
pub fn generate_token_id() -> String {
    nanoid!(TOKEN_ID_LENGTH, OPAQUE_ID_ALPHABET)
}

/// Generates a fresh password salt.
pub fn generate_salt() -> String {
    nanoid!(SALT_LENGTH, OPAQUE_ID_ALPHABET)
}

/// Zero-padded form of a numeric id so lexicographic order matches numeric order.
pub fn padded(id: u64) -> String {
    format!("{id:020}")
}
