use rand::Rng;

/// Length of every generated short id.
pub const SHORT_ID_LEN: usize = 6;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random alphanumeric string of the given length.
pub fn random_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// A fresh short id of the standard length.
///
/// Nothing here checks the result against ids already in use; a repeat
/// simply overwrites the older record in the store.
pub fn short_id() -> String {
    random_id(SHORT_ID_LEN)
}
