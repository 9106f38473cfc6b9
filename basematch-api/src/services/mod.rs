pub mod matching;
pub mod notifications;
pub mod profiles;
pub mod stakes;
pub mod sweeper;
pub mod verification;
pub mod wallet;

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Hex-encoded random bytes, for tokens and nonces.
pub fn random_hex(len: usize) -> String {
    use rand::RngCore;

    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
