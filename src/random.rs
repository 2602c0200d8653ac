use rand::Rng;

/// Length of the random part of a fallback cache name.
pub const RANDOM_TOKEN_LEN: usize = 16;

// Lowercase only, so names stay distinct on case-insensitive filesystems.
const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Source of random tokens for names that cannot be derived from content.
pub trait TokenSource: Send + Sync {
    fn token(&self, len: usize) -> String;
}

/// Draws tokens from [`rand::thread_rng`], a cryptographically secure
/// generator reseeded from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngTokens;

impl TokenSource for ThreadRngTokens {
    fn token(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| {
                TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char
            })
            .collect()
    }
}
