use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Mints `<token>_<filename>` object names.
///
/// The token is the current Unix time in milliseconds, bumped past the
/// previously issued token so two uploads in the same millisecond never share
/// one within this process.
#[derive(Debug, Default)]
pub struct ObjectNameMinter {
    last_token: AtomicI64,
}

impl ObjectNameMinter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_token: AtomicI64::new(0),
        }
    }

    /// Object name for an already sanitized filename
    #[must_use]
    pub fn mint(&self, sanitized_filename: &str) -> String {
        let token = self.next_token(Utc::now().timestamp_millis());
        format!("{token}_{sanitized_filename}")
    }

    /// Strictly increasing token, at least `now_millis`
    pub fn next_token(&self, now_millis: i64) -> i64 {
        let previous = self
            .last_token
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_millis.max(last + 1))
            })
            .unwrap_or_else(|last| last);

        now_millis.max(previous + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_follows_clock() {
        let minter = ObjectNameMinter::new();
        assert_eq!(minter.next_token(1_000), 1_000);
        assert_eq!(minter.next_token(2_000), 2_000);
    }

    #[test]
    fn test_token_never_repeats() {
        let minter = ObjectNameMinter::new();
        assert_eq!(minter.next_token(1_000), 1_000);
        assert_eq!(minter.next_token(1_000), 1_001);
        // clock going backwards still yields a fresh token
        assert_eq!(minter.next_token(900), 1_002);
    }

    #[test]
    fn test_mint_format() {
        let minter = ObjectNameMinter::new();
        let name = minter.mint("a.txt");
        let (token, rest) = name.split_once('_').unwrap();
        assert_eq!(rest, "a.txt");
        assert!(token.parse::<i64>().unwrap() > 0);
    }
}
