//! Randomized outbound client identities.
//!
//! Every fetch attempt picks a fresh identity so consecutive requests do not
//! share a fingerprint. Picks are independent and uniform; an identity may
//! repeat on the next call.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

/// Browser fingerprint sent with one outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
}

const IDENTITIES: &[Identity] = &[
    Identity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        accept_language: "en-US,en;q=0.9",
    },
    Identity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        accept_language: "en-US,en;q=0.8",
    },
    Identity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        accept_language: "en-US,en;q=0.5",
    },
    Identity {
        user_agent: "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
        accept_language: "en-GB,en;q=0.7",
    },
    Identity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
        accept_language: "en-US,en;q=0.9",
    },
    Identity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.80",
        accept_language: "en-US,en;q=0.9,de;q=0.6",
    },
    Identity {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
        accept_language: "en-US,en;q=0.9",
    },
];

/// Returns a uniformly random identity from the pool.
pub fn next_identity() -> Identity {
    // The pool is a non-empty constant, so `choose` only returns None for an empty slice.
    *IDENTITIES
        .choose(&mut rand::thread_rng())
        .unwrap_or(&IDENTITIES[0])
}

/// Inclusive range of milliseconds to pause before each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingWindow {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl PacingWindow {
    pub const DISABLED: PacingWindow = PacingWindow { min_ms: 0, max_ms: 0 };

    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }
}

impl Default for PacingWindow {
    fn default() -> Self {
        Self::new(200, 800)
    }
}

/// Random pause drawn from `window`, or `None` when pacing is disabled.
pub fn pacing_delay(window: &PacingWindow) -> Option<Duration> {
    if window.max_ms == 0 {
        return None;
    }
    let ms = rand::thread_rng().gen_range(window.min_ms..=window.max_ms);
    Some(Duration::from_millis(ms))
}
