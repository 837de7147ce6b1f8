//! Scanner-burst detection from keystroke timing.
//!
//! Keyboard-emulating scanners type a whole code in a few milliseconds per character and
//! finish with a commit key. A gap longer than the configured threshold between two
//! keystrokes means a human is typing, so the buffer is dropped.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

use floorscan_core::EngineConfig;

use crate::token::ScanToken;

/// A key as delivered by the terminal's keyboard layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// The terminator the scanner appends (Enter).
    Commit,
    /// Anything else (shift, arrows, ...). Ignored, but it still counts as a keystroke.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub at: DateTime<Utc>,
}

impl KeyEvent {
    pub fn new(key: Key, at: DateTime<Utc>) -> Self {
        Self { key, at }
    }
}

#[derive(Debug, Clone)]
pub struct ScanInputClassifier {
    max_gap: Duration,
    min_len: usize,
    buffer: String,
    last_key_at: Option<DateTime<Utc>>,
}

impl ScanInputClassifier {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_gap: config.scan_gap(),
            min_len: config.min_scan_len,
            buffer: String::new(),
            last_key_at: None,
        }
    }

    /// Current partial burst.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Feed one key event; returns a token when a burst is committed.
    pub fn push(&mut self, event: KeyEvent) -> Option<ScanToken> {
        if let Some(last) = self.last_key_at {
            if event.at - last > self.max_gap && !self.buffer.is_empty() {
                trace!(discarded = self.buffer.len(), "keystroke gap exceeded; resetting buffer");
                self.buffer.clear();
            }
        }
        self.last_key_at = Some(event.at);

        match event.key {
            Key::Char(c) if !c.is_control() => {
                self.buffer.push(c);
                None
            }
            Key::Char(_) | Key::Other => None,
            Key::Commit => {
                let burst = core::mem::take(&mut self.buffer);
                if burst.chars().count() >= self.min_len {
                    debug!(len = burst.len(), "scanner burst committed");
                    Some(ScanToken::scanned(burst, event.at))
                } else {
                    if !burst.is_empty() {
                        trace!(len = burst.len(), "burst below minimum length; discarded as noise");
                    }
                    None
                }
            }
        }
    }

    /// Feed a whole key sequence, collecting every emitted token.
    pub fn feed(&mut self, events: impl IntoIterator<Item = KeyEvent>) -> Vec<ScanToken> {
        events.into_iter().filter_map(|ev| self.push(ev)).collect()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_key_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    /// Types `text` then Enter with a fixed gap between every keystroke.
    fn burst(text: &str, start: DateTime<Utc>, gap_ms: i64) -> Vec<KeyEvent> {
        let mut at = start;
        let mut events = Vec::new();
        for c in text.chars() {
            events.push(KeyEvent::new(Key::Char(c), at));
            at += Duration::milliseconds(gap_ms);
        }
        events.push(KeyEvent::new(Key::Commit, at));
        events
    }

    fn classifier() -> ScanInputClassifier {
        ScanInputClassifier::new(&EngineConfig::default())
    }

    #[test]
    fn fast_burst_emits_one_token() {
        let mut c = classifier();
        let tokens = c.feed(burst("A-01", t0(), 10));
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw, "A-01");
        assert!(tokens[0].is_scanner());
        assert!(c.buffer().is_empty());
    }

    #[test]
    fn reset_forgets_partial_burst() {
        let mut c = classifier();
        let mut events = burst("SKU1", t0(), 5);
        let commit = events.pop().unwrap();
        assert!(c.feed(events).is_empty());
        assert_eq!(c.buffer(), "SKU1");

        c.reset();
        assert!(c.buffer().is_empty());
        assert!(c.push(commit).is_none());
    }

    #[test]
    fn slow_typing_is_dropped() {
        let mut c = classifier();
        let tokens = c.feed(burst("SKU1", t0(), 250));
        assert!(tokens.is_empty());
    }

    #[test]
    fn short_bursts_are_noise() {
        let mut c = classifier();
        assert!(c.feed(burst("AB", t0(), 5)).is_empty());
        // The noise is cleared, so the next burst starts fresh.
        let tokens = c.feed(burst("ABC", t0() + Duration::seconds(1), 5));
        assert_eq!(tokens[0].raw, "ABC");
    }

    #[test]
    fn gap_resets_then_new_burst_is_kept() {
        let mut c = classifier();
        let mut events = vec![
            KeyEvent::new(Key::Char('x'), t0()),
            KeyEvent::new(Key::Char('y'), t0() + Duration::milliseconds(5)),
        ];
        events.extend(burst("LOT9", t0() + Duration::milliseconds(500), 8));
        let tokens = c.feed(events);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw, "LOT9");
    }

    #[test]
    fn slow_commit_key_discards_burst() {
        let mut c = classifier();
        let mut events = burst("SKU1", t0(), 5);
        let commit = events.pop().unwrap();
        events.push(KeyEvent::new(Key::Commit, commit.at + Duration::milliseconds(400)));
        assert!(c.feed(events).is_empty());
    }

    #[test]
    fn gap_equal_to_threshold_is_still_a_burst() {
        let mut c = classifier();
        let tokens = c.feed(burst("B-07", t0(), 100));
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn threshold_is_configurable() {
        let mut c = ScanInputClassifier::new(&EngineConfig::default().with_scan_gap_ms(300));
        let tokens = c.feed(burst("SKU1", t0(), 250));
        assert_eq!(tokens[0].raw, "SKU1");
    }

    #[test]
    fn modifier_keys_are_ignored() {
        let mut c = classifier();
        let events = vec![
            KeyEvent::new(Key::Other, t0()),
            KeyEvent::new(Key::Char('A'), t0() + Duration::milliseconds(2)),
            KeyEvent::new(Key::Other, t0() + Duration::milliseconds(4)),
            KeyEvent::new(Key::Char('-'), t0() + Duration::milliseconds(6)),
            KeyEvent::new(Key::Char('1'), t0() + Duration::milliseconds(8)),
            KeyEvent::new(Key::Commit, t0() + Duration::milliseconds(10)),
        ];
        assert_eq!(c.feed(events)[0].raw, "A-1");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any burst with sub-threshold gaps and enough characters is emitted
        /// exactly once, unchanged.
        #[test]
        fn fast_bursts_round_trip(
            text in "[A-Za-z0-9()|-]{3,40}",
            gaps in prop::collection::vec(0i64..100, 41)
        ) {
            let mut c = classifier();
            let mut at = t0();
            let mut tokens = Vec::new();
            for (i, ch) in text.chars().enumerate() {
                tokens.extend(c.push(KeyEvent::new(Key::Char(ch), at)));
                at += Duration::milliseconds(gaps[i]);
            }
            tokens.extend(c.push(KeyEvent::new(Key::Commit, at)));

            prop_assert_eq!(tokens.len(), 1);
            prop_assert_eq!(&tokens[0].raw, &text);
        }
    }
}
