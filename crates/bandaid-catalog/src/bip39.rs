use std::collections::HashSet;
use std::path::Path;

use bandaid_core::{Span, ThreatDetection, ThreatKind};

use crate::error::CatalogError;

/// BIP39 English wordlist, loaded once at startup. Missing the wordlist
/// file disables seed-phrase detection only — this is
/// the catalog's single recoverable runtime failure and is reported once as
/// a warning, never as a fatal error.
pub struct Bip39Wordlist {
    words: HashSet<String>,
}

impl Bip39Wordlist {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path_ref = path.as_ref();
        let contents = std::fs::read_to_string(path_ref).map_err(|source| CatalogError::WordlistRead {
            path: path_ref.display().to_string(),
            source,
        })?;
        let words: HashSet<String> = contents
            .lines()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        if words.is_empty() {
            return Err(CatalogError::WordlistEmpty {
                path: path_ref.display().to_string(),
            });
        }
        Ok(Self { words })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

const WINDOW_LENGTHS: [usize; 3] = [12, 18, 24];

/// Slides windows of length 12/18/24 over whitespace-tokenized `text`,
/// scoring an exact all-words-in-wordlist window at 0.98 confidence and a
/// 12-word window with one or two mismatches at 0.75. Returns one
/// detection per qualifying, non-overlapping window, highest confidence
/// first.
pub fn detect_seed_phrase(text: &str, wordlist: &Bip39Wordlist) -> Vec<ThreatDetection> {
    let tokens: Vec<(usize, usize, &str)> = token_spans(text);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut detections = Vec::new();
    let mut consumed_until = 0usize;

    for &window_len in &WINDOW_LENGTHS {
        if tokens.len() < window_len {
            continue;
        }
        let mut i = 0;
        while i + window_len <= tokens.len() {
            let window = &tokens[i..i + window_len];
            if window[0].0 < consumed_until {
                i += 1;
                continue;
            }
            let mismatches = window
                .iter()
                .filter(|(_, _, w)| !wordlist.contains(&w.to_lowercase()))
                .count();

            let confidence = if mismatches == 0 {
                Some(0.98)
            } else if window_len == 12 && mismatches <= 2 {
                Some(0.75)
            } else {
                None
            };

            if let Some(confidence) = confidence {
                let start = window.first().unwrap().0;
                let end = window.last().unwrap().1;
                detections.push(ThreatDetection::new(
                    ThreatKind::SeedPhrase,
                    confidence,
                    Span::new(start, end),
                ));
                consumed_until = end;
                i += window_len;
            } else {
                i += 1;
            }
        }
    }

    detections
}

/// Tokenizes on ASCII whitespace, tracking each token's byte span so
/// detections can report a `matched_span` into the original text.
fn token_spans(text: &str) -> Vec<(usize, usize, &str)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let bytes = text.as_bytes();
    for (i, ch) in text.char_indices() {
        let is_space = (ch as u32) < 128 && (bytes[i] as char).is_whitespace();
        match (is_space, start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                spans.push((s, i, &text[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len(), &text[s..]));
    }
    spans
        .into_iter()
        .filter(|(_, _, w)| w.chars().all(|c| c.is_alphabetic()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wordlist() -> Bip39Wordlist {
        Bip39Wordlist {
            words: ["abandon", "about", "zoo"].iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn detects_exact_twelve_word_seed() {
        let text = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let detections = detect_seed_phrase(text, &wordlist());
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].confidence, 0.98);
        assert_eq!(detections[0].kind, ThreatKind::SeedPhrase);
    }

    #[test]
    fn ignores_unrelated_prose() {
        let text = "What is the weather like in Paris today my friend";
        assert!(detect_seed_phrase(text, &wordlist()).is_empty());
    }
}
