use std::sync::OnceLock;

use bandaid_core::ThreatKind;
use regex::Regex;

use crate::bip39::Bip39Wordlist;

macro_rules! regex_once {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).unwrap())
        }
    };
}

regex_once!(email_re, r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b");
// The `regex` crate has no lookaround support, so plain word boundaries
// stand in for the original's negative lookbehind/lookahead digit guards.
regex_once!(phone_re_local, r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b");
regex_once!(phone_re_paren, r"\(\d{3}\)\s*\d{3}[-.]?\d{4}");
regex_once!(phone_re_intl, r"\+\d{1,3}\s?\d{1,14}\b");
regex_once!(ssn_re, r"\b\d{3}[-\s]\d{2}[-\s]\d{4}\b");
regex_once!(cc_re, r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b");
regex_once!(
    street_re,
    r"(?i)\b\d+\s+[A-Z][a-z]+(\s+[A-Z][a-z]+)*\s+(St|Street|Ave|Avenue|Rd|Road|Blvd|Boulevard|Dr|Drive|Ln|Lane|Ct|Court|Way|Pl|Place|Pkwy|Parkway)\.?(\s+(Apt|Suite|Unit|#)\s*[A-Za-z0-9]+)?\b"
);
regex_once!(zip_re, r"\b\d{5}(-\d{4})?\b");
regex_once!(eth_address_re, r"\b0x[a-fA-F0-9]{40}\b");
regex_once!(btc_legacy_re, r"\b[13][a-km-zA-HJ-NP-Z1-9]{25,34}\b");
regex_once!(btc_segwit_re, r"\bbc1[a-z0-9]{39,59}\b");
regex_once!(
    pem_re,
    r"(?s)-----BEGIN (\w+ )?PRIVATE KEY-----.+?-----END (\w+ )?PRIVATE KEY-----"
);
regex_once!(hex64_re, r"\b(0x)?[a-fA-F0-9]{64}\b");
regex_once!(wif_re, r"\b[5KL][1-9A-HJ-NP-Za-km-z]{50,51}\b");
regex_once!(
    contextual_key_re,
    r"(?i)(private[_\s]?key|secret[_\s]?key|priv[_\s]?key|wallet[_\s]?key)[\s:=]+[a-fA-F0-9]{64}\b"
);
regex_once!(provider_key_re, r"\b(sk|pk)[-_][A-Za-z0-9\-]{15,}\b");
regex_once!(
    assignment_key_re,
    r#"(?i)api[_-]?key[\s:=]+['"]?[A-Za-z0-9]{20,}"#
);

pub fn redact_email(text: &str) -> String {
    email_re().replace_all(text, "***EMAIL_REDACTED***").into_owned()
}

pub fn redact_phone(text: &str) -> String {
    let mut out = phone_re_local().replace_all(text, "***PHONE_REDACTED***").into_owned();
    out = phone_re_paren().replace_all(&out, "***PHONE_REDACTED***").into_owned();
    out = phone_re_intl().replace_all(&out, "***PHONE_REDACTED***").into_owned();
    out
}

pub fn redact_ssn(text: &str) -> String {
    ssn_re().replace_all(text, "***SSN_REDACTED***").into_owned()
}

pub fn redact_credit_card(text: &str) -> String {
    cc_re().replace_all(text, "***CC_REDACTED***").into_owned()
}

pub fn redact_address(text: &str) -> String {
    let with_street = street_re().replace_all(text, "***ADDRESS_REDACTED***").into_owned();
    zip_re().replace_all(&with_street, "***ZIP_REDACTED***").into_owned()
}

pub fn redact_blockchain_address(text: &str) -> String {
    let mut out = eth_address_re().replace_all(text, "[ETH_ADDRESS_REDACTED]").into_owned();
    out = btc_legacy_re().replace_all(&out, "[BTC_ADDRESS_REDACTED]").into_owned();
    out = btc_segwit_re().replace_all(&out, "[BTC_ADDRESS_REDACTED]").into_owned();
    out
}

pub fn redact_private_key(text: &str) -> String {
    let mut out = pem_re().replace_all(text, "[PRIVATE_KEY_REDACTED]").into_owned();
    out = hex64_re().replace_all(&out, "[PRIVATE_KEY_REDACTED]").into_owned();
    out = wif_re().replace_all(&out, "[PRIVATE_KEY_REDACTED]").into_owned();
    out = contextual_key_re()
        .replace_all(&out, "$1: [PRIVATE_KEY_REDACTED]")
        .into_owned();
    out
}

pub fn redact_api_key(text: &str) -> String {
    let mut out = provider_key_re().replace_all(text, "[API_KEY_REDACTED]").into_owned();
    out = assignment_key_re()
        .replace_all(&out, "api_key=[API_KEY_REDACTED]")
        .into_owned();
    out
}

/// Redacts BIP39 seed phrases. With a wordlist, only exact 12/18/24-word
/// windows of known BIP39 words are redacted; without one, falls back to
/// the heuristic of 12/18/24 consecutive short lowercase alphabetic words
/// mirroring the catalog's own detection heuristic.
pub fn redact_seed_phrase(text: &str, wordlist: Option<&Bip39Wordlist>) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return text.to_string();
    }

    let mut redacted_word_indices: Vec<bool> = vec![false; words.len()];

    for &window_len in &[12usize, 18, 24] {
        if words.len() < window_len {
            continue;
        }
        for i in 0..=(words.len() - window_len) {
            let window = &words[i..i + window_len];
            let qualifies = match wordlist {
                Some(list) => window
                    .iter()
                    .all(|w| w.chars().all(|c| c.is_lowercase()) && list.contains(&w.to_lowercase())),
                None => window
                    .iter()
                    .all(|w| w.chars().all(|c| c.is_lowercase() && c.is_alphabetic()) && (3..=8).contains(&w.len())),
            };
            if qualifies {
                for idx in i..i + window_len {
                    redacted_word_indices[idx] = true;
                }
            }
        }
    }

    words
        .iter()
        .zip(redacted_word_indices.iter())
        .map(|(w, redacted)| if *redacted { "[SEED_WORD_REDACTED]" } else { *w })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn redact_pii(text: &str) -> String {
    let text = redact_email(text);
    let text = redact_phone(&text);
    let text = redact_ssn(&text);
    let text = redact_credit_card(&text);
    redact_address(&text)
}

pub fn redact_secrets(text: &str, wordlist: Option<&Bip39Wordlist>) -> String {
    let text = redact_blockchain_address(text);
    let text = redact_private_key(&text);
    let text = redact_api_key(&text);
    redact_seed_phrase(&text, wordlist)
}

pub fn redact_all(text: &str, wordlist: Option<&Bip39Wordlist>) -> String {
    let text = redact_pii(text);
    redact_secrets(&text, wordlist)
}

/// Redacts only the spans relevant to the given threat kinds, rather than
/// running every redaction pass over every event.
pub fn redact_by_threat_type(text: &str, kinds: &[ThreatKind], wordlist: Option<&Bip39Wordlist>) -> String {
    let mut out = text.to_string();
    for kind in kinds {
        out = match kind {
            ThreatKind::Pii => redact_pii(&out),
            ThreatKind::BlockchainAddress => redact_blockchain_address(&out),
            ThreatKind::PrivateKey => redact_private_key(&out),
            ThreatKind::ApiKeyLeak => redact_api_key(&out),
            ThreatKind::SeedPhrase => redact_seed_phrase(&out, wordlist),
            ThreatKind::FinancialSecret => redact_secrets(&out, wordlist),
            ThreatKind::PromptInjection | ThreatKind::ToxicContent | ThreatKind::Jailbreak => out,
        };
    }
    out
}

/// Masks a sensitive value, showing only a prefix/suffix (e.g. for a
/// dashboard that needs partial reveal rather than a full marker).
pub fn mask_sensitive_value(value: &str, keep_prefix: usize, keep_suffix: usize) -> String {
    if value.is_empty() || value.len() <= keep_prefix + keep_suffix {
        return "***".to_string();
    }
    format!("{}***{}", &value[..keep_prefix], &value[value.len() - keep_suffix..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_eth_address() {
        let out = redact_blockchain_address("send to 0x742d35Cc6634C0532925a3b844Bc454e4438f44e");
        assert!(out.contains("[ETH_ADDRESS_REDACTED]"));
        assert!(!out.contains("0x742d35Cc6634C0532925a3b844Bc454e4438f44e"));
    }

    #[test]
    fn redacts_email_and_phone() {
        let out = redact_pii("contact me at jane@example.com or 555-123-4567");
        assert!(out.contains("***EMAIL_REDACTED***"));
        assert!(out.contains("***PHONE_REDACTED***"));
    }

    #[test]
    fn mask_keeps_only_prefix_and_suffix() {
        assert_eq!(mask_sensitive_value("sk_test_abcdefxyz", 4, 3), "sk_t***xyz");
        assert_eq!(mask_sensitive_value("short", 4, 4), "***");
    }
}
