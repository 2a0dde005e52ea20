use std::collections::HashMap;

use bandaid_catalog::{redact_by_threat_type, Bip39Wordlist};
use bandaid_core::ThreatKind;

const PREVIEW_MAX_CHARS: usize = 1000;

/// Redact detected spans by kind, truncate to 1000 characters
/// with an ellipsis, and append a compact leak summary. `counts` maps each
/// detected kind to how many spans of that kind were found.
pub fn build_redacted_content(text: &str, counts: &HashMap<ThreatKind, usize>, wordlist: Option<&Bip39Wordlist>) -> String {
    let kinds: Vec<ThreatKind> = counts.keys().copied().collect();
    let redacted = if kinds.is_empty() {
        text.to_string()
    } else {
        redact_by_threat_type(text, &kinds, wordlist)
    };

    let truncated = match redacted.char_indices().nth(PREVIEW_MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &redacted[..idx]),
        None => redacted,
    };

    if counts.is_empty() {
        return truncated;
    }

    let mut entries: Vec<(ThreatKind, usize)> = counts.iter().map(|(k, v)| (*k, *v)).collect();
    entries.sort_by_key(|(k, _)| k.as_str());
    let summary = entries
        .iter()
        .map(|(k, n)| format!("{}:{}", k.as_str(), n))
        .collect::<Vec<_>>()
        .join(", ");

    format!("{truncated} [threats: {summary}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_threats_leaves_text_untouched_aside_from_truncation() {
        let out = build_redacted_content("hello world", &HashMap::new(), None);
        assert_eq!(out, "hello world");
    }

    #[test]
    fn threats_produce_a_summary_suffix() {
        let mut counts = HashMap::new();
        counts.insert(ThreatKind::BlockchainAddress, 1);
        let out = build_redacted_content(
            "send to 0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
            &counts,
            None,
        );
        assert!(out.contains("[ETH_ADDRESS_REDACTED]"));
        assert!(out.contains("[threats: blockchain_address:1]"));
    }

    #[test]
    fn long_text_is_truncated_with_ellipsis() {
        let long_text = "a".repeat(2000);
        let out = build_redacted_content(&long_text, &HashMap::new(), None);
        assert!(out.ends_with("..."));
        assert!(out.len() < 1100);
    }
}
