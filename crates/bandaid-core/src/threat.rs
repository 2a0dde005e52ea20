use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed vocabulary of threat kinds the pipeline recognizes.
///
/// Ordering matters for serialization stability (SQL `CHECK` constraints in
/// `bandaid-journal` enumerate these same nine variants) but carries no
/// severity ranking of its own — severity is computed by the orchestrator
/// from confidence tier and kind together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    PromptInjection,
    Pii,
    FinancialSecret,
    BlockchainAddress,
    PrivateKey,
    SeedPhrase,
    ApiKeyLeak,
    ToxicContent,
    Jailbreak,
}

impl ThreatKind {
    pub const ALL: [ThreatKind; 9] = [
        ThreatKind::PromptInjection,
        ThreatKind::Pii,
        ThreatKind::FinancialSecret,
        ThreatKind::BlockchainAddress,
        ThreatKind::PrivateKey,
        ThreatKind::SeedPhrase,
        ThreatKind::ApiKeyLeak,
        ThreatKind::ToxicContent,
        ThreatKind::Jailbreak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatKind::PromptInjection => "prompt_injection",
            ThreatKind::Pii => "pii",
            ThreatKind::FinancialSecret => "financial_secret",
            ThreatKind::BlockchainAddress => "blockchain_address",
            ThreatKind::PrivateKey => "private_key",
            ThreatKind::SeedPhrase => "seed_phrase",
            ThreatKind::ApiKeyLeak => "api_key_leak",
            ThreatKind::ToxicContent => "toxic_content",
            ThreatKind::Jailbreak => "jailbreak",
        }
    }
}

impl fmt::Display for ThreatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThreatKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prompt_injection" => Ok(ThreatKind::PromptInjection),
            "pii" => Ok(ThreatKind::Pii),
            "financial_secret" => Ok(ThreatKind::FinancialSecret),
            "blockchain_address" => Ok(ThreatKind::BlockchainAddress),
            "private_key" => Ok(ThreatKind::PrivateKey),
            "seed_phrase" => Ok(ThreatKind::SeedPhrase),
            "api_key_leak" => Ok(ThreatKind::ApiKeyLeak),
            "toxic_content" => Ok(ThreatKind::ToxicContent),
            "jailbreak" => Ok(ThreatKind::Jailbreak),
            other => Err(crate::Error::UnknownEnumValue {
                field: "threat_kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Byte offsets of a detection within the text it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// A single transient finding produced by one detector during one `validate`
/// call. Never persisted directly — the orchestrator folds these into a
/// `SecurityEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatDetection {
    pub kind: ThreatKind,
    pub confidence: f64,
    pub matched_span: Span,
}

impl ThreatDetection {
    pub fn new(kind: ThreatKind, confidence: f64, matched_span: Span) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            matched_span,
        }
    }
}
