use bandaid_core::{ConfidenceThresholds, ConfidenceTier, Severity, ThreatKind};

/// Action to take once a confidence tier is known, mirroring
/// `confidence.py::Action` (`LOG_ONLY` was never reached by that
/// implementation's own `get_action` and is folded into `Allow` here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Block,
    ValidateFurther,
    Allow,
}

/// "high ⇒ block; medium & Policy enabled ⇒ run Policy;
/// medium & Policy disabled ⇒ block; low ⇒ allow."
pub fn get_action(tier: ConfidenceTier, guard_enabled: bool) -> Action {
    match tier {
        ConfidenceTier::High => Action::Block,
        ConfidenceTier::Medium => {
            if guard_enabled {
                Action::ValidateFurther
            } else {
                Action::Block
            }
        }
        ConfidenceTier::Low | ConfidenceTier::None => Action::Allow,
    }
}

/// `should_block = (tier=high) OR (tier=medium AND
/// (policy.unsafe OR policy_disabled))`. `policy_unsafe` is `None` when the
/// Policy Classifier was never invoked for this call.
pub fn should_block(tier: ConfidenceTier, guard_enabled: bool, policy_unsafe: Option<bool>) -> bool {
    match get_action(tier, guard_enabled) {
        Action::Block => true,
        Action::ValidateFurther => policy_unsafe.unwrap_or(false),
        Action::Allow => false,
    }
}

fn is_critical_kind(kind: ThreatKind) -> bool {
    matches!(
        kind,
        ThreatKind::PrivateKey | ThreatKind::SeedPhrase | ThreatKind::FinancialSecret | ThreatKind::PromptInjection
    )
}

fn is_high_kind(kind: ThreatKind) -> bool {
    matches!(kind, ThreatKind::ApiKeyLeak | ThreatKind::BlockchainAddress)
}

/// Severity table. `kind` is `None` only for the "allowed, no
/// threat" case.
pub fn get_severity(thresholds: &ConfidenceThresholds, confidence: f64, kind: Option<ThreatKind>) -> Severity {
    let Some(kind) = kind else {
        return Severity::Info;
    };

    match thresholds.tier(confidence) {
        ConfidenceTier::High => {
            if is_critical_kind(kind) {
                Severity::Critical
            } else if is_high_kind(kind) {
                Severity::High
            } else {
                Severity::Medium
            }
        }
        ConfidenceTier::Medium => {
            if is_critical_kind(kind) || is_high_kind(kind) {
                Severity::High
            } else {
                Severity::Medium
            }
        }
        // tier() guarantees confidence >= low threshold here.
        ConfidenceTier::Low => Severity::Medium,
        ConfidenceTier::None => Severity::Low,
    }
}

fn severity_rank(s: Severity) -> u8 {
    match s {
        Severity::Critical => 4,
        Severity::High => 3,
        Severity::Medium => 2,
        Severity::Low => 1,
        Severity::Info => 0,
    }
}

/// The more severe of `severity` and `floor` — used for leak-alert
/// severity, which response-side post-call scanning floors at
/// `high`.
pub fn severity_floor(severity: Severity, floor: Severity) -> Severity {
    if severity_rank(severity) >= severity_rank(floor) {
        severity
    } else {
        floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> ConfidenceThresholds {
        ConfidenceThresholds::default()
    }

    #[test]
    fn high_tier_always_blocks() {
        assert_eq!(get_action(ConfidenceTier::High, true), Action::Block);
        assert_eq!(get_action(ConfidenceTier::High, false), Action::Block);
        assert!(should_block(ConfidenceTier::High, true, None));
    }

    #[test]
    fn medium_tier_blocks_when_guard_disabled() {
        assert_eq!(get_action(ConfidenceTier::Medium, false), Action::Block);
        assert!(should_block(ConfidenceTier::Medium, false, None));
    }

    #[test]
    fn medium_tier_defers_to_policy_when_guard_enabled() {
        assert_eq!(get_action(ConfidenceTier::Medium, true), Action::ValidateFurther);
        assert!(!should_block(ConfidenceTier::Medium, true, Some(false)));
        assert!(should_block(ConfidenceTier::Medium, true, Some(true)));
    }

    #[test]
    fn low_and_none_tiers_always_allow() {
        assert!(!should_block(ConfidenceTier::Low, true, None));
        assert!(!should_block(ConfidenceTier::None, false, None));
    }

    #[test]
    fn severity_escalates_critical_kinds_at_high_confidence() {
        let sev = get_severity(&thresholds(), 0.95, Some(ThreatKind::PrivateKey));
        assert_eq!(sev, Severity::Critical);
    }

    #[test]
    fn severity_medium_confidence_caps_critical_kind_at_high() {
        let sev = get_severity(&thresholds(), 0.6, Some(ThreatKind::SeedPhrase));
        assert_eq!(sev, Severity::High);
    }

    #[test]
    fn severity_no_threat_is_info() {
        assert_eq!(get_severity(&thresholds(), 0.0, None), Severity::Info);
    }

    #[test]
    fn severity_floor_never_lowers_an_already_severe_rating() {
        assert_eq!(severity_floor(Severity::Critical, Severity::High), Severity::Critical);
        assert_eq!(severity_floor(Severity::Low, Severity::High), Severity::High);
    }
}
