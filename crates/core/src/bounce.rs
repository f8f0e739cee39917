//! Bounce classification.
//!
//! Providers annotate bounce events with a classification string. Only hard
//! bounces change subscriber state and feed the suppression list; soft
//! bounces are recorded in the audit log and nothing else.

/// Classification of a bounce event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BounceClass {
    /// Permanent failure (bad address, domain gone). Suppress the address.
    Hard,
    /// Transient failure (mailbox full, greylisting). Log only.
    Soft,
}

impl BounceClass {
    /// Classify a provider bounce-type string.
    ///
    /// Unknown or missing classifications are treated as soft: a transient
    /// failure must never suppress an address.
    pub fn from_provider(classification: Option<&str>) -> Self {
        match classification {
            Some(s) => match s.trim().to_ascii_lowercase().as_str() {
                "hard" | "permanent" | "bounce" | "blocked" | "invalid" => Self::Hard,
                _ => Self::Soft,
            },
            None => Self::Soft,
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, Self::Hard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_classifications() {
        assert_eq!(BounceClass::from_provider(Some("hard")), BounceClass::Hard);
        assert_eq!(BounceClass::from_provider(Some("Permanent")), BounceClass::Hard);
        assert_eq!(BounceClass::from_provider(Some("invalid")), BounceClass::Hard);
    }

    #[test]
    fn soft_classifications() {
        assert_eq!(BounceClass::from_provider(Some("soft")), BounceClass::Soft);
        assert_eq!(BounceClass::from_provider(Some("transient")), BounceClass::Soft);
        assert_eq!(BounceClass::from_provider(Some("mailbox_full")), BounceClass::Soft);
    }

    #[test]
    fn missing_classification_is_soft() {
        assert_eq!(BounceClass::from_provider(None), BounceClass::Soft);
        assert!(!BounceClass::from_provider(None).is_hard());
    }
}
