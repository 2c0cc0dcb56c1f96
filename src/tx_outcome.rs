use std::fmt;

/// Where a [`Transaction`](crate::Transaction) is in its lifecycle.
///
/// `Open` moves to exactly one of the terminal states and never back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TxOutcome {
    #[default]
    Open,
    Committed,
    RolledBack {
        /// Caller-supplied message, `"Time out"` for watchdog rollbacks, or the
        /// commit error that forced the rollback.
        reason: Option<String>,
    },
}

impl TxOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        !matches!(self, TxOutcome::Open)
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            TxOutcome::RolledBack { reason } => reason.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for TxOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxOutcome::Open => f.write_str("open"),
            TxOutcome::Committed => f.write_str("committed"),
            TxOutcome::RolledBack { reason: None } => f.write_str("rolled back"),
            TxOutcome::RolledBack {
                reason: Some(reason),
            } => write!(f, "rolled back: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let outcome = TxOutcome::RolledBack {
            reason: Some("Time out".into()),
        };
        assert_eq!(outcome.to_string(), "rolled back: Time out");
        assert_eq!(outcome.reason(), Some("Time out"));
        assert!(outcome.is_completed());
        assert!(!TxOutcome::default().is_completed());
    }
}
