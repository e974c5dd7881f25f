//! Diagnostics reported back to the host after a lifecycle call

use crate::error::{CloudError, ItemError, Phase};
use crate::state::Drift;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One diagnostic entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            item: None,
            phase: None,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            item: None,
            phase: None,
            message: message.into(),
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }
}

impl From<&ItemError> for Diagnostic {
    fn from(err: &ItemError) -> Self {
        Diagnostic::error(format!("{} ({})", err.cause, err.kind))
            .with_item(err.name.clone())
            .with_phase(err.phase)
    }
}

impl From<&CloudError> for Diagnostic {
    fn from(err: &CloudError) -> Self {
        let diagnostic = Diagnostic::error(err.to_string());
        match err {
            CloudError::ParentCreate { group, .. } => diagnostic
                .with_item(group.clone())
                .with_phase(Phase::Create),
            CloudError::Remote { phase, .. } => diagnostic.with_phase(*phase),
            _ => diagnostic,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}", severity)?;
        if let Some(phase) = self.phase {
            write!(f, " [{}]", phase)?;
        }
        if let Some(item) = &self.item {
            write!(f, " {}", item)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered list of diagnostics for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend_items(&mut self, errors: &[ItemError]) {
        self.entries.extend(errors.iter().map(Diagnostic::from));
    }

    /// Report read drift as warnings
    pub fn extend_drift(&mut self, drift: &Drift) {
        for name in &drift.added {
            self.push(
                Diagnostic::warning("exists remotely but was not in the previous state")
                    .with_item(name.clone())
                    .with_phase(Phase::List),
            );
        }
        for name in &drift.removed {
            self.push(
                Diagnostic::warning("no longer exists remotely; dropped from state")
                    .with_item(name.clone())
                    .with_phase(Phase::List),
            );
        }
    }

    /// Any error entry marks the cycle as failed
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;

    #[test]
    fn test_item_error_diagnostic_carries_name_phase_and_cause() {
        let err = ItemError::new("logs", Phase::Delete, RemoteError::not_found("NoSuchBucket"));
        let diagnostic = Diagnostic::from(&err);

        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.item.as_deref(), Some("logs"));
        assert_eq!(diagnostic.phase, Some(Phase::Delete));
        assert!(diagnostic.message.contains("NoSuchBucket"));
        assert_eq!(
            diagnostic.to_string(),
            "error [delete] logs: NoSuchBucket (not found)"
        );
    }

    #[test]
    fn test_warnings_do_not_fail_the_cycle() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.extend_drift(&Drift {
            added: vec!["new".to_string()],
            removed: vec!["old".to_string()],
        });
        assert_eq!(diagnostics.len(), 2);
        assert!(!diagnostics.has_errors());

        diagnostics.push(Diagnostic::error("boom"));
        assert!(diagnostics.has_errors());
    }
}
