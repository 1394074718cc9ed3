use common::StatusSnapshot;
use serde::Serialize;

/// Classification of one observed status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Satisfied,
    NotYet,
    /// The object reached a state it will not recover from on its own
    FailedTerminally(String),
}

/// Caller-supplied test over a fetched status
pub trait Predicate: Send + Sync {
    fn evaluate(&self, status: &StatusSnapshot) -> Verdict;

    /// Human-readable form for logs
    fn describe(&self) -> String {
        "custom predicate".to_string()
    }
}

impl<F> Predicate for F
where
    F: Fn(&StatusSnapshot) -> Verdict + Send + Sync,
{
    fn evaluate(&self, status: &StatusSnapshot) -> Verdict {
        self(status)
    }
}

/// Expected `status` of the condition with a given `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionMatch {
    pub type_: String,
    pub status: String,
}

impl ConditionMatch {
    pub fn new(type_: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            status: status.into(),
        }
    }

    /// Parse `Type=Status`
    pub fn parse(text: &str) -> Option<Self> {
        let (type_, status) = text.split_once('=')?;
        let (type_, status) = (type_.trim(), status.trim());
        if type_.is_empty() || status.is_empty() {
            return None;
        }
        Some(Self::new(type_, status))
    }

    fn matches(&self, status: &StatusSnapshot) -> bool {
        status
            .condition(&self.type_)
            .is_some_and(|c| c.has_status(&self.status))
    }
}

/// Predicate over named status conditions
///
/// Terminal matches are checked first, then the observed generation (if
/// required), then every requirement. A condition that is absent from the
/// status never matches, so a missing requirement reads as `NotYet`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConditionPredicate {
    requirements: Vec<ConditionMatch>,
    terminal: Vec<ConditionMatch>,
    observed_generation: bool,
}

impl ConditionPredicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, type_: impl Into<String>, status: impl Into<String>) -> Self {
        self.requirements.push(ConditionMatch::new(type_, status));
        self
    }

    pub fn fail_on(mut self, type_: impl Into<String>, status: impl Into<String>) -> Self {
        self.terminal.push(ConditionMatch::new(type_, status));
        self
    }

    pub fn fail_on_all(mut self, matches: impl IntoIterator<Item = ConditionMatch>) -> Self {
        self.terminal.extend(matches);
        self
    }

    pub fn require_observed_generation(mut self) -> Self {
        self.observed_generation = true;
        self
    }

    pub fn requirements(&self) -> &[ConditionMatch] {
        &self.requirements
    }

    pub fn terminal(&self) -> &[ConditionMatch] {
        &self.terminal
    }
}

impl Predicate for ConditionPredicate {
    fn evaluate(&self, status: &StatusSnapshot) -> Verdict {
        for terminal in &self.terminal {
            if let Some(condition) = status.condition(&terminal.type_) {
                if condition.has_status(&terminal.status) {
                    return Verdict::FailedTerminally(format!(
                        "{}={} ({})",
                        condition.type_,
                        condition.status,
                        condition.summary()
                    ));
                }
            }
        }

        if self.observed_generation && !status.generation_observed() {
            return Verdict::NotYet;
        }

        if self.requirements.iter().all(|r| r.matches(status)) {
            Verdict::Satisfied
        } else {
            Verdict::NotYet
        }
    }

    fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .requirements
            .iter()
            .map(|r| format!("{}={}", r.type_, r.status))
            .collect();

        if self.observed_generation {
            parts.push("generation observed".to_string());
        }

        let mut text = if parts.is_empty() {
            "no terminal condition".to_string()
        } else {
            parts.join(" and ")
        };

        if !self.terminal.is_empty() {
            let terminal: Vec<String> = self
                .terminal
                .iter()
                .map(|t| format!("{}={}", t.type_, t.status))
                .collect();
            text.push_str(&format!(", failing on {}", terminal.join(" or ")));
        }

        text
    }
}
