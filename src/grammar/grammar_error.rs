/// A grammar-definition error. These are bugs in the grammar, not in the
/// input: they abort the parse instead of being caught by a choice point.
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarError {
    /// A rule was referenced but never given a definition
    UndefinedRule { rule: String },
    /// A rule was defined twice
    AlreadyDefined { rule: String },
    /// A rule re-entered itself at the same input position
    LeftRecursion { rule: String },
    /// The body of a repetition matched without consuming input
    EmptyRepetition { rule: Option<String> },
    /// A pattern the regex engine refused (bad syntax or too large)
    Pattern { pattern: String, message: String },
    /// Internal engine error (shouldn't happen in normal use)
    Internal(String),
}

impl GrammarError {
    pub fn undefined_rule(rule: impl Into<String>) -> Self {
        GrammarError::UndefinedRule { rule: rule.into() }
    }

    pub fn already_defined(rule: impl Into<String>) -> Self {
        GrammarError::AlreadyDefined { rule: rule.into() }
    }

    pub fn left_recursion(rule: impl Into<String>) -> Self {
        GrammarError::LeftRecursion { rule: rule.into() }
    }

    pub fn empty_repetition(rule: Option<String>) -> Self {
        GrammarError::EmptyRepetition { rule }
    }

    pub fn pattern(pattern: impl Into<String>, message: impl ToString) -> Self {
        GrammarError::Pattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        GrammarError::Internal(msg.into())
    }
}

impl std::fmt::Display for GrammarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarError::UndefinedRule { rule } => {
                write!(f, "grammar error: rule '{}' is referenced but never defined", rule)
            }
            GrammarError::AlreadyDefined { rule } => {
                write!(f, "grammar error: rule '{}' has already been defined", rule)
            }
            GrammarError::LeftRecursion { rule } => {
                write!(f, "grammar error: left recursion detected, involved rule: '{}'", rule)
            }
            GrammarError::EmptyRepetition { rule } => {
                write!(
                    f,
                    "grammar error: the body of a repetition must not match empty input"
                )?;
                if let Some(rule) = rule {
                    write!(f, " (in rule '{}')", rule)?;
                }
                Ok(())
            }
            GrammarError::Pattern { pattern, message } => {
                write!(f, "grammar error: cannot compile pattern '{}': {}", pattern, message)
            }
            GrammarError::Internal(msg) => {
                write!(f, "grammar error: internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for GrammarError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_rule_display() {
        let err = GrammarError::undefined_rule("expression");

        let msg = err.to_string();
        assert!(msg.contains("grammar error"));
        assert!(msg.contains("expression"));
        assert!(msg.contains("never defined"));
    }

    #[test]
    fn test_already_defined_display() {
        let err = GrammarError::already_defined("statement");

        let msg = err.to_string();
        assert!(msg.contains("statement"));
        assert!(msg.contains("already been defined"));
    }

    #[test]
    fn test_left_recursion_display() {
        let err = GrammarError::left_recursion("expression");

        let msg = err.to_string();
        assert!(msg.contains("left recursion"));
        assert!(msg.contains("expression"));
    }

    #[test]
    fn test_empty_repetition_display() {
        let err = GrammarError::empty_repetition(Some("list".to_string()));
        let msg = err.to_string();
        assert!(msg.contains("repetition"));
        assert!(msg.contains("list"));

        let anonymous = GrammarError::empty_repetition(None);
        assert!(anonymous.to_string().contains("repetition"));
    }

    #[test]
    fn test_pattern_display() {
        let err = GrammarError::pattern("[a-", "unclosed character class");

        let msg = err.to_string();
        assert!(msg.contains("[a-"));
        assert!(msg.contains("unclosed character class"));
    }

    #[test]
    fn test_internal_display() {
        let err = GrammarError::internal("something went wrong");

        let msg = err.to_string();
        assert!(msg.contains("internal"));
        assert!(msg.contains("something went wrong"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let err = GrammarError::internal("test");
        let _: &dyn std::error::Error = &err;
    }
}
