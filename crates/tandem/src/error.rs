//! Structured parser failures with positions and named context.

/// A parse failure. Every variant carries the input position where it is
/// known; positions are character indices into the parsed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserError<E> {
    /// A user-visible failure, with the chain of enclosing named scopes at
    /// the failure point (outermost first).
    Failure {
        name_chain: Vec<String>,
        position: usize,
        failure: E,
    },

    /// More characters were needed than the input holds.
    UnexpectedEndOfInput,

    /// An internal invariant was broken.
    UnknownFailure { name_chain: Vec<String>, position: usize },

    /// `end` failed because input remained.
    NotConsumedAll { position: usize },

    /// Both alternatives failed; both sub-errors are retained verbatim.
    AllBranchesFailed {
        left: Box<ParserError<E>>,
        right: Box<ParserError<E>>,
    },
}

impl<E: std::fmt::Display> std::fmt::Display for ParserError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserError::Failure { name_chain, position, .. } => {
                write!(f, "failure at {position}{}", render_chain(name_chain))
            }
            ParserError::UnexpectedEndOfInput => write!(f, "unexpected end of input"),
            ParserError::UnknownFailure { name_chain, position } => {
                write!(f, "unknown failure at {position}{}", render_chain(name_chain))
            }
            ParserError::NotConsumedAll { position } => {
                write!(f, "input was not fully consumed, stopped at {position}")
            }
            ParserError::AllBranchesFailed { left, right } => {
                write!(f, "all branches failed: ({left}) and ({right})")
            }
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for ParserError<E> {}

fn render_chain(chain: &[String]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" in {}", chain.join("/"))
    }
}

impl<E> ParserError<E> {
    /// Combine two branch failures, retaining both.
    pub fn add_failed_branch(self, other: ParserError<E>) -> ParserError<E> {
        ParserError::AllBranchesFailed { left: Box::new(self), right: Box::new(other) }
    }

    /// The failure position, where one is known. `AllBranchesFailed` reports
    /// the rightmost known position of its branches.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParserError::Failure { position, .. }
            | ParserError::UnknownFailure { position, .. }
            | ParserError::NotConsumedAll { position } => Some(*position),
            ParserError::UnexpectedEndOfInput => None,
            ParserError::AllBranchesFailed { left, right } => {
                match (left.position(), right.position()) {
                    (Some(l), Some(r)) => Some(l.max(r)),
                    (l, r) => l.or(r),
                }
            }
        }
    }

    /// Map the user error type.
    pub fn map<E2, F: Fn(E) -> E2>(self, f: F) -> ParserError<E2> {
        self.map_ref(&f)
    }

    fn map_ref<E2, F: Fn(E) -> E2>(self, f: &F) -> ParserError<E2> {
        match self {
            ParserError::Failure { name_chain, position, failure } => {
                ParserError::Failure { name_chain, position, failure: f(failure) }
            }
            ParserError::UnexpectedEndOfInput => ParserError::UnexpectedEndOfInput,
            ParserError::UnknownFailure { name_chain, position } => {
                ParserError::UnknownFailure { name_chain, position }
            }
            ParserError::NotConsumedAll { position } => {
                ParserError::NotConsumedAll { position }
            }
            ParserError::AllBranchesFailed { left, right } => ParserError::AllBranchesFailed {
                left: Box::new(left.map_ref(f)),
                right: Box::new(right.map_ref(f)),
            },
        }
    }
}

impl<E: std::fmt::Display> ParserError<E> {
    /// Render this error against its input with a caret marking the failure
    /// position.
    pub fn pretty(&self, input: &str) -> String {
        let mut out = String::new();
        self.pretty_into(input, &mut out);
        out
    }

    fn pretty_into(&self, input: &str, out: &mut String) {
        match self {
            ParserError::AllBranchesFailed { left, right } => {
                left.pretty_into(input, out);
                right.pretty_into(input, out);
            }
            ParserError::Failure { failure, .. } => {
                self.caret_line(input, &failure.to_string(), out);
            }
            other => {
                let msg = other.to_string();
                self.caret_line(input, &msg, out);
            }
        }
    }

    fn caret_line(&self, input: &str, msg: &str, out: &mut String) {
        let position = self.position().unwrap_or_else(|| input.chars().count());
        out.push_str(&format!("error at {}: {}\n", position, msg));
        out.push_str(&format!("  {}\n", input));
        out.push_str(&format!("  {}^\n", " ".repeat(position)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions() {
        let err: ParserError<String> = ParserError::NotConsumedAll { position: 3 };
        assert_eq!(err.position(), Some(3));

        let both = ParserError::Failure {
            name_chain: vec![],
            position: 1,
            failure: "a".to_string(),
        }
        .add_failed_branch(ParserError::Failure {
            name_chain: vec![],
            position: 4,
            failure: "b".to_string(),
        });
        assert_eq!(both.position(), Some(4));
    }

    #[test]
    fn pretty_points_at_failure() {
        let err: ParserError<String> = ParserError::Failure {
            name_chain: vec!["ip".to_string()],
            position: 4,
            failure: "not a digit".to_string(),
        };
        let rendered = err.pretty("1.2.x");
        assert!(rendered.contains("error at 4: not a digit"));
        assert!(rendered.contains("    ^"));
    }

    #[test]
    fn map_preserves_shape() {
        let err: ParserError<&str> = ParserError::Failure {
            name_chain: vec!["n".into()],
            position: 2,
            failure: "boom",
        };
        let mapped = err.map(|e| e.len());
        assert_eq!(
            mapped,
            ParserError::Failure { name_chain: vec!["n".into()], position: 2, failure: 4 }
        );
    }
}
