//! Completion message.
//!
//! A completion ends an invocation in exactly one of three ways: with a
//! result, with no payload, or with an error. The three-way outcome is an
//! enum, so a completion carrying both an error and a result cannot be
//! built through the typed constructors. [`CompletionMessage::from_parts`]
//! accepts the loose field form and rejects invalid combinations.

use super::Payload;
use crate::error::ConstructionError;

/// How an invocation finished.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CompletionOutcome {
    /// Completed without a payload.
    #[default]
    Void,
    /// Completed with a result (which may itself be null).
    Result(Payload),
    /// Failed with an error message.
    Error(String),
}

/// Terminal response to an invocation or stream invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionMessage {
    /// Invocation this completes.
    pub invocation_id: String,
    /// Result, error, or neither.
    pub outcome: CompletionOutcome,
}

impl CompletionMessage {
    /// Completion with no payload.
    pub fn void(invocation_id: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            outcome: CompletionOutcome::Void,
        }
    }

    /// Successful completion with a result.
    pub fn with_result(invocation_id: impl Into<String>, result: impl Into<Payload>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            outcome: CompletionOutcome::Result(result.into()),
        }
    }

    /// Failed completion.
    pub fn with_error(invocation_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            outcome: CompletionOutcome::Error(error.into()),
        }
    }

    /// Build from independently optional fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] if both `error` and a result are given,
    /// or if `result` is given while `has_result` is false.
    pub fn from_parts(
        invocation_id: impl Into<String>,
        error: Option<String>,
        result: Option<Payload>,
        has_result: bool,
    ) -> Result<Self, ConstructionError> {
        let invocation_id = invocation_id.into();
        let outcome = match (error, result, has_result) {
            (Some(_), _, true) | (Some(_), Some(_), _) => {
                return Err(ConstructionError::CompletionErrorAndResult { invocation_id });
            }
            (None, Some(_), false) => {
                return Err(ConstructionError::CompletionResultWithoutFlag { invocation_id });
            }
            (Some(error), None, false) => CompletionOutcome::Error(error),
            (None, result, true) => CompletionOutcome::Result(result.unwrap_or_default()),
            (None, None, false) => CompletionOutcome::Void,
        };
        Ok(Self {
            invocation_id,
            outcome,
        })
    }

    /// Error message, if the invocation failed.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            CompletionOutcome::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Result value, if the invocation produced one.
    pub fn result(&self) -> Option<&Payload> {
        match &self.outcome {
            CompletionOutcome::Result(result) => Some(result),
            _ => None,
        }
    }

    /// Whether a result is present (a null result still counts).
    #[inline]
    pub fn has_result(&self) -> bool {
        matches!(self.outcome, CompletionOutcome::Result(_))
    }

    /// Whether the invocation failed.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, CompletionOutcome::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_constructors() {
        let void = CompletionMessage::void("1");
        assert!(!void.has_result());
        assert!(void.error().is_none());
        assert!(void.result().is_none());

        let ok = CompletionMessage::with_result("2", json!(5));
        assert!(ok.has_result());
        assert_eq!(ok.result(), Some(&Payload::from(json!(5))));
        assert!(!ok.is_error());

        let failed = CompletionMessage::with_error("7", "boom");
        assert_eq!(failed.error(), Some("boom"));
        assert!(!failed.has_result());
        assert!(failed.result().is_none());
    }

    #[test]
    fn test_null_result_is_still_a_result() {
        let completion = CompletionMessage::with_result("3", Payload::null());
        assert!(completion.has_result());
        assert_ne!(completion, CompletionMessage::void("3"));
    }

    #[test]
    fn test_from_parts_rejects_error_with_result() {
        let err = CompletionMessage::from_parts(
            "9",
            Some("boom".to_string()),
            Some(Payload::from(json!(1))),
            true,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::CompletionErrorAndResult {
                invocation_id: "9".to_string()
            }
        );

        // has_result alone with an error is the same defect
        assert!(CompletionMessage::from_parts("9", Some("boom".into()), None, true).is_err());
    }

    #[test]
    fn test_from_parts_rejects_result_without_flag() {
        let err =
            CompletionMessage::from_parts("4", None, Some(Payload::from(json!(1))), false)
                .unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::CompletionResultWithoutFlag { .. }
        ));
    }

    #[test]
    fn test_from_parts_valid_combinations() {
        let void = CompletionMessage::from_parts("1", None, None, false).unwrap();
        assert_eq!(void, CompletionMessage::void("1"));

        let failed = CompletionMessage::from_parts("1", Some("nope".into()), None, false).unwrap();
        assert_eq!(failed, CompletionMessage::with_error("1", "nope"));

        let ok = CompletionMessage::from_parts("1", None, Some(Payload::from(json!("x"))), true)
            .unwrap();
        assert_eq!(ok, CompletionMessage::with_result("1", json!("x")));

        let null_result = CompletionMessage::from_parts("1", None, None, true).unwrap();
        assert_eq!(null_result.result(), Some(&Payload::null()));
    }
}
