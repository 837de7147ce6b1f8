//! Operator-facing error model.

use thiserror::Error;

/// Result type used across the engine.
pub type ScanResult<T> = Result<T, ScanError>;

/// A rejected scan or operator action.
///
/// Every variant except [`ScanError::ServiceUnavailable`] is recovered locally: the
/// operator sees the rejection and the next input is a plain retry. Engine state is left
/// unchanged, except that [`ScanError::CommitRejected`] drops the refused commit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The scanned code is not a bin known to the location master.
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("wrong bin: expected {expected}, scanned {scanned}")]
    WrongBin { expected: String, scanned: String },

    #[error("wrong item: expected {expected}, scanned {scanned}")]
    WrongItem { expected: String, scanned: String },

    #[error("wrong lot: expected {expected}, scanned {scanned}")]
    WrongLot { expected: String, scanned: String },

    #[error("wrong destination: expected {expected}, scanned {scanned}")]
    WrongDest { expected: String, scanned: String },

    /// No pending task (or referenced record) matches.
    #[error("not found: {0}")]
    NotFound(String),

    /// A packing line is already fully satisfied.
    #[error("already complete: {0}")]
    AlreadyComplete(String),

    /// A structured code decoded fewer fields than it carried. Non-fatal notice.
    #[error("partial GS1 decode: skipped {skipped:?}")]
    PartialGs1 { skipped: Vec<String> },

    /// The composite product is not a line of the order being packed.
    #[error("product {0} is not in this order")]
    NotInOrder(String),

    #[error("malformed composite code: {0}")]
    MalformedComposite(String),

    /// Entered quantity differs from the expected one; resubmit with override.
    #[error("quantity {entered} differs from expected {expected}; confirm override to proceed")]
    OverrideRequired { expected: u32, entered: u32 },

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The input kind is not accepted at the current step (e.g. a lot choice at LOCATION).
    #[error("unexpected input at {step}: {input}")]
    UnexpectedInput { step: String, input: String },

    #[error("no active session")]
    NoActiveSession,

    /// A call to the inventory service is outstanding.
    #[error("busy: waiting for {0}")]
    Busy(String),

    /// The inventory service refused a commit. The session returns to the step that
    /// produced it.
    #[error("commit rejected: {0}")]
    CommitRejected(String),

    /// External inventory/order service failure (fatal class, session kept open).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ScanError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_location(code: impl Into<String>) -> Self {
        Self::InvalidLocation(code.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn busy(what: impl Into<String>) -> Self {
        Self::Busy(what.into())
    }

    pub fn unexpected(step: impl core::fmt::Display, input: impl Into<String>) -> Self {
        Self::UnexpectedInput {
            step: step.to_string(),
            input: input.into(),
        }
    }

    /// Stable machine-readable code shown to operators and logged.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::InvalidLocation(_) => "INVALID_LOCATION",
            ScanError::WrongBin { .. } => "WRONG_BIN",
            ScanError::WrongItem { .. } => "WRONG_ITEM",
            ScanError::WrongLot { .. } => "WRONG_LOT",
            ScanError::WrongDest { .. } => "WRONG_DEST",
            ScanError::NotFound(_) => "NOT_FOUND",
            ScanError::AlreadyComplete(_) => "ALREADY_COMPLETE",
            ScanError::PartialGs1 { .. } => "PARTIAL_GS1",
            ScanError::NotInOrder(_) => "NOT_IN_ORDER",
            ScanError::MalformedComposite(_) => "MALFORMED_COMPOSITE",
            ScanError::OverrideRequired { .. } => "OVERRIDE_REQUIRED",
            ScanError::InvalidQuantity(_) => "INVALID_QUANTITY",
            ScanError::UnexpectedInput { .. } => "UNEXPECTED_INPUT",
            ScanError::NoActiveSession => "NO_ACTIVE_SESSION",
            ScanError::Busy(_) => "BUSY",
            ScanError::CommitRejected(_) => "COMMIT_REJECTED",
            ScanError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Fatal-class failures keep the session open with a retry affordance.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::ServiceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = ScanError::WrongBin {
            expected: "A-01".into(),
            scanned: "A-02".into(),
        };
        assert_eq!(err.code(), "WRONG_BIN");
        assert_eq!(err.to_string(), "wrong bin: expected A-01, scanned A-02");
        assert_eq!(ScanError::AlreadyComplete("SKU3".into()).code(), "ALREADY_COMPLETE");
    }

    #[test]
    fn only_service_failures_are_fatal() {
        assert!(ScanError::ServiceUnavailable("timeout".into()).is_fatal());
        assert!(!ScanError::NotFound("x".into()).is_fatal());
        assert!(!ScanError::busy("commit").is_fatal());
        assert!(!ScanError::CommitRejected("no stock".into()).is_fatal());
        assert_eq!(ScanError::CommitRejected("no stock".into()).code(), "COMMIT_REJECTED");
    }
}
