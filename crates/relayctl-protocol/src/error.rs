//! Error types for the relay control protocol.

use thiserror::Error;

/// Reasons a directive sub-command is rejected.
///
/// A rejected sub-command is dropped without a reply and without touching
/// the hardware; only the offending comma-separated segment is affected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveError {
    /// A channel digit appeared before any mode character.
    #[error("channel digit with no active mode")]
    DigitWithoutMode,

    /// `*` appeared before any mode character.
    #[error("wildcard with no active mode")]
    WildcardWithoutMode,

    /// `*` is not valid while toggle mode is active.
    #[error("wildcard is not valid with toggle")]
    WildcardWithToggle,

    /// `=` was not followed by a usable decimal number.
    #[error("malformed parameter")]
    MalformedParameter,

    /// A parameter was given but neither pulse nor set-counters wants one.
    #[error("parameter given without pulse or set-counters")]
    StrayParameter,

    /// Pulse and set-counters cannot share one parameter.
    #[error("pulse and set-counters in the same sub-command")]
    PulseAndSetCounters,

    /// Set-counters requires a parameter.
    #[error("set-counters requires a parameter")]
    SetCountersWithoutParameter,

    /// Pulse requires a duration parameter.
    #[error("pulse requires a duration parameter")]
    PulseWithoutParameter,
}
