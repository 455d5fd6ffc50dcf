//! Directive parser for relay control commands.
//!
//! A control command is a chain of mode characters and channel digits,
//! scanned character by character:
//!
//! - `c` close (set to 1), `o` open (set to 0), `t` toggle — each selects
//!   the mode for the digits that follow and deselects the others
//! - `s` select channels whose counters the command addresses
//! - `p` marks the update as pulsed for the duration given after `=`
//! - `1`-`8` address a channel within the current bank of 8
//! - `+` shifts the next digit up by one bank (8 channels per `+`)
//! - `*` addresses all channels (not valid with toggle)
//! - `=<digits>` captures the numeric parameter
//! - spaces and unrecognized characters are ignored
//!
//! Commands may chain several sub-commands separated by commas. Each
//! sub-command is resolved independently left to right against the live
//! output states, so a later segment sees the effect of an earlier one. A
//! rejected segment is skipped silently; the remaining segments still run.

use log::debug;

use crate::DirectiveError;

/// How a relay update is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Write the masked bits and leave them.
    Immediate,
    /// Write the masked bits, then revert them after the duration elapses.
    Pulsed {
        /// Pulse duration in milliseconds.
        duration_ms: u32,
    },
    /// A toggle write. Applied like an immediate write, but a toggle never
    /// produces a reportable payload for the caller.
    ToggleOnly,
}

/// A validated relay state mutation for one sub-command.
///
/// `mask` marks the channels the sub-command touches; `states` bits are
/// meaningful only where the corresponding mask bit is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayUpdatePlan {
    pub mask: u32,
    pub states: u32,
    pub kind: UpdateKind,
}

/// Access to the relay output bank, as seen by the directive executor.
pub trait RelayBank {
    /// Current output state bitfield.
    fn output_states(&self) -> u32;
    /// Apply one update plan to the outputs.
    fn apply(&self, plan: &RelayUpdatePlan);
}

/// Parse one comma-free sub-command against a snapshot of the output states.
///
/// Returns `Ok(None)` when the sub-command is well formed but addresses no
/// channel (nothing to apply), and an error when it is rejected outright.
pub fn parse_segment(
    segment: &str,
    current_states: u32,
) -> Result<Option<RelayUpdatePlan>, DirectiveError> {
    let mut mask: u32 = 0;
    let mut states: u32 = current_states;
    let mut parameter: u32 = 0;
    let mut close = false;
    let mut open = false;
    let mut toggle = false;
    let mut setcounters = false;
    // Sticky across later mode changes; checked during final validation.
    let mut setcounters_requested = false;
    let mut pulse = false;
    let mut have_value = false;
    let mut shift: u32 = 0;

    let chars: Vec<char> = segment.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i].to_ascii_lowercase() {
            'c' => {
                close = true;
                open = false;
                toggle = false;
                setcounters = false;
            }
            'o' => {
                open = true;
                close = false;
                toggle = false;
                setcounters = false;
            }
            't' => {
                toggle = true;
                close = false;
                open = false;
                setcounters = false;
            }
            's' => {
                setcounters = true;
                setcounters_requested = true;
                close = false;
                open = false;
                toggle = false;
            }
            'p' => pulse = true,
            '=' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                if end == start {
                    return Err(DirectiveError::MalformedParameter);
                }
                let digits: String = chars[start..end].iter().collect();
                parameter = digits
                    .parse()
                    .map_err(|_| DirectiveError::MalformedParameter)?;
                have_value = true;
                // Resume scanning at the first character after the digits.
                i = end - 1;
            }
            d @ '1'..='8' => {
                if !close && !open && !toggle && !setcounters {
                    return Err(DirectiveError::DigitWithoutMode);
                }
                let n = d as u32 - '1' as u32;
                // The shift amount wraps at the bitfield width, matching the
                // controller's historical 32-bit arithmetic.
                let bit = 1u32.wrapping_shl(n.wrapping_add(shift.wrapping_mul(8)));
                mask |= bit;
                if close {
                    states |= bit;
                } else if open {
                    states &= !bit;
                } else if toggle {
                    states ^= bit;
                }
                shift = 0;
            }
            '+' => shift = shift.wrapping_add(1),
            '*' => {
                if toggle {
                    return Err(DirectiveError::WildcardWithToggle);
                }
                if !close && !open && !setcounters {
                    return Err(DirectiveError::WildcardWithoutMode);
                }
                mask = u32::MAX;
                if close {
                    states = u32::MAX;
                } else if open {
                    states = 0;
                }
            }
            ' ' => {}
            _ => {}
        }
        i += 1;
    }

    // Validity checks, in fixed order.
    if have_value && !pulse && !setcounters_requested {
        return Err(DirectiveError::StrayParameter);
    }
    if have_value && pulse && setcounters_requested {
        return Err(DirectiveError::PulseAndSetCounters);
    }
    if setcounters_requested && !have_value {
        return Err(DirectiveError::SetCountersWithoutParameter);
    }
    if pulse && !have_value {
        return Err(DirectiveError::PulseWithoutParameter);
    }

    if mask == 0 {
        return Ok(None);
    }

    let kind = if pulse {
        UpdateKind::Pulsed {
            duration_ms: parameter,
        }
    } else if !toggle {
        UpdateKind::Immediate
    } else {
        UpdateKind::ToggleOnly
    };

    Ok(Some(RelayUpdatePlan { mask, states, kind }))
}

/// Run a full control command against the relay bank.
///
/// The raw text is split on commas and each segment is resolved against the
/// live output states at that point, then applied immediately. Rejected
/// segments are dropped without affecting the others and without surfacing
/// an error to the sender.
pub fn execute<B: RelayBank + ?Sized>(command: &str, bank: &B) {
    for segment in command.split(',') {
        match parse_segment(segment, bank.output_states()) {
            Ok(Some(plan)) => bank.apply(&plan),
            Ok(None) => {}
            Err(err) => debug!("dropping rejected segment {:?}: {}", segment, err),
        }
    }
}
