//! Inbound message classification.
//!
//! Each decoded message is matched against three grammars in fixed order:
//! control command, digital-input query, relay-output query. All three are
//! anchored at the end of the message, so a recognized command may be a
//! suffix of a longer line (leading prompt text or addressing is ignored).
//!
//! The control character class is `[copt+0-9*]` with an optional `=digits`
//! tail. Note that `s` and `,` are not in the class: a set-counters command
//! or a comma-chained command arriving over a session is truncated to its
//! trailing matchable portion. This matches the controller's long-standing
//! wire behavior and is relied on by deployed clients.

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A control command; carries the matched directive text.
    Control(String),
    /// `din<N>?` — digital-input state query for channel N (1-based).
    DinQuery(u32),
    /// `rout<N>?` — relay-output state query for channel N (1-based).
    RoutQuery(u32),
    /// Anything else; answered with an `unknown command` reply.
    Unknown,
}

fn is_control_char(byte: u8) -> bool {
    byte.is_ascii_digit() || matches!(byte.to_ascii_lowercase(), b'c' | b'o' | b'p' | b't' | b'+' | b'*')
}

/// Start of the run of control-class characters ending at `end`.
fn class_run_start(bytes: &[u8], end: usize) -> usize {
    let mut start = end;
    while start > 0 && is_control_char(bytes[start - 1]) {
        start -= 1;
    }
    start
}

/// Match the longest control-command suffix of the message.
fn match_control(msg: &str) -> Option<String> {
    let bytes = msg.as_bytes();
    let len = bytes.len();
    if len == 0 {
        return None;
    }

    // Try the `=digits` tail first: trailing digits preceded by `=`,
    // preceded by at least one control-class character.
    let mut digits_start = len;
    while digits_start > 0 && bytes[digits_start - 1].is_ascii_digit() {
        digits_start -= 1;
    }
    if digits_start < len && digits_start > 0 && bytes[digits_start - 1] == b'=' {
        let class_end = digits_start - 1;
        let start = class_run_start(bytes, class_end);
        if start < class_end {
            return Some(msg[start..].to_string());
        }
        // No class character before the `=`; fall back to a plain suffix
        // (the trailing digits are themselves class characters).
    }

    let start = class_run_start(bytes, len);
    if start < len {
        Some(msg[start..].to_string())
    } else {
        None
    }
}

/// Match a `<prefix><digits>?` query suffix.
fn match_query(msg: &str, prefix: &str) -> Option<u32> {
    let bytes = msg.as_bytes();
    let len = bytes.len();
    if len == 0 || bytes[len - 1] != b'?' {
        return None;
    }
    let mut digits_start = len - 1;
    while digits_start > 0 && bytes[digits_start - 1].is_ascii_digit() {
        digits_start -= 1;
    }
    if digits_start == len - 1 {
        return None;
    }
    let prefix_start = digits_start.checked_sub(prefix.len())?;
    if !bytes[prefix_start..digits_start].eq_ignore_ascii_case(prefix.as_bytes()) {
        return None;
    }
    msg[digits_start..len - 1].parse().ok()
}

/// Classify an inbound message. First grammar to match wins.
pub fn classify(msg: &str) -> Inbound {
    if let Some(cmd) = match_control(msg) {
        return Inbound::Control(cmd);
    }
    if let Some(channel) = match_query(msg, "din") {
        return Inbound::DinQuery(channel);
    }
    if let Some(channel) = match_query(msg, "rout") {
        return Inbound::RoutQuery(channel);
    }
    Inbound::Unknown
}
