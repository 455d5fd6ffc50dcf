//! Reply and alert formatting.

/// Which bank a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    DigitalInput,
    RelayOutput,
}

impl ChannelKind {
    /// Short type tag used in replies and alerts.
    pub fn abbr(&self) -> &'static str {
        match self {
            ChannelKind::DigitalInput => "din",
            ChannelKind::RelayOutput => "rout",
        }
    }
}

/// Format an unsolicited transition alert line.
///
/// The counter suffix is appended only for digital-input transitions, and
/// only when counter reporting is enabled and a counter value is known.
pub fn format_alert(
    kind: ChannelKind,
    channel: u32,
    state: bool,
    counter: Option<u32>,
    send_counts: bool,
) -> String {
    let base = format!("{}{}={}", kind.abbr(), channel, state as u32);
    match (kind, counter) {
        (ChannelKind::DigitalInput, Some(counter)) if send_counts => {
            format!("{},{}", base, counter)
        }
        _ => base,
    }
}

/// Format a digital-input query reply; `counter` is present when counter
/// reporting is enabled.
pub fn format_din_reply(channel: u32, state: bool, counter: Option<u32>) -> String {
    let base = format!("din{}={}", channel, state as u32);
    match counter {
        Some(counter) => format!("{},{}", base, counter),
        None => base,
    }
}

/// Format a relay-output query reply.
pub fn format_rout_reply(channel: u32, state: bool) -> String {
    format!("rout{}={}", channel, state as u32)
}

/// Format the reply for an unrecognized message.
pub fn format_unknown_reply(message: &str) -> String {
    format!("unknown command: '{}'", message)
}
