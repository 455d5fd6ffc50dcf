//! Relay Control ASCII Protocol
//!
//! This crate provides the protocol engine for an embedded I/O controller
//! that exposes relay-output control and digital-input monitoring over
//! simple single-line ASCII commands. The same grammar is served over a
//! serial line, TCP connections, and UDP datagrams; this crate is transport
//! agnostic and deals only in decoded text.
//!
//! # Protocol Overview
//!
//! Three kinds of inbound messages are recognized, matched in order against
//! the end of the message text:
//!
//! - **Control commands**: `[copt+0-9*]+(=[0-9]+)?` — a chain of mode
//!   characters and channel digits that closes (`c`), opens (`o`), or
//!   toggles (`t`) relay channels, optionally pulsed (`p`) for a duration
//!   given after `=`. `+` shifts the next digit into the next bank of 8
//!   channels; `*` addresses all channels at once. Control commands never
//!   produce a reply.
//! - **Digital-input queries**: `din<N>?` — answered with `din<N>=<0|1>`,
//!   with a `,<counter>` suffix when counter reporting is enabled.
//! - **Relay-output queries**: `rout<N>?` — answered with `rout<N>=<0|1>`.
//!
//! Anything else is answered with `unknown command: '<text>'`.
//!
//! Unsolicited transition alerts use the same shape as query replies
//! (`din4=1,12`, `rout2=0`) and are broadcast to every connected stream
//! session.
//!
//! Incoming and outgoing message terminators are configured as strings with
//! backslash escapes (`\r`, `\n`, ...) and decoded by [`decode_terminator`];
//! [`TerminatorCodec`] splits a raw byte stream into messages on the decoded
//! sequence.
//!
//! # Example
//!
//! ```
//! use relayctl_protocol::{classify, parse_segment, Inbound, UpdateKind};
//!
//! // A close command for channels 1 and 2, found at the end of the message.
//! let Inbound::Control(cmd) = classify("c12") else { panic!() };
//! let plan = parse_segment(&cmd, 0).unwrap().unwrap();
//! assert_eq!(plan.mask, 0b11);
//! assert_eq!(plan.states, 0b11);
//! assert_eq!(plan.kind, UpdateKind::Immediate);
//! ```

mod alert;
mod directive;
mod error;
mod message;
mod terminator;

pub use alert::*;
pub use directive::*;
pub use error::*;
pub use message::*;
pub use terminator::*;
