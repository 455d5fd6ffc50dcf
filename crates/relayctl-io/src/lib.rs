//! # relayctl-io
//!
//! The hardware I/O bank behind the relay control protocol: a 32-channel
//! relay output bitfield, a 32-channel digital input bitfield, and a
//! per-input transition counter. Every observed channel transition is
//! emitted as a [`TransitionEvent`] on an mpsc channel so the server can
//! broadcast unsolicited alerts.
//!
//! [`SimulatedBank`] is the in-memory implementation used by the server
//! binary and by tests. On real hardware the [`IoBank`] trait seam is where
//! a driver-backed implementation plugs in.

use log::warn;
use parking_lot::Mutex;
use relayctl_protocol::{ChannelKind, RelayBank, RelayUpdatePlan, UpdateKind};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

/// Number of channels in each bank.
pub const CHANNEL_COUNT: u32 = 32;

/// Capacity of the transition event channel.
const EVENT_QUEUE_DEPTH: usize = 256;

/// One observed channel transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    /// Which bank the channel belongs to.
    pub kind: ChannelKind,
    /// Channel number, 1-based.
    pub channel: u32,
    /// The new state.
    pub state: bool,
    /// Input counter value at the transition; absent for outputs.
    pub counter: Option<u32>,
    /// Transition time, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

/// Read/write access to the I/O bank.
///
/// `channel_index` arguments are 0-based; out-of-range reads yield 0.
pub trait IoBank: RelayBank + Send + Sync {
    /// Current digital input state bitfield.
    fn input_states(&self) -> u32;
    /// Transition counter for one input channel.
    fn input_counter(&self, channel_index: u32) -> u32;
}

struct BankState {
    outputs: u32,
    inputs: u32,
    counters: [u32; CHANNEL_COUNT as usize],
}

struct BankInner {
    state: Mutex<BankState>,
    events: mpsc::Sender<TransitionEvent>,
}

/// In-memory I/O bank. Cloning yields another handle to the same bank.
#[derive(Clone)]
pub struct SimulatedBank {
    inner: Arc<BankInner>,
}

impl SimulatedBank {
    /// Create a bank with all channels low, along with the receiving end of
    /// its transition event feed.
    pub fn new() -> (Self, mpsc::Receiver<TransitionEvent>) {
        let (events, receiver) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let bank = SimulatedBank {
            inner: Arc::new(BankInner {
                state: Mutex::new(BankState {
                    outputs: 0,
                    inputs: 0,
                    counters: [0; CHANNEL_COUNT as usize],
                }),
                events,
            }),
        };
        (bank, receiver)
    }

    /// Write the masked output bits, returning the previous output states.
    fn write_outputs(&self, states: u32, mask: u32) -> u32 {
        let (old, new) = {
            let mut state = self.inner.state.lock();
            let old = state.outputs;
            state.outputs = (old & !mask) | (states & mask);
            (old, state.outputs)
        };
        self.emit_output_transitions(old, new);
        old
    }

    /// Drive one digital input, e.g. from a simulation or a test. The
    /// channel's counter increments on a rising edge.
    pub fn set_input(&self, channel: u32, state: bool) {
        if channel == 0 || channel > CHANNEL_COUNT {
            warn!("ignoring input change for out-of-range channel {}", channel);
            return;
        }
        let bit = 1u32 << (channel - 1);
        let counter = {
            let mut bank = self.inner.state.lock();
            let was_high = bank.inputs & bit != 0;
            if was_high == state {
                return;
            }
            if state {
                bank.inputs |= bit;
                bank.counters[(channel - 1) as usize] += 1;
            } else {
                bank.inputs &= !bit;
            }
            bank.counters[(channel - 1) as usize]
        };
        self.emit(TransitionEvent {
            kind: ChannelKind::DigitalInput,
            channel,
            state,
            counter: Some(counter),
            timestamp_ms: now_ms(),
        });
    }

    fn emit_output_transitions(&self, old: u32, new: u32) {
        let changed = old ^ new;
        if changed == 0 {
            return;
        }
        let timestamp_ms = now_ms();
        for bit in 0..CHANNEL_COUNT {
            if changed & (1 << bit) != 0 {
                self.emit(TransitionEvent {
                    kind: ChannelKind::RelayOutput,
                    channel: bit + 1,
                    state: new & (1 << bit) != 0,
                    counter: None,
                    timestamp_ms,
                });
            }
        }
    }

    fn emit(&self, event: TransitionEvent) {
        // Never block hardware writes on a slow consumer; drop the event.
        if self.inner.events.try_send(event).is_err() {
            warn!("transition event queue full, dropping event");
        }
    }
}

impl RelayBank for SimulatedBank {
    fn output_states(&self) -> u32 {
        self.inner.state.lock().outputs
    }

    fn apply(&self, plan: &RelayUpdatePlan) {
        match plan.kind {
            UpdateKind::Immediate | UpdateKind::ToggleOnly => {
                self.write_outputs(plan.states, plan.mask);
            }
            UpdateKind::Pulsed { duration_ms } => {
                let prior = self.write_outputs(plan.states, plan.mask);
                let bank = self.clone();
                let mask = plan.mask;
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(duration_ms as u64)).await;
                    bank.write_outputs(prior, mask);
                });
            }
        }
    }
}

impl IoBank for SimulatedBank {
    fn input_states(&self) -> u32 {
        self.inner.state.lock().inputs
    }

    fn input_counter(&self, channel_index: u32) -> u32 {
        let state = self.inner.state.lock();
        state
            .counters
            .get(channel_index as usize)
            .copied()
            .unwrap_or(0)
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn immediate(mask: u32, states: u32) -> RelayUpdatePlan {
        RelayUpdatePlan {
            mask,
            states,
            kind: UpdateKind::Immediate,
        }
    }

    #[test]
    fn test_immediate_write_touches_only_masked_bits() {
        let (bank, _events) = SimulatedBank::new();
        bank.apply(&immediate(0b11, 0b01));
        bank.apply(&immediate(0b100, 0b100));
        assert_eq!(bank.output_states(), 0b101);
    }

    #[test]
    fn test_output_transitions_emitted_per_changed_bit() {
        let (bank, mut events) = SimulatedBank::new();
        bank.apply(&immediate(0b101, 0b101));

        let first = events.try_recv().unwrap();
        assert_eq!(first.kind, ChannelKind::RelayOutput);
        assert_eq!(first.channel, 1);
        assert!(first.state);
        assert_eq!(first.counter, None);

        let second = events.try_recv().unwrap();
        assert_eq!(second.channel, 3);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_rewriting_same_state_emits_nothing() {
        let (bank, mut events) = SimulatedBank::new();
        bank.apply(&immediate(0b1, 0b1));
        let _ = events.try_recv().unwrap();
        bank.apply(&immediate(0b1, 0b1));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_input_counter_increments_on_rising_edge_only() {
        let (bank, mut events) = SimulatedBank::new();
        bank.set_input(2, true);
        bank.set_input(2, false);
        bank.set_input(2, true);

        assert_eq!(bank.input_counter(1), 2);
        assert_eq!(bank.input_states(), 0b10);

        let rising = events.try_recv().unwrap();
        assert_eq!(rising.kind, ChannelKind::DigitalInput);
        assert_eq!(rising.channel, 2);
        assert_eq!(rising.counter, Some(1));

        let falling = events.try_recv().unwrap();
        assert!(!falling.state);
        assert_eq!(falling.counter, Some(1));
    }

    #[test]
    fn test_unchanged_input_is_ignored() {
        let (bank, mut events) = SimulatedBank::new();
        bank.set_input(1, false);
        assert!(events.try_recv().is_err());
        assert_eq!(bank.input_counter(0), 0);
    }

    #[test]
    fn test_out_of_range_reads_are_zero() {
        let (bank, _events) = SimulatedBank::new();
        assert_eq!(bank.input_counter(99), 0);
    }

    #[tokio::test]
    async fn test_pulsed_write_reverts_prior_states() {
        let (bank, _events) = SimulatedBank::new();
        bank.apply(&immediate(0b10, 0b10));
        bank.apply(&RelayUpdatePlan {
            mask: 0b11,
            states: 0b01,
            kind: UpdateKind::Pulsed { duration_ms: 20 },
        });
        assert_eq!(bank.output_states(), 0b01);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(bank.output_states(), 0b10);
    }

    #[tokio::test]
    async fn test_execute_chain_against_live_bank() {
        let (bank, _events) = SimulatedBank::new();
        relayctl_protocol::execute("c12,o1,t3", &bank);
        assert_eq!(bank.output_states(), 0b110);
    }
}
