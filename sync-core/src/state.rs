//! Channel state machine for boardsync.
//!
//! This module provides a pure, side-effect-free state machine for the
//! duplex channel to the game authority. The state machine takes events as
//! input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (connecting, sending the join handshake, sleeping between
//! attempts) is performed by sync-client, not by this module. This enables
//! instant unit testing without network mocks.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::ChannelEvent;

/// Channel state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    /// No channel.
    Disconnected,
    /// Connection attempt in progress.
    Connecting {
        /// Reconnect attempt this belongs to (0 for the first connect).
        attempt: u32,
    },
    /// Channel open and joined.
    Open,
    /// Channel lost, waiting to reconnect.
    Reconnecting {
        /// Number of the attempt the pending timer will start.
        attempt: u32,
    },
}

impl ChannelState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function apart from drawing backoff jitter. The caller
    /// (sync-client) is responsible for executing the returned actions.
    pub fn on_event(self, event: Event, policy: &ReconnectPolicy) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Disconnected
            (Self::Disconnected, Event::ConnectRequested) => {
                (Self::Connecting { attempt: 0 }, vec![Action::Connect])
            }

            // From Connecting
            (Self::Connecting { .. }, Event::ConnectSucceeded) => (
                Self::Open,
                vec![
                    Action::SendJoin,
                    Action::EmitEvent(ChannelEvent::Connected),
                ],
            ),
            (Self::Connecting { attempt }, Event::ConnectFailed { error }) => {
                let failed = if attempt == 0 {
                    ChannelEvent::ConnectionFailed { error }
                } else {
                    ChannelEvent::ReconnectFailed { attempt, error }
                };
                schedule_reconnect(attempt + 1, failed, policy)
            }
            (Self::Connecting { .. }, Event::DisconnectRequested) => {
                (Self::Disconnected, vec![Action::Close])
            }

            // From Open
            (Self::Open, Event::ChannelLost { reason }) => {
                let (state, mut actions) =
                    schedule_reconnect(1, ChannelEvent::Disconnected { reason }, policy);
                actions.insert(0, Action::Close);
                (state, actions)
            }
            (Self::Open, Event::DisconnectRequested) => (
                Self::Disconnected,
                vec![
                    Action::Close,
                    Action::EmitEvent(ChannelEvent::Disconnected {
                        reason: "user requested".into(),
                    }),
                ],
            ),

            // From Reconnecting
            (Self::Reconnecting { attempt }, Event::ReconnectTimer) => {
                (Self::Connecting { attempt }, vec![Action::Connect])
            }
            (Self::Reconnecting { .. }, Event::DisconnectRequested) => {
                (Self::Disconnected, vec![Action::CancelReconnect])
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the channel is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Check if currently trying to connect.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting { .. } | Self::Reconnecting { .. })
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

/// Either schedule attempt `next` or give up when the budget is spent.
fn schedule_reconnect(
    next: u32,
    failed: ChannelEvent,
    policy: &ReconnectPolicy,
) -> (ChannelState, Vec<Action>) {
    if next > policy.max_attempts {
        return (
            ChannelState::Disconnected,
            vec![
                Action::EmitEvent(failed),
                Action::EmitEvent(ChannelEvent::GaveUp {
                    attempts: next - 1,
                }),
            ],
        );
    }
    let delay = policy.backoff(next);
    (
        ChannelState::Reconnecting { attempt: next },
        vec![
            Action::EmitEvent(failed),
            Action::EmitEvent(ChannelEvent::Reconnecting {
                attempt: next,
                delay,
            }),
            Action::StartReconnectTimer { delay },
        ],
    )
}

/// Events that can occur in the channel lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User requested connection.
    ConnectRequested,
    /// Transport connection succeeded.
    ConnectSucceeded,
    /// Transport connection failed.
    ConnectFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// An open channel was lost.
    ChannelLost {
        /// Reason for disconnection.
        reason: String,
    },
    /// User requested disconnect.
    DisconnectRequested,
    /// Reconnect timer fired.
    ReconnectTimer,
}

/// Actions to be executed by the sync-client.
///
/// These are instructions, not side effects. The sync-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the transport.
    Connect,
    /// Send the join handshake.
    SendJoin,
    /// Close the transport.
    Close,
    /// Start a timer for reconnection.
    StartReconnectTimer {
        /// Delay before attempting reconnection.
        delay: Duration,
    },
    /// Cancel any pending reconnect timer.
    CancelReconnect,
    /// Emit an event to the application.
    EmitEvent(ChannelEvent),
}

/// Bounded exponential backoff with jitter.
///
/// Attempt `n` waits `min(max_delay, base_delay * 2^(n-1))` plus a random
/// jitter in `0..=jitter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Reconnect attempts before giving up (0 disables reconnecting).
    pub max_attempts: u32,
    /// Delay before the first attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on the exponential part, in milliseconds.
    pub max_delay_ms: u64,
    /// Upper bound on the random jitter, in milliseconds.
    pub jitter_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_ms: 1_000,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let base = self
            .base_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        Duration::from_millis(base.saturating_add(random_jitter_ms(self.jitter_ms)))
    }
}

/// Random jitter between 0 and `max` milliseconds inclusive.
///
/// Falls back to no jitter if the OS cannot supply randomness.
fn random_jitter_ms(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let mut bytes = [0u8; 8];
    if getrandom::getrandom(&mut bytes).is_err() {
        return 0;
    }
    u64::from_le_bytes(bytes) % (max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            jitter_ms: 500,
        }
    }

    #[test]
    fn starts_disconnected() {
        let state = ChannelState::new();
        assert!(matches!(state, ChannelState::Disconnected));
    }

    #[test]
    fn connect_request_transitions_to_connecting() {
        let state = ChannelState::Disconnected;
        let (new_state, actions) = state.on_event(Event::ConnectRequested, &policy());

        assert!(matches!(new_state, ChannelState::Connecting { attempt: 0 }));
        assert!(actions.iter().any(|a| matches!(a, Action::Connect)));
    }

    #[test]
    fn connect_success_sends_join() {
        let state = ChannelState::Connecting { attempt: 0 };
        let (new_state, actions) = state.on_event(Event::ConnectSucceeded, &policy());

        assert!(new_state.is_open());
        assert_eq!(actions[0], Action::SendJoin);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EmitEvent(ChannelEvent::Connected))));
    }

    #[test]
    fn connect_failure_triggers_reconnect() {
        let state = ChannelState::Connecting { attempt: 0 };
        let (new_state, actions) = state.on_event(
            Event::ConnectFailed {
                error: "timeout".into(),
            },
            &policy(),
        );

        assert!(matches!(new_state, ChannelState::Reconnecting { attempt: 1 }));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::EmitEvent(ChannelEvent::ConnectionFailed { .. })
        )));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::StartReconnectTimer { .. })));
    }

    #[test]
    fn reconnect_timer_transitions_to_connecting() {
        let state = ChannelState::Reconnecting { attempt: 2 };
        let (new_state, actions) = state.on_event(Event::ReconnectTimer, &policy());

        assert!(matches!(new_state, ChannelState::Connecting { attempt: 2 }));
        assert!(actions.iter().any(|a| matches!(a, Action::Connect)));
    }

    #[test]
    fn reconnect_failure_increments_attempt() {
        let state = ChannelState::Connecting { attempt: 2 };
        let (new_state, actions) = state.on_event(
            Event::ConnectFailed {
                error: "refused".into(),
            },
            &policy(),
        );

        assert!(matches!(new_state, ChannelState::Reconnecting { attempt: 3 }));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::EmitEvent(ChannelEvent::ReconnectFailed { attempt: 2, .. })
        )));
    }

    #[test]
    fn gives_up_when_budget_spent() {
        let state = ChannelState::Connecting { attempt: 3 };
        let (new_state, actions) = state.on_event(
            Event::ConnectFailed {
                error: "refused".into(),
            },
            &policy(),
        );

        assert_eq!(new_state, ChannelState::Disconnected);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EmitEvent(ChannelEvent::GaveUp { attempts: 3 }))));
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::StartReconnectTimer { .. })));
    }

    #[test]
    fn zero_budget_never_reconnects() {
        let no_retry = ReconnectPolicy {
            max_attempts: 0,
            ..policy()
        };
        let (state, actions) = ChannelState::Open.on_event(
            Event::ChannelLost {
                reason: "reset".into(),
            },
            &no_retry,
        );
        assert_eq!(state, ChannelState::Disconnected);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EmitEvent(ChannelEvent::GaveUp { attempts: 0 }))));
    }

    #[test]
    fn lost_channel_closes_and_reconnects() {
        let (new_state, actions) = ChannelState::Open.on_event(
            Event::ChannelLost {
                reason: "connection reset".into(),
            },
            &policy(),
        );

        assert!(matches!(new_state, ChannelState::Reconnecting { attempt: 1 }));
        assert_eq!(actions[0], Action::Close);
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::EmitEvent(ChannelEvent::Disconnected { reason }) if reason == "connection reset"
        )));
    }

    #[test]
    fn full_reconnection_flow() {
        let policy = policy();
        let state = ChannelState::Open;

        let (state, _) = state.on_event(
            Event::ChannelLost {
                reason: "gone".into(),
            },
            &policy,
        );
        let (state, _) = state.on_event(Event::ReconnectTimer, &policy);
        assert!(matches!(state, ChannelState::Connecting { attempt: 1 }));

        let (state, actions) = state.on_event(Event::ConnectSucceeded, &policy);
        assert!(state.is_open());
        assert!(actions.contains(&Action::SendJoin));
    }

    #[test]
    fn disconnect_request_from_open() {
        let (new_state, actions) = ChannelState::Open.on_event(Event::DisconnectRequested, &policy());

        assert!(matches!(new_state, ChannelState::Disconnected));
        assert!(actions.iter().any(|a| matches!(a, Action::Close)));
    }

    #[test]
    fn disconnect_request_from_reconnecting_cancels() {
        let state = ChannelState::Reconnecting { attempt: 2 };
        let (new_state, actions) = state.on_event(Event::DisconnectRequested, &policy());

        assert!(matches!(new_state, ChannelState::Disconnected));
        assert!(actions.iter().any(|a| matches!(a, Action::CancelReconnect)));
    }

    #[test]
    fn invalid_transition_is_ignored() {
        let (state, actions) = ChannelState::Disconnected.on_event(Event::ReconnectTimer, &policy());
        assert_eq!(state, ChannelState::Disconnected);
        assert!(actions.is_empty());
    }

    #[test]
    fn is_open_and_connecting_helpers() {
        assert!(!ChannelState::Disconnected.is_open());
        assert!(ChannelState::Open.is_open());
        assert!(ChannelState::Connecting { attempt: 0 }.is_connecting());
        assert!(ChannelState::Reconnecting { attempt: 1 }.is_connecting());
        assert!(!ChannelState::Open.is_connecting());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy {
            jitter_ms: 0,
            ..policy()
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(5), Duration::from_secs(8));
        assert_eq!(policy.backoff(60), Duration::from_secs(8));
    }

    #[test]
    fn backoff_jitter_stays_in_bounds() {
        let policy = policy();
        for _ in 0..50 {
            let delay = policy.backoff(2);
            assert!(delay >= Duration::from_millis(2_000));
            assert!(delay <= Duration::from_millis(2_500));
        }
    }

    #[test]
    fn reconnect_jitter_creates_variance() {
        let policy = ReconnectPolicy {
            jitter_ms: 5_000,
            ..policy()
        };
        let delays: Vec<Duration> = (0..20).map(|_| policy.backoff(1)).collect();
        let min = delays.iter().min().unwrap();
        let max = delays.iter().max().unwrap();

        // 20 samples over 5001 values; a spread under 100ms is vanishingly rare.
        assert!(
            max.as_millis() - min.as_millis() >= 100,
            "Expected jitter variance, got min={:?} max={:?}",
            min,
            max
        );
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: ReconnectPolicy = serde_json::from_str(r#"{"max_attempts": 2}"#).unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay_ms, 1_000);
        assert_eq!(policy.max_delay_ms, 30_000);
    }
}
