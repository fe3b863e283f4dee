//! Three-state proximity machine (C7): FAR -> CANDIDATE -> LOCKOUT.

use crate::features::FeatureSnapshot;
use crate::fixed::time_diff;
use crate::params::Params;

/// The proximity state of one tracked phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProxState {
    /// The phone is away; no secure handshake is warranted.
    #[default]
    Far,
    /// The phone crossed the entry threshold; stability is being verified.
    Candidate,
    /// An unlock just fired; re-fire is suppressed until the lockout timer
    /// elapses and exit is confirmed.
    Lockout,
}

/// The event a single `tick` may emit. At most one per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    /// Nothing happened this tick.
    #[default]
    None,
    /// FAR -> CANDIDATE: the signal crossed the entry threshold.
    CandidateStarted,
    /// CANDIDATE -> LOCKOUT: stability gate held for `stable_ms`.
    UnlockTriggered,
    /// CANDIDATE/LOCKOUT -> FAR: confirmed exit.
    ExitToFar,
}

/// Owns the proximity state and its three timers, and runs the transition
/// table against one tick's features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMachine {
    state: ProxState,
    t_candidate_start_ms: Option<u32>,
    t_below_exit_start_ms: Option<u32>,
    t_lockout_until_ms: u32,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Returns a fresh machine in FAR with all timers cleared.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ProxState::Far,
            t_candidate_start_ms: None,
            t_below_exit_start_ms: None,
            t_lockout_until_ms: 0,
        }
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> ProxState {
        self.state
    }

    fn is_stable(f: &FeatureSnapshot, params: &Params) -> bool {
        f.pct_above_enter_q15 >= params.pct_th_q15 && f.std_q4 <= params.std_th_q4
    }

    /// True if `now_ms` is still strictly before `self.t_lockout_until_ms`,
    /// tolerant of a single 32-bit wraparound.
    fn still_locked(&self, now_ms: u32) -> bool {
        (self.t_lockout_until_ms.wrapping_sub(now_ms) as i32) > 0
    }

    /// Runs one tick of the transition table against the given features,
    /// mutating internal timers and state, and returns the event (if any).
    pub fn step(&mut self, now_ms: u32, f: &FeatureSnapshot, params: &Params) -> Event {
        let x = f.last_q4;
        match self.state {
            ProxState::Far => {
                if x >= params.enter_near_q4 {
                    self.state = ProxState::Candidate;
                    self.t_candidate_start_ms = Some(now_ms);
                    self.t_below_exit_start_ms = None;
                    Event::CandidateStarted
                } else {
                    Event::None
                }
            }
            ProxState::Candidate => {
                // Exit check precedes stability: a phone being taken away
                // must not "win" an unlock on the same tick. Only a
                // *confirmed* exit (debounce elapsed) short-circuits the
                // stability/instability evaluation below; a sub-exit tick
                // still runs it, so instability still restarts the hold.
                if x < params.exit_near_q4 {
                    let start = *self.t_below_exit_start_ms.get_or_insert(now_ms);
                    if time_diff(now_ms, start) >= params.exit_confirm_ms {
                        self.enter_far();
                        return Event::ExitToFar;
                    }
                } else {
                    self.t_below_exit_start_ms = None;
                }

                if Self::is_stable(f, params) {
                    let start = self.t_candidate_start_ms.unwrap_or(now_ms);
                    if time_diff(now_ms, start) >= params.stable_ms {
                        self.state = ProxState::Lockout;
                        self.t_lockout_until_ms = now_ms.wrapping_add(params.lockout_ms);
                        self.t_candidate_start_ms = None;
                        self.t_below_exit_start_ms = None;
                        Event::UnlockTriggered
                    } else {
                        Event::None
                    }
                } else {
                    // Instability restarts the stability hold.
                    self.t_candidate_start_ms = Some(now_ms);
                    Event::None
                }
            }
            ProxState::Lockout => {
                if self.still_locked(now_ms) {
                    return Event::None;
                }
                if x < params.exit_near_q4 {
                    let start = *self.t_below_exit_start_ms.get_or_insert(now_ms);
                    if time_diff(now_ms, start) >= params.exit_confirm_ms {
                        self.enter_far();
                        Event::ExitToFar
                    } else {
                        Event::None
                    }
                } else {
                    self.t_below_exit_start_ms = None;
                    Event::None
                }
            }
        }
    }

    fn enter_far(&mut self) {
        self.state = ProxState::Far;
        self.t_candidate_start_ms = None;
        self.t_below_exit_start_ms = None;
        self.t_lockout_until_ms = 0;
    }
}
