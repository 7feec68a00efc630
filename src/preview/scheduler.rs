//! Debounce and single-flight decisions for live preview, on a logical clock.
//!
//! Every transition takes the current instant as an argument; the scheduler
//! never reads a clock or sleeps, so its behaviour is fully determined by the
//! sequence of calls.

use std::time::Duration;

use tokio::time::Instant;

/// Delay between the last edit and the preview render
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Idle,
    /// A render is due at `deadline` unless another edit pushes it back
    Pending { deadline: Instant },
    /// A render is in flight. `next_deadline` is the debounce deadline of
    /// edits made meanwhile; reaching it while still rendering drops it.
    Rendering { next_deadline: Option<Instant> },
}

/// Identifies a started render; handed back on settle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// Start a render now
    Render(RenderTicket),
    /// The deadline elapsed during an in-flight render and was discarded
    Dropped,
    NotDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    /// Edits arrived after the render read its inputs
    pub stale: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewStats {
    pub edits: u64,
    pub renders: u64,
    pub dropped: u64,
    pub failures: u64,
}

#[derive(Debug)]
pub struct RenderScheduler {
    debounce: Duration,
    state: PreviewState,
    /// Edit counter; a ticket is current while it matches
    generation: u64,
    stats: PreviewStats,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl RenderScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: PreviewState::Idle,
            generation: 0,
            stats: PreviewStats::default(),
        }
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    pub fn stats(&self) -> PreviewStats {
        self.stats
    }

    pub fn is_rendering(&self) -> bool {
        matches!(self.state, PreviewState::Rendering { .. })
    }

    /// The next instant [`on_timer`](Self::on_timer) has work to do at
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            PreviewState::Idle => None,
            PreviewState::Pending { deadline } => Some(deadline),
            PreviewState::Rendering { next_deadline } => next_deadline,
        }
    }

    /// Record an edit, replacing any armed deadline with `now + debounce`.
    pub fn on_edit(&mut self, now: Instant) {
        self.generation += 1;
        self.stats.edits += 1;

        let deadline = now + self.debounce;
        self.state = match self.state {
            PreviewState::Idle | PreviewState::Pending { .. } => PreviewState::Pending { deadline },
            PreviewState::Rendering { .. } => PreviewState::Rendering {
                next_deadline: Some(deadline),
            },
        };
    }

    /// Fire the debounce timer.
    pub fn on_timer(&mut self, now: Instant) -> TimerOutcome {
        match self.state {
            PreviewState::Pending { deadline } if now >= deadline => {
                self.state = PreviewState::Rendering {
                    next_deadline: None,
                };
                TimerOutcome::Render(self.begin())
            }
            PreviewState::Rendering {
                next_deadline: Some(deadline),
            } if now >= deadline => {
                // single flight: no queueing behind the running render
                self.state = PreviewState::Rendering {
                    next_deadline: None,
                };
                self.stats.dropped += 1;
                TimerOutcome::Dropped
            }
            _ => TimerOutcome::NotDue,
        }
    }

    /// Start a render immediately unless one is already in flight.
    ///
    /// An armed debounce deadline stays armed and will be dropped if it
    /// elapses before this render settles.
    pub fn start_now(&mut self) -> Option<RenderTicket> {
        let next_deadline = match self.state {
            PreviewState::Idle => None,
            PreviewState::Pending { deadline } => Some(deadline),
            PreviewState::Rendering { .. } => return None,
        };

        self.state = PreviewState::Rendering { next_deadline };
        Some(self.begin())
    }

    /// The in-flight render finished, successfully or not.
    pub fn on_settled(&mut self, ticket: RenderTicket) -> Settled {
        self.state = match self.state {
            PreviewState::Rendering {
                next_deadline: Some(deadline),
            } => PreviewState::Pending { deadline },
            _ => PreviewState::Idle,
        };

        Settled {
            stale: ticket.generation != self.generation,
        }
    }

    /// Count a failed render
    pub fn record_failure(&mut self) {
        self.stats.failures += 1;
    }

    fn begin(&mut self) -> RenderTicket {
        self.stats.renders += 1;
        RenderTicket {
            generation: self.generation,
        }
    }
}
