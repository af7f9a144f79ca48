//! Drive the projector toward a target power state and wait for it to settle

use std::{
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, info};

use crate::status::PowerState;

/// Something that can report its power state and receive a toggle pulse
pub trait Projector {
    /// Measure the current state. Failures are reported as [`PowerState::Unknown`].
    fn current_state(&mut self) -> PowerState;

    /// Send one toggle pulse. Failures are not reported.
    fn pulse_toggle(&mut self);
}

/// Source of time for a poll session
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;

    /// Block for the given duration
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock backed by [`thread::sleep`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Desired power transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bring the projector to [`PowerState::On`]
    PowerOn,
    /// Bring the projector to [`PowerState::Off`]
    PowerOff,
}

/// What to do before polling starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Target already reached, nothing to do
    Satisfied,
    /// Send a toggle pulse then poll
    Toggle,
    /// Poll without toggling
    Wait,
}

/// Timing of a poll session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two status measurements
    pub interval: Duration,
    /// Time after which the session gives up
    pub max_wait: Duration,
}

impl Direction {
    /// State this direction converges to
    pub fn target(&self) -> PowerState {
        match self {
            Direction::PowerOn => PowerState::On,
            Direction::PowerOff => PowerState::Off,
        }
    }

    /// Default timing. Cooldown is hardware bound and slower than startup.
    pub fn policy(&self) -> PollPolicy {
        match self {
            Direction::PowerOn => PollPolicy {
                interval: Duration::from_secs(3),
                max_wait: Duration::from_secs(90),
            },
            Direction::PowerOff => PollPolicy {
                interval: Duration::from_secs(5),
                max_wait: Duration::from_secs(180),
            },
        }
    }

    /// Decide the initial action from the measured state.
    ///
    /// The toggle is a stateless pulse, so it must not be sent while the projector cools down:
    /// that would power it back on.
    pub fn initial_action(&self, current: PowerState) -> Action {
        if current == self.target() {
            return Action::Satisfied;
        }
        match (self, current) {
            (Direction::PowerOff, PowerState::Cooling) => Action::Wait,
            _ => Action::Toggle,
        }
    }
}

/// Result of a convergence session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Target was reached before any action
    AlreadySatisfied,
    /// Target was reached while polling
    Converged {
        /// Time spent polling
        elapsed: Duration,
    },
    /// Deadline expired before the target was reached
    TimedOut {
        /// Time spent polling
        elapsed: Duration,
        /// Last measured state, the initial one when no poll happened
        last: PowerState,
    },
}

impl Outcome {
    /// Whether the target state was reached
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::TimedOut { .. })
    }

    /// Process exit code reported by the power tools
    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Sleep one interval, measure, and repeat until `predicate` holds or `max_wait` elapsed.
///
/// Returns the matching state, or on timeout the last measured one (`None` when the deadline
/// expired before any measurement).
pub fn poll_until<P, C, F>(
    projector: &mut P,
    clock: &mut C,
    policy: PollPolicy,
    mut predicate: F,
) -> Result<(PowerState, Duration), (Option<PowerState>, Duration)>
where
    P: Projector + ?Sized,
    C: Clock + ?Sized,
    F: FnMut(PowerState) -> bool,
{
    let start = clock.now();
    let mut last = None;

    while clock.now().duration_since(start) < policy.max_wait {
        clock.sleep(policy.interval);
        let state = projector.current_state();
        info!(status = %state, "poll");
        if predicate(state) {
            return Ok((state, clock.now().duration_since(start)));
        }
        last = Some(state);
    }

    Err((last, clock.now().duration_since(start)))
}

/// Bring the projector from `current` to the direction's target using its default timing
pub fn converge<P, C>(
    projector: &mut P,
    clock: &mut C,
    direction: Direction,
    current: PowerState,
) -> Outcome
where
    P: Projector + ?Sized,
    C: Clock + ?Sized,
{
    converge_with(projector, clock, direction, direction.policy(), current)
}

/// Bring the projector from `current` to the direction's target with explicit timing.
///
/// At most one toggle is sent, before polling starts. It is never resent.
pub fn converge_with<P, C>(
    projector: &mut P,
    clock: &mut C,
    direction: Direction,
    policy: PollPolicy,
    current: PowerState,
) -> Outcome
where
    P: Projector + ?Sized,
    C: Clock + ?Sized,
{
    let target = direction.target();
    match direction.initial_action(current) {
        Action::Satisfied => {
            info!(status = %current, "projector already {target}");
            return Outcome::AlreadySatisfied;
        }
        Action::Wait => {
            info!(status = %current, "projector is transitioning, waiting for {target}")
        }
        Action::Toggle => {
            info!(status = %current, "sending toggle to power {target}");
            projector.pulse_toggle();
        }
    }

    debug!(?policy, "polling for {target}");
    match poll_until(projector, clock, policy, |state| state == target) {
        Ok((_, elapsed)) => {
            info!(?elapsed, "projector is now {target}");
            Outcome::Converged { elapsed }
        }
        Err((last, elapsed)) => Outcome::TimedOut { elapsed, last: last.unwrap_or(current) },
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::VecDeque,
        time::{Duration, Instant},
    };

    use super::{converge, converge_with, Action, Clock, Direction, Outcome, PollPolicy, Projector};
    use crate::status::PowerState;

    /// Replays a fixed sequence of readings, repeating the last one forever
    struct ScriptedProjector {
        readings: VecDeque<PowerState>,
        reads: usize,
        toggles: usize,
        reads_before_toggle: Option<usize>,
    }

    impl ScriptedProjector {
        fn new(readings: &[PowerState]) -> Self {
            Self {
                readings: readings.iter().copied().collect(),
                reads: 0,
                toggles: 0,
                reads_before_toggle: None,
            }
        }
    }

    impl Projector for ScriptedProjector {
        fn current_state(&mut self) -> PowerState {
            self.reads += 1;
            if self.readings.len() > 1 {
                self.readings.pop_front().unwrap()
            } else {
                *self.readings.front().unwrap()
            }
        }

        fn pulse_toggle(&mut self) {
            self.toggles += 1;
            self.reads_before_toggle.get_or_insert(self.reads);
        }
    }

    struct FakeClock {
        base: Instant,
        offset: Duration,
    }

    impl FakeClock {
        fn new() -> Self {
            Self { base: Instant::now(), offset: Duration::ZERO }
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.base + self.offset
        }

        fn sleep(&mut self, duration: Duration) {
            self.offset += duration;
        }
    }

    fn start(
        projector: &mut ScriptedProjector,
        clock: &mut FakeClock,
        direction: Direction,
    ) -> Outcome {
        let current = projector.current_state();
        converge(projector, clock, direction, current)
    }

    #[test]
    pub fn should_pick_initial_action() {
        use PowerState::*;
        assert_eq!(Direction::PowerOff.initial_action(Off), Action::Satisfied);
        assert_eq!(Direction::PowerOff.initial_action(Cooling), Action::Wait);
        assert_eq!(Direction::PowerOff.initial_action(On), Action::Toggle);
        assert_eq!(Direction::PowerOff.initial_action(Unknown), Action::Toggle);
        assert_eq!(Direction::PowerOn.initial_action(On), Action::Satisfied);
        assert_eq!(Direction::PowerOn.initial_action(Off), Action::Toggle);
        assert_eq!(Direction::PowerOn.initial_action(Cooling), Action::Toggle);
        assert_eq!(Direction::PowerOn.initial_action(Unknown), Action::Toggle);
    }

    #[test]
    pub fn should_not_touch_projector_already_off() {
        let mut projector = ScriptedProjector::new(&[PowerState::Off]);
        let mut clock = FakeClock::new();

        let outcome = start(&mut projector, &mut clock, Direction::PowerOff);

        assert_eq!(outcome, Outcome::AlreadySatisfied);
        assert_eq!(projector.toggles, 0);
        assert_eq!(projector.reads, 1);
        assert_eq!(clock.offset, Duration::ZERO);
    }

    #[test]
    pub fn should_wait_without_toggle_while_cooling() {
        use PowerState::*;
        let mut projector = ScriptedProjector::new(&[Cooling, Cooling, Off]);
        let mut clock = FakeClock::new();

        let outcome = start(&mut projector, &mut clock, Direction::PowerOff);

        assert_eq!(outcome, Outcome::Converged { elapsed: Duration::from_secs(10) });
        assert_eq!(projector.toggles, 0);
        assert_eq!(projector.reads, 3);
    }

    #[test]
    pub fn should_toggle_once_and_converge_to_on() {
        use PowerState::*;
        let mut projector = ScriptedProjector::new(&[Off, Off, On]);
        let mut clock = FakeClock::new();

        let outcome = start(&mut projector, &mut clock, Direction::PowerOn);

        assert_eq!(outcome, Outcome::Converged { elapsed: Duration::from_secs(6) });
        assert_eq!(projector.toggles, 1);
        assert_eq!(projector.reads_before_toggle, Some(1));
        assert_eq!(projector.reads, 3);
        assert!(clock.offset <= Direction::PowerOn.policy().max_wait);
    }

    #[test]
    pub fn should_toggle_unknown_projector_off() {
        use PowerState::*;
        let mut projector = ScriptedProjector::new(&[Unknown, Cooling, Off]);
        let mut clock = FakeClock::new();

        let outcome = start(&mut projector, &mut clock, Direction::PowerOff);

        assert!(outcome.is_success());
        assert_eq!(projector.toggles, 1);
    }

    #[test]
    pub fn should_time_out_without_resending_toggle() {
        let mut projector = ScriptedProjector::new(&[PowerState::Off]);
        let mut clock = FakeClock::new();
        let policy = PollPolicy {
            interval: Duration::from_secs(3),
            max_wait: Duration::from_secs(10),
        };

        let current = projector.current_state();
        let outcome =
            converge_with(&mut projector, &mut clock, Direction::PowerOn, policy, current);

        match outcome {
            Outcome::TimedOut { elapsed, last } => {
                assert!(elapsed >= policy.max_wait);
                assert_eq!(last, PowerState::Off);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(projector.toggles, 1);
        assert_eq!(projector.reads, 1 + 4);
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    pub fn should_report_initial_state_when_deadline_is_zero() {
        let mut projector = ScriptedProjector::new(&[PowerState::Cooling]);
        let mut clock = FakeClock::new();
        let policy = PollPolicy { interval: Duration::from_secs(5), max_wait: Duration::ZERO };

        let current = projector.current_state();
        let outcome =
            converge_with(&mut projector, &mut clock, Direction::PowerOff, policy, current);

        assert_eq!(
            outcome,
            Outcome::TimedOut { elapsed: Duration::ZERO, last: PowerState::Cooling }
        );
        assert_eq!(projector.reads, 1);
        assert_eq!(projector.toggles, 0);
    }

    #[test]
    pub fn should_use_direction_timing() {
        assert_eq!(Direction::PowerOn.policy().interval, Duration::from_secs(3));
        assert_eq!(Direction::PowerOn.policy().max_wait, Duration::from_secs(90));
        assert_eq!(Direction::PowerOff.policy().interval, Duration::from_secs(5));
        assert_eq!(Direction::PowerOff.policy().max_wait, Duration::from_secs(180));
    }
}
