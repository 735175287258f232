//! Test pulser control
//!
//! The pulser is a square wave on a dedicated output, generated by a
//! hardware timer. Firmware only starts and stops it.

use crate::hw::PulseTimer;

/// Timer configuration applied once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PulserConfig {
    /// Period in microseconds
    pub period_us: u32,
    /// Duty cycle in 1/1024 steps
    pub duty: u16,
}

impl PulserConfig {
    /// Full scale of [`PulserConfig::duty`]
    pub const DUTY_SCALE: u16 = 1024;

    /// Output frequency in Hz
    pub const fn frequency_hz(&self) -> u32 {
        if self.period_us == 0 {
            0
        } else {
            1_000_000 / self.period_us
        }
    }
}

impl Default for PulserConfig {
    /// 2 kHz, 50 % duty
    fn default() -> Self {
        Self {
            period_us: 500,
            duty: 512,
        }
    }
}

/// Whether the pulser output is toggling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PulserState {
    /// Output idle
    #[default]
    Stopped,
    /// Output toggling
    Running,
}

/// What a pulser command asks for, decided from the last header segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulserAction {
    /// `...:ENAble`
    Enable,
    /// `...:DISable`
    Disable,
}

impl PulserAction {
    /// Classify a header segment by its `ENA` / `DIS` prefix
    pub fn from_segment(segment: &str) -> Option<Self> {
        let prefix = segment.get(..3)?;
        if prefix.eq_ignore_ascii_case("ENA") {
            Some(PulserAction::Enable)
        } else if prefix.eq_ignore_ascii_case("DIS") {
            Some(PulserAction::Disable)
        } else {
            None
        }
    }
}

/// Owns the pulse timer and tracks whether it runs
pub struct Pulser<T> {
    timer: T,
    config: PulserConfig,
    state: PulserState,
}

impl<T: PulseTimer> Pulser<T> {
    /// Configure the timer and leave it stopped
    pub fn new(mut timer: T, config: PulserConfig) -> Self {
        timer.init(&config);
        timer.stop();
        Self {
            timer,
            config,
            state: PulserState::Stopped,
        }
    }

    /// Start the output
    pub fn enable(&mut self) {
        self.timer.start();
        self.state = PulserState::Running;
    }

    /// Stop the output
    pub fn disable(&mut self) {
        self.timer.stop();
        self.state = PulserState::Stopped;
    }

    /// Apply an action
    pub fn apply(&mut self, action: PulserAction) {
        match action {
            PulserAction::Enable => self.enable(),
            PulserAction::Disable => self.disable(),
        }
    }

    /// Current state
    pub fn state(&self) -> PulserState {
        self.state
    }

    /// Timer configuration
    pub fn config(&self) -> &PulserConfig {
        &self.config
    }

    /// The underlying timer
    pub fn timer(&self) -> &T {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, LineLog, RecordingTimer};

    #[test]
    fn test_new_initialises_stopped() {
        let log = LineLog::default();
        let pulser = Pulser::new(RecordingTimer::new(&log), PulserConfig::default());
        assert_eq!(pulser.state(), PulserState::Stopped);
        assert_eq!(
            log.events(),
            vec![
                Event::TimerInit(PulserConfig {
                    period_us: 500,
                    duty: 512
                }),
                Event::TimerStop
            ]
        );
        assert_eq!(pulser.config().frequency_hz(), 2000);
    }

    #[test]
    fn test_enable_disable() {
        let log = LineLog::default();
        let mut pulser = Pulser::new(RecordingTimer::new(&log), PulserConfig::default());
        log.clear();

        pulser.enable();
        assert_eq!(pulser.state(), PulserState::Running);
        pulser.apply(PulserAction::Disable);
        assert_eq!(pulser.state(), PulserState::Stopped);
        assert_eq!(log.events(), vec![Event::TimerStart, Event::TimerStop]);
    }

    #[test]
    fn test_action_from_segment() {
        assert_eq!(PulserAction::from_segment("ENAble"), Some(PulserAction::Enable));
        assert_eq!(PulserAction::from_segment("ena"), Some(PulserAction::Enable));
        assert_eq!(PulserAction::from_segment("DIS"), Some(PulserAction::Disable));
        assert_eq!(PulserAction::from_segment("disABLE"), Some(PulserAction::Disable));
        assert_eq!(PulserAction::from_segment("EN"), None);
        assert_eq!(PulserAction::from_segment("STOP"), None);
    }
}
