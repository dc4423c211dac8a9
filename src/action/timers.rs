/// Delayed events owned by the action machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Block exit settled, re-evaluate intent
    BlockSettled,
    /// Stand-up clip's authored duration elapsed, re-arm intent handling
    DuckRearm,
    /// Victory delay elapsed, start turning to the camera
    VictoryTurn,
}

/// One-shot countdown timers, at most one per kind
#[derive(Debug, Clone, Default)]
pub struct Timers {
    entries: Vec<(TimerKind, f32)>,
}

impl Timers {
    /// Start (or restart) a timer
    pub fn start(&mut self, kind: TimerKind, delay: f32) {
        self.cancel(kind);
        self.entries.push((kind, delay));
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.entries.retain(|(k, _)| *k != kind);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Count down and return the timers that elapsed, in start order
    pub fn advance(&mut self, dt: f32) -> Vec<TimerKind> {
        let mut fired = Vec::new();
        self.entries.retain_mut(|(kind, remaining)| {
            *remaining -= dt;
            if *remaining <= 0.0 {
                fired.push(*kind);
                false
            } else {
                true
            }
        });
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_once() {
        let mut timers = Timers::default();
        timers.start(TimerKind::DuckRearm, 0.3);

        assert!(timers.advance(0.2).is_empty());
        assert_eq!(timers.advance(0.2), vec![TimerKind::DuckRearm]);
        assert!(timers.advance(1.0).is_empty());
    }

    #[test]
    fn test_restart_replaces() {
        let mut timers = Timers::default();
        timers.start(TimerKind::BlockSettled, 0.1);
        timers.start(TimerKind::BlockSettled, 0.5);
        assert!(timers.advance(0.2).is_empty());
        assert_eq!(timers.advance(0.4), vec![TimerKind::BlockSettled]);

        timers.start(TimerKind::BlockSettled, 0.1);
        timers.cancel(TimerKind::BlockSettled);
        assert!(timers.advance(1.0).is_empty());
    }
}
