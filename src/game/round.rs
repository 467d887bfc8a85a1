use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Waiting,
    Playing,
    Ending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledKind {
    Restart,
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAction {
    pub kind: ScheduledKind,
    pub due_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEnd {
    Winner(String),
    NoSurvivors,
}

/// Phase plus the single pending deferred action. Once scheduled, an action
/// fires on the first tick at or after its due time.
#[derive(Debug, Clone)]
pub struct Round {
    phase: RoundPhase,
    scheduled: Option<ScheduledAction>,
}

impl Round {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Waiting,
            scheduled: None,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn scheduled(&self) -> Option<ScheduledAction> {
        self.scheduled
    }

    pub fn is_playing(&self) -> bool {
        self.phase == RoundPhase::Playing
    }

    /// Waiting with enough players and nothing already pending.
    pub fn can_start(&self, active: usize) -> bool {
        self.phase == RoundPhase::Waiting && self.scheduled.is_none() && active >= 2
    }

    pub fn start(&mut self) {
        self.phase = RoundPhase::Playing;
    }

    pub fn pause(&mut self) {
        self.phase = RoundPhase::Waiting;
    }

    pub fn finish(&mut self, now: i64, restart_delay_ms: i64) {
        self.phase = RoundPhase::Ending;
        self.scheduled = Some(ScheduledAction {
            kind: ScheduledKind::Restart,
            due_at: now + restart_delay_ms,
        });
    }

    pub fn restart(&mut self) {
        self.phase = RoundPhase::Waiting;
    }

    pub fn schedule_start(&mut self, now: i64, grace_ms: i64) {
        self.scheduled = Some(ScheduledAction {
            kind: ScheduledKind::Start,
            due_at: now + grace_ms,
        });
    }

    /// Pops the pending action if it is due.
    pub fn take_due(&mut self, now: i64) -> Option<ScheduledKind> {
        match self.scheduled {
            Some(action) if now >= action.due_at => {
                self.scheduled = None;
                Some(action.kind)
            }
            _ => None,
        }
    }
}

impl Default for Round {
    fn default() -> Self {
        Self::new()
    }
}

/// `alive` lists the session ids of living trails, `total` counts every
/// active trail.
pub fn evaluate_round_end(alive: &[String], total: usize) -> Option<RoundEnd> {
    match alive {
        [] => Some(RoundEnd::NoSurvivors),
        [winner] if total > 1 => Some(RoundEnd::Winner(winner.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_end_needs_a_contest() {
        let a = "a".to_string();
        let b = "b".to_string();
        assert_eq!(evaluate_round_end(&[], 2), Some(RoundEnd::NoSurvivors));
        assert_eq!(
            evaluate_round_end(&[a.clone()], 2),
            Some(RoundEnd::Winner(a.clone()))
        );
        assert_eq!(evaluate_round_end(&[a.clone()], 1), None);
        assert_eq!(evaluate_round_end(&[a, b], 3), None);
    }

    #[test]
    fn scheduled_action_fires_once_when_due() {
        let mut round = Round::new();
        round.start();
        round.finish(1_000, 3_000);
        assert_eq!(round.phase(), RoundPhase::Ending);
        assert_eq!(round.take_due(3_999), None);
        assert_eq!(round.take_due(4_000), Some(ScheduledKind::Restart));
        assert_eq!(round.take_due(9_000), None);
    }

    #[test]
    fn start_is_blocked_while_an_action_is_pending() {
        let mut round = Round::new();
        assert!(!round.can_start(1));
        assert!(round.can_start(2));
        round.schedule_start(0, 500);
        assert!(!round.can_start(3));
        assert_eq!(round.take_due(500), Some(ScheduledKind::Start));
        assert!(round.can_start(3));
    }
}
