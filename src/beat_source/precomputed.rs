use super::{BeatPulse, BeatSource, SourceKind};
use crate::config::HitTolerance;
use crate::schedule::BeatSchedule;

/// Beat source backed by an analysed [`BeatSchedule`].
pub struct PrecomputedSchedule {
    schedule: BeatSchedule,
    tolerance: HitTolerance,
    lookahead_ms: f64,
    /// First event not yet past the late tolerance.
    window_cursor: usize,
    /// First event not yet granted to a row.
    claim_cursor: usize,
    last_poll_ms: Option<f64>,
}

impl PrecomputedSchedule {
    pub fn new(schedule: BeatSchedule, tolerance: HitTolerance, lookahead_ms: f64) -> Self {
        Self {
            schedule,
            tolerance,
            lookahead_ms,
            window_cursor: 0,
            claim_cursor: 0,
            last_poll_ms: None,
        }
    }

    fn skip_stale(&self, mut cursor: usize, now_ms: f64) -> usize {
        let events = self.schedule.events();
        while cursor < events.len() && events[cursor].time_ms < now_ms - self.tolerance.late_ms {
            cursor += 1;
        }
        cursor
    }
}

impl BeatSource for PrecomputedSchedule {
    fn poll(&mut self, now_ms: f64) -> BeatPulse {
        let events = self.schedule.events();
        let upto = self.schedule.next_index_after(now_ms);

        let onset = match self.last_poll_ms {
            Some(prev) => upto > self.schedule.next_index_after(prev),
            None => upto > 0 && events[upto - 1].time_ms >= 0.0,
        };
        self.last_poll_ms = Some(now_ms);

        let last_beat_ms = upto.checked_sub(1).map(|i| events[i].time_ms);

        self.window_cursor = self.skip_stale(self.window_cursor, now_ms);
        let window_anchor = events[self.window_cursor..]
            .iter()
            .take_while(|e| e.time_ms - now_ms <= self.tolerance.early_ms)
            .map(|e| e.time_ms)
            .min_by(|a, b| (a - now_ms).abs().total_cmp(&(b - now_ms).abs()));

        BeatPulse {
            onset,
            last_beat_ms,
            window_anchor,
        }
    }

    fn claim_target(&mut self, now_ms: f64) -> bool {
        self.claim_cursor = self.skip_stale(self.claim_cursor, now_ms);
        match self.schedule.events().get(self.claim_cursor) {
            Some(event) if event.time_ms - now_ms <= self.lookahead_ms => {
                self.claim_cursor += 1;
                true
            }
            _ => false,
        }
    }

    fn rewind(&mut self) {
        self.window_cursor = 0;
        self.claim_cursor = 0;
        self.last_poll_ms = None;
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Precomputed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{BandTag, BeatEvent};

    const TOL: HitTolerance = HitTolerance {
        early_ms: 200.0,
        late_ms: 200.0,
    };

    fn source(times: &[f64]) -> PrecomputedSchedule {
        let events = times
            .iter()
            .map(|&time_ms| BeatEvent {
                time_ms,
                band: BandTag::Bass,
                strength: 3.0,
            })
            .collect();
        PrecomputedSchedule::new(BeatSchedule::new(events, 10_000.0), TOL, 1000.0)
    }

    #[test]
    fn no_target_when_next_beat_beyond_lookahead() {
        let mut src = source(&[1500.0]);
        assert!(!src.claim_target(0.0));
        assert!(src.claim_target(600.0));
    }

    #[test]
    fn recently_passed_beat_still_grants_target() {
        let mut src = source(&[500.0]);
        assert!(src.claim_target(600.0));
    }

    #[test]
    fn beat_past_late_tolerance_grants_nothing() {
        let mut src = source(&[500.0]);
        assert!(!src.claim_target(800.0));
    }

    #[test]
    fn each_beat_grants_one_target() {
        let mut src = source(&[500.0, 2600.0]);
        assert!(src.claim_target(0.0));
        assert!(!src.claim_target(100.0));
        assert!(src.claim_target(1700.0));
        assert!(!src.claim_target(1800.0));
    }

    #[test]
    fn lookahead_boundary_is_inclusive() {
        let mut src = source(&[1000.0]);
        assert!(src.claim_target(0.0));
    }

    #[test]
    fn window_opens_around_beats() {
        let mut src = source(&[1000.0]);
        assert_eq!(src.poll(700.0).window_anchor, None);
        assert_eq!(src.poll(800.0).window_anchor, Some(1000.0));
        assert_eq!(src.poll(1000.0).window_anchor, Some(1000.0));
        assert_eq!(src.poll(1200.0).window_anchor, Some(1000.0));
        assert_eq!(src.poll(1201.0).window_anchor, None);
    }

    #[test]
    fn window_anchors_to_nearest_beat() {
        let mut src = source(&[1000.0, 1300.0]);
        assert_eq!(src.poll(1100.0).window_anchor, Some(1000.0));
        assert_eq!(src.poll(1180.0).window_anchor, Some(1300.0));
    }

    #[test]
    fn onset_fires_once_per_beat() {
        let mut src = source(&[500.0, 1000.0]);
        assert!(!src.poll(0.0).onset);
        assert!(!src.poll(400.0).onset);
        let pulse = src.poll(520.0);
        assert!(pulse.onset);
        assert_eq!(pulse.last_beat_ms, Some(500.0));
        assert!(!src.poll(600.0).onset);
        assert!(src.poll(1000.0).onset);
    }

    #[test]
    fn rewind_restores_claims() {
        let mut src = source(&[500.0]);
        assert!(src.claim_target(0.0));
        src.rewind();
        assert!(src.claim_target(0.0));
    }

    #[test]
    fn empty_schedule_never_targets() {
        let mut src = source(&[]);
        assert!(!src.claim_target(0.0));
        let pulse = src.poll(0.0);
        assert!(!pulse.onset);
        assert_eq!(pulse.window_anchor, None);
    }
}
