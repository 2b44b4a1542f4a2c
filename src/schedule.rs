use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Result;

/// Named frequency sub-range analysed independently for onsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandTag {
    Bass,
    MidLow,
    Mid,
    High,
}

impl BandTag {
    pub const COUNT: usize = 4;
    pub const ALL: [BandTag; Self::COUNT] =
        [BandTag::Bass, BandTag::MidLow, BandTag::Mid, BandTag::High];

    pub fn index(self) -> usize {
        match self {
            BandTag::Bass => 0,
            BandTag::MidLow => 1,
            BandTag::Mid => 2,
            BandTag::High => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BandTag::Bass => "bass",
            BandTag::MidLow => "mid-low",
            BandTag::Mid => "mid",
            BandTag::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    pub time_ms: f64,
    pub band: BandTag,
    pub strength: f64,
}

/// Time-sorted beat events for one track. Replaced wholesale when a new
/// track loads; never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatSchedule {
    duration_ms: f64,
    events: Vec<BeatEvent>,
}

impl BeatSchedule {
    pub fn new(mut events: Vec<BeatEvent>, duration_ms: f64) -> Self {
        events.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        Self {
            duration_ms,
            events,
        }
    }

    pub fn empty(duration_ms: f64) -> Self {
        Self::new(Vec::new(), duration_ms)
    }

    pub fn events(&self) -> &[BeatEvent] {
        &self.events
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index of the first event strictly after `time_ms`.
    pub fn next_index_after(&self, time_ms: f64) -> usize {
        self.events.partition_point(|e| e.time_ms <= time_ms)
    }

    /// First event strictly after `time_ms`.
    pub fn next_after(&self, time_ms: f64) -> Option<&BeatEvent> {
        self.events.get(self.next_index_after(time_ms))
    }

    pub fn count_for(&self, band: BandTag) -> usize {
        self.events.iter().filter(|e| e.band == band).count()
    }

    /// Sidecar path for a track: `song.ogg` → `song.beats.ron`.
    pub fn sidecar_path(audio_path: &Path) -> std::path::PathBuf {
        audio_path.with_extension("beats.ron")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let raw: BeatSchedule = ron::from_str(&contents)?;
        info!("Loaded {} beats from {:?}", raw.events.len(), path);
        // Hand-edited files may be out of order.
        Ok(Self::new(raw.events, raw.duration_ms))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(3);
        let contents = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(path, contents)?;
        info!("Wrote {} beats to {:?}", self.events.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(time_ms: f64, band: BandTag) -> BeatEvent {
        BeatEvent {
            time_ms,
            band,
            strength: 2.0,
        }
    }

    #[test]
    fn construction_sorts_events() {
        let schedule = BeatSchedule::new(
            vec![ev(900.0, BandTag::Mid), ev(100.0, BandTag::Bass), ev(500.0, BandTag::High)],
            1000.0,
        );
        let times: Vec<f64> = schedule.events().iter().map(|e| e.time_ms).collect();
        assert_eq!(times, vec![100.0, 500.0, 900.0]);
    }

    #[test]
    fn next_after_is_strict() {
        let schedule = BeatSchedule::new(vec![ev(100.0, BandTag::Bass), ev(500.0, BandTag::Bass)], 1000.0);
        assert_eq!(schedule.next_after(0.0).map(|e| e.time_ms), Some(100.0));
        assert_eq!(schedule.next_after(100.0).map(|e| e.time_ms), Some(500.0));
        assert!(schedule.next_after(500.0).is_none());
    }

    #[test]
    fn sidecar_path_replaces_extension() {
        let p = BeatSchedule::sidecar_path(Path::new("songs/track.ogg"));
        assert_eq!(p, Path::new("songs/track.beats.ron"));
    }

    #[test]
    fn ron_file_roundtrip_resorts() {
        let path = std::env::temp_dir().join(format!("beattiles-schedule-{}.ron", std::process::id()));
        let schedule = BeatSchedule::new(vec![ev(250.0, BandTag::Bass), ev(800.0, BandTag::MidLow)], 1200.0);
        schedule.save(&path).unwrap();
        let loaded = BeatSchedule::load(&path).unwrap();
        assert_eq!(loaded, schedule);

        // Out-of-order contents written by hand come back sorted.
        std::fs::write(
            &path,
            "(duration_ms: 1000.0, events: [(time_ms: 700.0, band: Mid, strength: 3.0), (time_ms: 200.0, band: Bass, strength: 4.0)])",
        )
        .unwrap();
        let loaded = BeatSchedule::load(&path).unwrap();
        assert_eq!(loaded.events()[0].time_ms, 200.0);
        std::fs::remove_file(&path).ok();
    }
}
