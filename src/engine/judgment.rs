/// A strike from the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaneInput {
    /// A lane key; columns count from the left, starting at zero.
    Column(usize),
    /// A click or touch in field coordinates.
    Pointer { x: f32, y: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// No beat is close enough, or its hit was already credited.
    WindowClosed,
    /// The lane holds no pending target.
    NoTarget,
    /// The target is outside the strike zone.
    OutOfZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgment {
    Hit { column: usize, score: u32 },
    Miss(MissReason),
    /// Column outside the field; counts as neither hit nor miss.
    Ignored,
    /// The session is not playing.
    Rejected,
}

impl Judgment {
    pub fn is_hit(&self) -> bool {
        matches!(self, Judgment::Hit { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Judgment::Hit { .. } => "HIT",
            Judgment::Miss(_) => "MISS",
            Judgment::Ignored => "IGNORED",
            Judgment::Rejected => "REJECTED",
        }
    }
}
