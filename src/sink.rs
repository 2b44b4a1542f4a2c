use crate::engine::LaneSnapshot;

/// Receives a read-only snapshot of the lane field after every tick.
pub trait RenderSink {
    fn present(&mut self, frame: &LaneSnapshot);
}

/// Discards every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn present(&mut self, _frame: &LaneSnapshot) {}
}

/// Keeps a copy of the latest frame.
#[derive(Debug, Clone, Default)]
pub struct LatestFrame {
    pub frame: Option<LaneSnapshot>,
    pub presented: usize,
}

impl RenderSink for LatestFrame {
    fn present(&mut self, frame: &LaneSnapshot) {
        self.frame = Some(frame.clone());
        self.presented += 1;
    }
}
