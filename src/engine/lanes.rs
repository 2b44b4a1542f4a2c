use std::collections::VecDeque;

use super::SessionState;

/// One cell of a row, in field coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub column: usize,
    /// Top edge.
    pub y: f32,
    pub is_target: bool,
}

/// A horizontal band of tiles, one per lane, with at most one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: u64,
    /// Top edge shared by every tile in the row.
    pub y: f32,
    pub target: Option<usize>,
}

impl Row {
    pub fn tiles(&self, lane_count: usize) -> impl Iterator<Item = Tile> + '_ {
        (0..lane_count).map(move |column| Tile {
            column,
            y: self.y,
            is_target: self.target == Some(column),
        })
    }
}

/// Rows on the field, newest (topmost) at the front, oldest at the back.
#[derive(Debug, Clone, Default)]
pub struct Lanes {
    rows: VecDeque<Row>,
    next_id: u64,
}

impl Lanes {
    pub fn clear(&mut self) {
        self.rows.clear();
        self.next_id = 0;
    }

    pub fn rows(&self) -> &VecDeque<Row> {
        &self.rows
    }

    pub fn head_y(&self) -> Option<f32> {
        self.rows.front().map(|r| r.y)
    }

    pub fn advance(&mut self, dy: f32) {
        for row in &mut self.rows {
            row.y += dy;
        }
    }

    /// Add a row directly above the current head.
    pub fn spawn(&mut self, tile_height: f32, target: Option<usize>) -> &Row {
        let y = self.head_y().map_or(-tile_height, |head| head - tile_height);
        self.rows.push_front(Row {
            id: self.next_id,
            y,
            target,
        });
        self.next_id += 1;
        &self.rows[0]
    }

    /// Remove rows that have left the field, oldest first. Returns how many
    /// of them still carried a target.
    pub fn discard_below(&mut self, bottom: f32) -> u32 {
        let mut dropped_targets = 0;
        while self.rows.back().is_some_and(|r| r.y >= bottom) {
            if let Some(row) = self.rows.pop_back() {
                dropped_targets += row.target.is_some() as u32;
            }
        }
        dropped_targets
    }

    /// The lowest row whose target sits in `column`.
    pub fn lowest_target_mut(&mut self, column: usize) -> Option<&mut Row> {
        self.rows.iter_mut().rev().find(|r| r.target == Some(column))
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneSnapshot {
    pub state: SessionState,
    /// Newest first.
    pub rows: Vec<Row>,
    pub lane_count: usize,
    pub tile_width: f32,
    pub tile_height: f32,
    pub field_height: f32,
    pub window_active: bool,
    pub score: u32,
    pub best_score: u32,
    pub misses: u32,
    pub dropped: u32,
    pub speed: f32,
    pub beat_progress: f32,
    pub playback_ms: f64,
    pub failure: Option<String>,
}

impl LaneSnapshot {
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.rows.iter().flat_map(|r| r.tiles(self.lane_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_stack_upward() {
        let mut lanes = Lanes::default();
        assert_eq!(lanes.spawn(120.0, None).y, -120.0);
        lanes.advance(100.0);
        assert_eq!(lanes.spawn(120.0, Some(2)).y, -140.0);
        assert_eq!(lanes.rows()[0].id, 1);
        assert_eq!(lanes.rows()[1].id, 0);
    }

    #[test]
    fn discard_is_oldest_first() {
        let mut lanes = Lanes::default();
        lanes.spawn(120.0, Some(0));
        lanes.spawn(120.0, None);
        lanes.spawn(120.0, Some(1));
        lanes.advance(960.0);
        // y = 840, 720, 600: all three are at or past the bottom.
        assert_eq!(lanes.discard_below(600.0), 2);
        assert!(lanes.rows().is_empty());
    }

    #[test]
    fn discard_stops_at_first_visible_row() {
        let mut lanes = Lanes::default();
        lanes.spawn(120.0, None);
        lanes.spawn(120.0, Some(3));
        lanes.advance(750.0);
        assert_eq!(lanes.discard_below(600.0), 0);
        assert_eq!(lanes.rows().len(), 1);
        assert_eq!(lanes.rows()[0].id, 1);
    }

    #[test]
    fn lowest_target_prefers_oldest_row() {
        let mut lanes = Lanes::default();
        lanes.spawn(120.0, Some(1));
        lanes.spawn(120.0, Some(1));
        assert_eq!(lanes.lowest_target_mut(1).map(|r| r.id), Some(0));
        assert!(lanes.lowest_target_mut(0).is_none());
    }

    #[test]
    fn tiles_flag_single_target() {
        let row = Row {
            id: 0,
            y: 10.0,
            target: Some(2),
        };
        let tiles: Vec<Tile> = row.tiles(4).collect();
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles.iter().filter(|t| t.is_target).count(), 1);
        assert!(tiles[2].is_target);
    }
}
