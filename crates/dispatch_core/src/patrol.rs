//! Patrol cycles: closed waypoint loops vehicles follow while not on a mission.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::{GridNetwork, GridPosition};

/// Built-in patrol shapes, scaled to the grid. Anchors are fractions of the half-extent
/// around the grid centre, `-1.0` being the low edge and `1.0` the high edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatrolPattern {
    /// Clockwise outer rectangle.
    Perimeter,
    /// Counter-clockwise inner rectangle.
    InnerLoop,
    /// Out and back along both axes through the centre.
    Cross,
    /// Four lobes through the centre.
    FigureEight,
}

impl PatrolPattern {
    pub const ALL: [PatrolPattern; 4] = [
        PatrolPattern::Perimeter,
        PatrolPattern::InnerLoop,
        PatrolPattern::Cross,
        PatrolPattern::FigureEight,
    ];

    /// Vehicles rotate through the patterns so they do not cluster.
    pub fn for_vehicle(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    fn anchors(self) -> &'static [(f64, f64)] {
        match self {
            PatrolPattern::Perimeter => &[(-0.6, -0.6), (0.6, -0.6), (0.6, 0.6), (-0.6, 0.6)],
            PatrolPattern::InnerLoop => &[(-0.4, -0.4), (-0.4, 0.4), (0.4, 0.4), (0.4, -0.4)],
            PatrolPattern::Cross => &[
                (0.0, -0.8),
                (0.0, 0.0),
                (0.0, 0.8),
                (0.0, 0.0),
                (-0.8, 0.0),
                (0.0, 0.0),
                (0.8, 0.0),
                (0.0, 0.0),
            ],
            PatrolPattern::FigureEight => &[
                (0.0, 0.0),
                (-0.4, -0.4),
                (0.0, 0.0),
                (0.4, -0.4),
                (0.0, 0.0),
                (0.4, 0.4),
                (0.0, 0.0),
                (-0.4, 0.4),
            ],
        }
    }

    /// In-bounds waypoints for `grid`, with repeated neighbours collapsed.
    pub fn waypoints(self, grid: &GridNetwork) -> Vec<GridPosition> {
        let scale = |fraction: f64, extent: i32| -> i32 {
            let span = (extent - 1).max(0) as f64;
            (((fraction + 1.0) / 2.0) * span).round() as i32
        };
        let mut waypoints: Vec<GridPosition> = self
            .anchors()
            .iter()
            .map(|&(fx, fy)| GridPosition::new(scale(fx, grid.width()), scale(fy, grid.height())))
            .collect();
        waypoints.dedup();
        while waypoints.len() > 1 && waypoints.first() == waypoints.last() {
            waypoints.pop();
        }
        waypoints
    }
}

/// A validated, non-empty closed loop of in-bounds waypoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatrolCycle {
    waypoints: Vec<GridPosition>,
}

impl PatrolCycle {
    pub fn new(
        vehicle_id: &str,
        waypoints: Vec<GridPosition>,
        grid: &GridNetwork,
    ) -> Result<Self, ConfigError> {
        if waypoints.is_empty() {
            return Err(ConfigError::EmptyCycle(vehicle_id.to_string()));
        }
        if let Some(&position) = waypoints.iter().find(|p| !grid.contains(**p)) {
            return Err(ConfigError::WaypointOutOfBounds {
                vehicle_id: vehicle_id.to_string(),
                position,
            });
        }
        Ok(Self { waypoints })
    }

    pub fn from_pattern(
        vehicle_id: &str,
        pattern: PatrolPattern,
        grid: &GridNetwork,
    ) -> Result<Self, ConfigError> {
        Self::new(vehicle_id, pattern.waypoints(grid), grid)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[GridPosition] {
        &self.waypoints
    }

    pub fn contains(&self, position: GridPosition) -> bool {
        self.waypoints.contains(&position)
    }

    /// Waypoint at `index`, wrapping around the loop.
    pub fn waypoint(&self, index: usize) -> GridPosition {
        self.waypoints[index % self.waypoints.len()]
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.waypoints.len()
    }

    /// Index of the waypoint nearest to `position` (Manhattan); lowest index on ties.
    pub fn closest_index(&self, position: GridPosition) -> usize {
        self.waypoints
            .iter()
            .enumerate()
            .min_by_key(|(index, waypoint)| (waypoint.manhattan(position), *index))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}
