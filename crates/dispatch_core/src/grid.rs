//! Spatial operations: the bounded integer grid vehicles and requesters live on.
//!
//! This module provides:
//!
//! - **GridPosition**: integer `(x, y)` value type
//! - **Distance**: Manhattan metric between positions
//! - **Path planning**: cardinal-only routes, all x steps first, then all y steps
//! - **Sampling**: uniform random positions inside the bounds
//!
//! Every position handed to the rest of the crate is validated here; nothing is clamped.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use bevy_ecs::prelude::Resource;
use lru::LruCache;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DispatchError};

/// Number of memoized paths kept per grid.
const PATH_CACHE_SIZE: usize = 4_096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: GridPosition) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// One unit step from `self` toward `target`, x axis first.
    fn step_toward(self, target: GridPosition) -> GridPosition {
        if self.x != target.x {
            GridPosition::new(self.x + (target.x - self.x).signum(), self.y)
        } else if self.y != target.y {
            GridPosition::new(self.x, self.y + (target.y - self.y).signum())
        } else {
            self
        }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridPosition {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Memoized full routes for [`GridNetwork::path`], keyed by `(from, to)`.
/// Only in-bounds paths are stored; out-of-bounds requests fail before lookup.
/// Tick movement goes through [`GridNetwork::next_step`] and never touches it.
struct PathCache {
    cache: Mutex<LruCache<(GridPosition, GridPosition), Vec<GridPosition>>>,
}

impl PathCache {
    fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(PATH_CACHE_SIZE).expect("cache size must be non-zero"),
            )),
        }
    }

    fn get_or_compute(&self, from: GridPosition, to: GridPosition) -> Vec<GridPosition> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(_) => return compute_path(from, to),
        };
        cache
            .get_or_insert((from, to), || compute_path(from, to))
            .clone()
    }
}

fn compute_path(from: GridPosition, to: GridPosition) -> Vec<GridPosition> {
    let mut path = Vec::with_capacity(from.manhattan(to) as usize + 1);
    let mut current = from;
    path.push(current);
    while current != to {
        current = current.step_toward(to);
        path.push(current);
    }
    path
}

/// Bounded grid `[0, width) x [0, height)` with a Manhattan metric.
#[derive(Resource)]
pub struct GridNetwork {
    width: i32,
    height: i32,
    paths: PathCache,
}

impl fmt::Debug for GridNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridNetwork")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl GridNetwork {
    pub fn new(width: i32, height: i32) -> Result<Self, ConfigError> {
        if width < 1 || height < 1 {
            return Err(ConfigError::EmptyGrid { width, height });
        }
        Ok(Self {
            width,
            height,
            paths: PathCache::new(),
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, position: GridPosition) -> bool {
        (0..self.width).contains(&position.x) && (0..self.height).contains(&position.y)
    }

    /// Returns the position unchanged when it lies inside the bounds.
    pub fn validate(&self, position: GridPosition) -> Result<GridPosition, DispatchError> {
        if self.contains(position) {
            Ok(position)
        } else {
            Err(DispatchError::OutOfBounds {
                position,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn distance(&self, a: GridPosition, b: GridPosition) -> u32 {
        a.manhattan(b)
    }

    /// Cardinal route from `a` to `b`, both endpoints included.
    ///
    /// All steps along x are taken first, then all steps along y, so the route is
    /// reproducible and has exactly `distance(a, b) + 1` positions.
    pub fn path(&self, a: GridPosition, b: GridPosition) -> Result<Vec<GridPosition>, DispatchError> {
        self.validate(a)?;
        self.validate(b)?;
        Ok(self.paths.get_or_compute(a, b))
    }

    /// The position one unit step along `path(from, toward)`, or `from` when already there.
    /// Bypasses the path cache.
    pub fn next_step(&self, from: GridPosition, toward: GridPosition) -> Result<GridPosition, DispatchError> {
        self.validate(from)?;
        self.validate(toward)?;
        Ok(from.step_toward(toward))
    }

    /// In-bounds cardinal neighbours in N, S, E, W order.
    pub fn neighbors(&self, position: GridPosition) -> Vec<GridPosition> {
        [(0, 1), (0, -1), (1, 0), (-1, 0)]
            .into_iter()
            .map(|(dx, dy)| GridPosition::new(position.x + dx, position.y + dy))
            .filter(|p| self.contains(*p))
            .collect()
    }

    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> GridPosition {
        GridPosition::new(rng.gen_range(0..self.width), rng.gen_range(0..self.height))
    }
}
