//! Positions, directions and game values

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in the world
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Move toward `target` by at most `step`, landing on it when closer
    pub fn step_toward(&self, target: &Vec3, step: f64) -> Vec3 {
        let distance = self.distance_to(target);
        if distance <= step || distance == 0.0 {
            return *target;
        }
        let t = step / distance;
        Vec3::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
            self.z + (target.z - self.z) * t,
        )
    }

    /// The block containing this point
    pub fn block(&self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

/// Integer block coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, face: FaceDirection) -> BlockPos {
        let (dx, dy, dz) = face.vector();
        BlockPos::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.z as f64 + 0.5,
        )
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Horizontal movement direction relative to where the bot is facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Back => "back",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Block face used when placing against a neighbour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceDirection {
    Up,
    Down,
    North,
    South,
    East,
    West,
}

impl FaceDirection {
    /// Default search order; `down` first
    pub const ALL: [FaceDirection; 6] = [
        FaceDirection::Down,
        FaceDirection::North,
        FaceDirection::South,
        FaceDirection::East,
        FaceDirection::West,
        FaceDirection::Up,
    ];

    pub fn vector(self) -> (i32, i32, i32) {
        match self {
            FaceDirection::Up => (0, 1, 0),
            FaceDirection::Down => (0, -1, 0),
            FaceDirection::North => (0, 0, -1),
            FaceDirection::South => (0, 0, 1),
            FaceDirection::East => (1, 0, 0),
            FaceDirection::West => (-1, 0, 0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FaceDirection::Up => "up",
            FaceDirection::Down => "down",
            FaceDirection::North => "north",
            FaceDirection::South => "south",
            FaceDirection::East => "east",
            FaceDirection::West => "west",
        }
    }

    /// Search order with `preferred` moved to the front
    pub fn search_order(preferred: FaceDirection) -> Vec<FaceDirection> {
        let mut order = vec![preferred];
        order.extend(Self::ALL.iter().copied().filter(|f| *f != preferred));
        order
    }
}

/// Player game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl GameMode {
    /// Map the numeric `playerGameType` tag
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(GameMode::Survival),
            1 => Some(GameMode::Creative),
            2 => Some(GameMode::Adventure),
            3 => Some(GameMode::Spectator),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Survival => "survival",
            GameMode::Creative => "creative",
            GameMode::Adventure => "adventure",
            GameMode::Spectator => "spectator",
        }
    }

    pub fn can_fly(self) -> bool {
        matches!(self, GameMode::Creative | GameMode::Spectator)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_toward_lands_on_target() {
        let start = Vec3::new(0.0, 64.0, 0.0);
        let target = Vec3::new(3.0, 64.0, 4.0);

        let mid = start.step_toward(&target, 2.5);
        assert!((mid.distance_to(&start) - 2.5).abs() < 1e-9);

        assert_eq!(mid.step_toward(&target, 10.0), target);
    }

    #[test]
    fn test_face_search_order() {
        let order = FaceDirection::search_order(FaceDirection::East);
        assert_eq!(order[0], FaceDirection::East);
        assert_eq!(order[1], FaceDirection::Down);
        assert_eq!(order.len(), 6);
    }

    #[test]
    fn test_block_of_negative_coordinates() {
        assert_eq!(Vec3::new(-0.5, 63.9, 2.0).block(), BlockPos::new(-1, 63, 2));
    }
}
