//! Compass-point labels for headings and bearings. (N, NE, E, etc.)

use std::fmt;

use crate::position::normalize_degrees;

/// 16-point compass rose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

const ROSE: [Direction; 16] = [
    Direction::N,
    Direction::NNE,
    Direction::NE,
    Direction::ENE,
    Direction::E,
    Direction::ESE,
    Direction::SE,
    Direction::SSE,
    Direction::S,
    Direction::SSW,
    Direction::SW,
    Direction::WSW,
    Direction::W,
    Direction::WNW,
    Direction::NW,
    Direction::NNW,
];

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl Direction {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::NNE => "NNE",
            Direction::NE => "NE",
            Direction::ENE => "ENE",
            Direction::E => "E",
            Direction::ESE => "ESE",
            Direction::SE => "SE",
            Direction::SSE => "SSE",
            Direction::S => "S",
            Direction::SSW => "SSW",
            Direction::SW => "SW",
            Direction::WSW => "WSW",
            Direction::W => "W",
            Direction::WNW => "WNW",
            Direction::NW => "NW",
            Direction::NNW => "NNW",
        }
    }
}

/// Nearest of the 16 points. Each covers 22.5° centred on it.
pub fn direction(heading: f64) -> Direction {
    let sector = 360.0 / ROSE.len() as f64;
    let index = ((normalize_degrees(heading) + sector / 2.0) / sector) as usize % ROSE.len();
    ROSE[index]
}
