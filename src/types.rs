//! Shared enums used across the crate: the data-file `Mode` and the
//! `ErrorFloorType` applied to measurement errors.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What the data file carries for each period.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum Mode {
    /// Impedance tensor, real and imaginary parts
    #[value(name = "I", alias = "i")]
    #[serde(rename = "I", alias = "i")]
    Impedance,
    /// Apparent resistivity and phase
    #[value(name = "R", alias = "r")]
    #[serde(rename = "R", alias = "r")]
    ResistivityPhase,
}

impl Mode {
    pub fn letter(&self) -> char {
        match self {
            Mode::Impedance => 'I',
            Mode::ResistivityPhase => 'R',
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "I" => Some(Mode::Impedance),
            "R" => Some(Mode::ResistivityPhase),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFloorType {
    Relative,
    Absolute,
}

impl ErrorFloorType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relative" => Some(ErrorFloorType::Relative),
            "absolute" => Some(ErrorFloorType::Absolute),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorFloorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorFloorType::Relative => write!(f, "relative"),
            ErrorFloorType::Absolute => write!(f, "absolute"),
        }
    }
}
