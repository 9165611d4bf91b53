//! Error types for the color-matching core.

use std::fmt::Display;

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Error, Debug)]
pub enum MatchError {
    /// The voter was handed no labels.
    #[error("cannot take the mode of an empty label sequence")]
    EmptyInput,

    #[error("unknown color label: {0:?}")]
    UnknownColor(String),

    #[error("unknown matching rule: {0:?} (expected \"complement\" or \"triad\")")]
    UnknownRule(String),

    /// A segment reached classification with no sampled pixels.
    #[error("segment {id} has no sampled pixels")]
    DegenerateSegment { id: u32 },

    #[error(
        "segment map is {map_width}x{map_height} but image is {image_width}x{image_height}"
    )]
    ShapeMismatch {
        image_width: u32,
        image_height: u32,
        map_width: u32,
        map_height: u32,
    },

    #[error("image has no pixels")]
    EmptyImage,

    #[error("invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },
}

impl MatchError {
    pub fn invalid(parameter: impl Into<String>, value: impl Display) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }
}
