use std::fmt;

use serde_derive::{Deserialize, Serialize};

/// Binary class assignment of a document. Serialized as `0` or `1`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Zero,
    One,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Zero, Label::One];

    /// Row of this label in the per-class count and topic matrices.
    pub fn index(self) -> usize {
        match self {
            Label::Zero => 0,
            Label::One => 1,
        }
    }

    /// `true` maps to `One`, the outcome of a Bernoulli success.
    pub fn from_bernoulli(success: bool) -> Label {
        if success {
            Label::One
        } else {
            Label::Zero
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> u8 {
        label.index() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLabelError(u8);

impl fmt::Display for ParseLabelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "label must be 0 or 1, got {}", self.0)
    }
}

impl TryFrom<u8> for Label {
    type Error = ParseLabelError;

    fn try_from(value: u8) -> Result<Label, ParseLabelError> {
        match value {
            0 => Ok(Label::Zero),
            1 => Ok(Label::One),
            v => Err(ParseLabelError(v)),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.index().fmt(f)
    }
}
