use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a question step in the riddle flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Comedy,
    Action,
    Horror,
}

impl Genre {
    pub const ALL: [Genre; 3] = [Genre::Comedy, Genre::Action, Genre::Horror];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Comedy => "Comedy",
            Genre::Action => "Action",
            Genre::Horror => "Horror",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|genre| genre.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
