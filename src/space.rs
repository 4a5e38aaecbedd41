//! Labelled finite spaces for hidden states, actions and observations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which role a [`LabelSpace`] plays in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceKind {
    State,
    Action,
    Observation,
}

impl fmt::Display for SpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpaceKind::State => "state",
            SpaceKind::Action => "action",
            SpaceKind::Observation => "observation",
        };
        f.write_str(name)
    }
}

/// Ordered, indexable, immutable set of unique labels.
///
/// State and observation spaces must be non-empty. An action space may be
/// empty; planning over it fails with [`Error::NoActionsAvailable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSpace", into = "RawSpace")]
pub struct LabelSpace {
    kind: SpaceKind,
    labels: Vec<String>,
}

/// Hidden states of an agent.
pub type StateSpace = LabelSpace;
/// Actions available to an agent.
pub type ActionSpace = LabelSpace;
/// Observable outcomes.
pub type ObservationSpace = LabelSpace;

#[derive(Serialize, Deserialize)]
struct RawSpace {
    kind: SpaceKind,
    labels: Vec<String>,
}

impl TryFrom<RawSpace> for LabelSpace {
    type Error = Error;

    fn try_from(raw: RawSpace) -> Result<Self> {
        LabelSpace::new(raw.kind, raw.labels)
    }
}

impl From<LabelSpace> for RawSpace {
    fn from(space: LabelSpace) -> Self {
        RawSpace {
            kind: space.kind,
            labels: space.labels,
        }
    }
}

impl LabelSpace {
    /// Build a space, rejecting duplicate labels and empty state/observation spaces.
    pub fn new<I, S>(kind: SpaceKind, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() && kind != SpaceKind::Action {
            return Err(Error::invalid_config(format!("{kind} space must not be empty")));
        }
        for (index, label) in labels.iter().enumerate() {
            if labels[..index].contains(label) {
                return Err(Error::invalid_config(format!(
                    "duplicate {kind} label '{label}'"
                )));
            }
        }
        Ok(Self { kind, labels })
    }

    pub fn states<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SpaceKind::State, labels)
    }

    pub fn actions<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SpaceKind::Action, labels)
    }

    pub fn observations<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SpaceKind::Observation, labels)
    }

    pub fn kind(&self) -> SpaceKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label at `index`, if in range.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Position of `label` in iteration order.
    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.labels
            .iter()
            .position(|candidate| candidate == label)
            .ok_or_else(|| Error::UnknownLabel {
                space: self.kind.to_string(),
                label: label.to_string(),
            })
    }

    /// Resolve a list of labels to indices, failing on the first unknown label.
    pub fn indices_of<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels.iter().map(|label| self.index_of(label.as_ref())).collect()
    }

    /// Label at `index`, or [`Error::DimensionMismatch`] when out of range.
    pub(crate) fn checked_label(&self, index: usize) -> Result<&str> {
        self.label(index)
            .ok_or_else(|| Error::mismatch(format!("{} index", self.kind), self.len(), index))
    }
}
