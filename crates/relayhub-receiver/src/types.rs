//! Domain types shared by the registry, task store and activation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique relay identifier (string form of a UUID), chosen by the site at
/// registration time and never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayId(String);

impl RelayId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelayId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RelayId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque token naming an activated configuration snapshot. Only equality
/// is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Serial(String);

impl Serial {
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a relay. Transitions only move forward:
/// `Active -> PendingDeletion -> Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayState {
    Active,
    PendingDeletion,
    Deleted,
}

impl RelayState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::PendingDeletion => "PENDING_DELETION",
            Self::Deleted => "DELETED",
        }
    }

    /// The only state reachable from `self` in one step, if any.
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Active => Some(Self::PendingDeletion),
            Self::PendingDeletion => Some(Self::Deleted),
            Self::Deleted => None,
        }
    }

    /// Relays in these states are still served for polling, cert refresh and
    /// data ingestion.
    pub const fn is_operable(self) -> bool {
        matches!(self, Self::Active | Self::PendingDeletion)
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "PENDING_DELETION" => Ok(Self::PendingDeletion),
            "DELETED" => Ok(Self::Deleted),
            other => Err(format!("unknown relay state {other:?}")),
        }
    }
}

/// Unique task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a relay is asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskSpec {
    /// Apply the configuration snapshot `serial`. `tar_data` is the base64
    /// tar archive of the relay's rendered configuration for that serial.
    RelayConfig { serial: Serial, tar_data: String },
    /// Run an ad-hoc fetch on behalf of the site.
    FetchAdHoc { payload: String },
}

impl TaskSpec {
    /// Whether this task distributes exactly the snapshot `serial`. The
    /// archive content plays no part.
    pub fn covers_serial(&self, serial: &Serial) -> bool {
        match self {
            Self::RelayConfig { serial: own, .. } => own == serial,
            Self::FetchAdHoc { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Finished,
    Failed,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown task status {other:?}")),
        }
    }
}

/// Outcome reported by a relay for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    Ok,
    Error,
}

impl ResultType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }

    /// Terminal status a pending task moves to on this result.
    pub const fn terminal_status(self) -> TaskStatus {
        match self {
            Self::Ok => TaskStatus::Finished,
            Self::Error => TaskStatus::Failed,
        }
    }
}

impl FromStr for ResultType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Self::Ok),
            "ERROR" => Ok(Self::Error),
            other => Err(format!("unknown result type {other:?}")),
        }
    }
}

/// A unit of work owned by one relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub relay_id: RelayId,
    pub spec: TaskSpec,
    pub status: TaskStatus,
    pub result_type: Option<ResultType>,
    pub result_payload: Option<String>,
    pub creation_timestamp: i64,
    pub update_timestamp: i64,
}
