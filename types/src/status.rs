use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Status object shared by every AgentCore resource. The controller
/// records the remote identity here once the object exists in the
/// control plane, so the same declaration always maps to the same
/// remote object.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ResourceStatus {
    /// A short description of the resource's current state.
    pub phase: Option<ResourcePhase>,

    /// A human-readable message indicating details about why the
    /// resource is in this phase.
    pub message: Option<String>,

    /// Timestamp of when the [`ResourceStatus`] object was last updated.
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<String>,

    /// Identifier of the remote object. For child resources (memory
    /// strategies, gateway targets) this is the child id only.
    pub id: Option<String>,

    /// Identifier of the parent the child resource was created under.
    /// When the spec names a different parent, the child is replaced.
    #[serde(rename = "parentId")]
    pub parent_id: Option<String>,

    /// ARN reported by the control plane, if the entity has one.
    pub arn: Option<String>,

    /// Raw status string last observed in the control plane
    /// (e.g. `ACTIVE`, `READY`, `CREATING`).
    #[serde(rename = "remoteStatus")]
    pub remote_status: Option<String>,

    /// The `metadata.generation` that was last fully reconciled.
    #[serde(rename = "observedGeneration")]
    pub observed_generation: Option<i64>,
}

/// A short description of an AgentCore resource's current state.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, JsonSchema)]
pub enum ResourcePhase {
    /// The resource first appeared to the controller.
    Pending,

    /// The remote object is being created and polled until it settles.
    Creating,

    /// An existing remote object is being adopted via `importId`.
    Importing,

    /// Drift was detected and the remote object is being updated.
    Updating,

    /// Drift on an immutable field was detected. The remote object
    /// is deleted and will be recreated on the next reconciliation.
    Replacing,

    /// The remote object matches the declared configuration.
    Ready,

    /// The remote object is being deleted.
    Deleting,

    /// The control plane rejected a request or the remote object
    /// settled in a failure status.
    ErrFailed,

    /// The object referenced by `importId` does not exist.
    ErrImportNotFound,
}

impl FromStr for ResourcePhase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ResourcePhase::Pending),
            "Creating" => Ok(ResourcePhase::Creating),
            "Importing" => Ok(ResourcePhase::Importing),
            "Updating" => Ok(ResourcePhase::Updating),
            "Replacing" => Ok(ResourcePhase::Replacing),
            "Ready" => Ok(ResourcePhase::Ready),
            "Deleting" => Ok(ResourcePhase::Deleting),
            "ErrFailed" => Ok(ResourcePhase::ErrFailed),
            "ErrImportNotFound" => Ok(ResourcePhase::ErrImportNotFound),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourcePhase::Pending => write!(f, "Pending"),
            ResourcePhase::Creating => write!(f, "Creating"),
            ResourcePhase::Importing => write!(f, "Importing"),
            ResourcePhase::Updating => write!(f, "Updating"),
            ResourcePhase::Replacing => write!(f, "Replacing"),
            ResourcePhase::Ready => write!(f, "Ready"),
            ResourcePhase::Deleting => write!(f, "Deleting"),
            ResourcePhase::ErrFailed => write!(f, "ErrFailed"),
            ResourcePhase::ErrImportNotFound => write!(f, "ErrImportNotFound"),
        }
    }
}

/// Optional overrides for how long the controller waits on the
/// control plane. Values are duration strings such as `"30m"` or
/// `"1h30m"`. Unset values fall back to the per-kind defaults.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TimeoutsSpec {
    pub create: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
}
