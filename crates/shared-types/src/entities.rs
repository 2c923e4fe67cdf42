//! # Deployment Model
//!
//! The target-facing slice of the orchestration model: what a deployment
//! looks like, which components a step touches, and what a target reports
//! back after applying it.
//!
//! ## Clusters
//!
//! - **Desired state**: `DeploymentSpec`, `SolutionSpec`, `ComponentSpec`, `TargetSpec`
//! - **Execution**: `DeploymentStep`, `ComponentStep`, `ComponentAction`
//! - **Outcome**: `ComponentResult`, `ComponentStatus`
//! - **Wire payload**: `InstancesPayload`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// DESIRED STATE
// =============================================================================

/// A single deployable unit on a target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Unique name within the solution.
    pub name: String,
    /// Component kind interpreted by the target (e.g. `container`, `helm.v3`).
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub component_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Free-form, target-specific settings.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, serde_json::Value>,
    /// Names of components that must be applied first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ComponentSpec {
    /// Create a component with a name and a kind.
    pub fn new(name: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_type: component_type.into(),
            ..Self::default()
        }
    }
}

/// The set of components that make up a solution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

/// A target as seen from the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
}

/// Desired state for one solution instance across its targets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    #[serde(default)]
    pub solution_name: String,
    #[serde(default)]
    pub solution: SolutionSpec,
    #[serde(default)]
    pub instance_name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub targets: HashMap<String, TargetSpec>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generation: String,
}

// =============================================================================
// EXECUTION
// =============================================================================

/// What a step does to a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentAction {
    Update,
    Delete,
}

/// One component touched by a deployment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStep {
    pub action: ComponentAction,
    pub component: ComponentSpec,
}

/// The slice of a deployment plan that runs against a single target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStep {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub components: Vec<ComponentStep>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
}

impl DeploymentStep {
    /// Components this step creates or updates.
    #[must_use]
    pub fn updated_components(&self) -> Vec<ComponentSpec> {
        self.components_with(ComponentAction::Update)
    }

    /// Components this step removes.
    #[must_use]
    pub fn deleted_components(&self) -> Vec<ComponentSpec> {
        self.components_with(ComponentAction::Delete)
    }

    fn components_with(&self, action: ComponentAction) -> Vec<ComponentSpec> {
        self.components
            .iter()
            .filter(|step| step.action == action)
            .map(|step| step.component.clone())
            .collect()
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Per-component outcome of an apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentStatus {
    Updated,
    Deleted,
    UpdateFailed,
    DeleteFailed,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated => write!(f, "Updated"),
            Self::Deleted => write!(f, "Deleted"),
            Self::UpdateFailed => write!(f, "UpdateFailed"),
            Self::DeleteFailed => write!(f, "DeleteFailed"),
        }
    }
}

/// Result reported for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub status: ComponentStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ComponentResult {
    pub fn new(status: ComponentStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

// =============================================================================
// WIRE PAYLOAD
// =============================================================================

/// Body of every `instances` request sent to a target.
///
/// For reads, `components` holds the references to look up (empty means
/// "everything"); for writes and deletes it holds the components to act on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstancesPayload {
    #[serde(default)]
    pub deployment: DeploymentSpec,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}
