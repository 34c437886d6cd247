//! The schema node type.

use crate::compose::{BranchState, SchemaFingerprint};
use crate::error::FormError;
use crate::node::arena::NodeId;
use crate::pointer::JsonPointer;
use crate::schema::NormalizedSchema;
use crate::validator::ValidationIssue;
use serde_json::Value;
use std::sync::Arc;

/// One node of the resolved form tree.
///
/// A node owns its current value and its composed effective schema; identity
/// is the JSON-Pointer path, unique across the tree. The `required`,
/// `visible` and `active` flags plus the branch indices are what a rendering
/// layer reads to decide which inputs exist right now.
#[derive(Debug)]
pub struct SchemaNode {
    pub id: NodeId,
    /// Stable JSON-Pointer path in the value tree
    pub path: JsonPointer,
    /// Position in the schema document, for diagnostics and injection scopes
    pub schema_path: JsonPointer,
    /// Back-reference; `None` only at the root
    pub parent: Option<NodeId>,
    /// Owned children in materialization order
    pub children: Vec<NodeId>,
    /// Base schema at this position, before composition
    pub base: Arc<NormalizedSchema>,
    /// Fingerprint of the base schema, gating child rebuilds
    pub base_fingerprint: SchemaFingerprint,
    /// Effective schema after the latest composition pass
    pub effective: Arc<NormalizedSchema>,
    /// Fingerprint of the effective schema
    pub fingerprint: SchemaFingerprint,
    /// Current value snapshot
    pub value: Value,
    pub required: bool,
    pub active: bool,
    pub visible: bool,
    /// Selected oneOf branch
    pub one_of_index: Option<usize>,
    /// Active anyOf subset
    pub any_of_indices: Vec<usize>,
    /// Branch composition lifecycle state
    pub branch_state: BranchState,
    /// Resolved dependency paths scoping re-evaluation
    pub watch: Vec<JsonPointer>,
    /// Node-level error state (schema/expression/branch), non-fatal
    pub errors: Vec<FormError>,
    /// Issues collected from the validator plugin
    pub issues: Vec<ValidationIssue>,
}

impl SchemaNode {
    /// Create a fresh node with default flags.
    pub fn new(
        id: NodeId,
        path: JsonPointer,
        schema_path: JsonPointer,
        parent: Option<NodeId>,
        base: Arc<NormalizedSchema>,
    ) -> Self {
        let base_fingerprint = SchemaFingerprint::of_schema(&base);
        let effective = Arc::clone(&base);
        let fingerprint = base_fingerprint.clone();
        Self {
            id,
            path,
            schema_path,
            parent,
            children: Vec::new(),
            base,
            base_fingerprint,
            effective,
            fingerprint,
            value: Value::Null,
            required: false,
            active: true,
            visible: true,
            one_of_index: None,
            any_of_indices: Vec::new(),
            branch_state: BranchState::Unresolved,
            watch: Vec::new(),
            errors: Vec::new(),
            issues: Vec::new(),
        }
    }
}
