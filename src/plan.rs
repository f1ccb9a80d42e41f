//! Plan documents and the orchestrator that diffs them.
//!
//! [`diff_plan`] walks every resource change, drift entry and output change of
//! a plan, diffs each one against its schema, renders the before and after
//! text and packages a unified diff with positioned warnings.
//!
//! # Examples
//!
//! ```
//! use plandiff_rs::plan::{diff_plan, Plan, PlanDiffConfig};
//! use plandiff_rs::schema::ProviderSchemas;
//! use serde_json::json;
//!
//! let plan: Plan = serde_json::from_value(json!({
//!     "format_version": "1.2",
//!     "output_changes": {
//!         "greeting": {"actions": ["create"], "before": null, "after": "hello"}
//!     }
//! }))
//! .unwrap();
//!
//! let diff = diff_plan(&plan, &ProviderSchemas::default(), &PlanDiffConfig::default()).unwrap();
//! assert_eq!(diff.outputs[0].after, "output \"greeting\" {\n  value = \"hello\"\n}\n");
//! ```

use crate::change::Change;
use crate::computed::Action;
use crate::differ::{compute_diff_for_block, compute_diff_for_output};
use crate::error::{DiffError, PlanDiffError, Result};
use crate::path::Matcher;
use crate::render::{render_after, render_before, NodeKind, RenderNode, RenderWarning};
use crate::schema::{ProviderSchemas, ResourceMode};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// The plan format versions this crate understands.
pub const ACCEPTED_FORMAT_VERSIONS: &str = ">= 0.1, < 2.0";

/// A plan as produced by `terraform show -json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub format_version: String,
    #[serde(default)]
    pub resource_changes: Vec<ResourceChange>,
    #[serde(default)]
    pub resource_drift: Vec<ResourceChange>,
    #[serde(default)]
    pub output_changes: BTreeMap<String, JsonChange>,
    #[serde(default)]
    pub relevant_attributes: Vec<RelevantAttribute>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceChange {
    pub address: String,
    #[serde(default)]
    pub previous_address: Option<String>,
    #[serde(default)]
    pub module_address: Option<String>,
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub index: Option<serde_json::Value>,
    pub provider_name: String,
    pub change: JsonChange,
    #[serde(default)]
    pub action_reason: Option<String>,
}

/// The raw change envelope of a resource or output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonChange {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub before: Option<serde_json::Value>,
    #[serde(default)]
    pub after: Option<serde_json::Value>,
    #[serde(default)]
    pub after_unknown: Option<serde_json::Value>,
    #[serde(default)]
    pub before_sensitive: Option<serde_json::Value>,
    #[serde(default)]
    pub after_sensitive: Option<serde_json::Value>,
    #[serde(default)]
    pub replace_paths: Option<serde_json::Value>,
    #[serde(default)]
    pub importing: Option<serde_json::Value>,
}

impl JsonChange {
    /// Converts the envelope into a [`Change`] rooted at the resource.
    pub fn to_change(&self, relevant_attributes: Matcher) -> Result<Change> {
        Ok(Change::from_json(
            self.before.clone(),
            self.after.clone(),
            self.after_unknown.clone(),
            self.before_sensitive.clone(),
            self.after_sensitive.clone(),
            Matcher::parse(self.replace_paths.as_ref(), false)?,
            relevant_attributes,
        ))
    }

    fn is_importing(&self) -> bool {
        self.importing.as_ref().is_some_and(|i| !i.is_null())
    }
}

/// An attribute that contributed to the plan, used to narrow drift output.
#[derive(Debug, Clone, Deserialize)]
pub struct RelevantAttribute {
    pub resource: String,
    pub attribute: serde_json::Value,
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDiffConfig {
    /// Unchanged lines kept around each hunk of the unified diff.
    pub context_radius: usize,
    /// Abort on the first resource that cannot be diffed.
    pub fail_fast: bool,
    /// Also render resources and outputs whose planned action is no-op.
    pub include_no_op: bool,
}

impl Default for PlanDiffConfig {
    fn default() -> Self {
        Self {
            context_radius: 3,
            fail_fast: false,
            include_no_op: false,
        }
    }
}

/// The planned action of a resource or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanAction {
    Create,
    Read,
    Update,
    Delete,
    NoOp,
    #[serde(rename = "create-then-destroy")]
    CreateThenDestroy,
    #[serde(rename = "destroy-then-create")]
    DestroyThenCreate,
}

impl PlanAction {
    /// Resolves the raw action list of a change envelope.
    pub fn from_actions(actions: &[String]) -> Result<Self> {
        let actions: Vec<&str> = actions.iter().map(String::as_str).collect();
        match actions.as_slice() {
            ["no-op"] => Ok(PlanAction::NoOp),
            ["create"] => Ok(PlanAction::Create),
            ["read"] => Ok(PlanAction::Read),
            ["update"] => Ok(PlanAction::Update),
            ["delete"] => Ok(PlanAction::Delete),
            ["create", "delete"] => Ok(PlanAction::CreateThenDestroy),
            ["delete", "create"] => Ok(PlanAction::DestroyThenCreate),
            other => Err(DiffError::UnsupportedActions {
                actions: format!("{other:?}"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAction::Create => "create",
            PlanAction::Read => "read",
            PlanAction::Update => "update",
            PlanAction::Delete => "delete",
            PlanAction::NoOp => "no-op",
            PlanAction::CreateThenDestroy => "create-then-destroy",
            PlanAction::DestroyThenCreate => "destroy-then-create",
        }
    }

    pub fn is_replace(&self) -> bool {
        matches!(self, PlanAction::CreateThenDestroy | PlanAction::DestroyThenCreate)
    }
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rendered text a warning points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub side: Side,
    /// 1-based line number in that side's text.
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDiff {
    pub address: String,
    pub previous_address: Option<String>,
    pub action: PlanAction,
    pub action_reason: Option<String>,
    pub moved: bool,
    pub imported: bool,
    pub drifted: bool,
    /// Unified diff of `before` against `after`.
    pub diff: String,
    pub before: String,
    pub after: String,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDiff {
    pub name: String,
    pub action: PlanAction,
    pub diff: String,
    pub before: String,
    pub after: String,
    pub warnings: Vec<Warning>,
}

/// A resource or output that could not be diffed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffFailure {
    pub address: String,
    pub message: String,
}

/// The diff of a whole plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diff {
    pub resources: Vec<ResourceDiff>,
    pub outputs: Vec<OutputDiff>,
    pub failures: Vec<DiffFailure>,
}

impl Diff {
    /// True when some resource or output is planned to change.
    pub fn has_changes(&self) -> bool {
        self.resources.iter().any(|r| r.action != PlanAction::NoOp)
            || self.outputs.iter().any(|o| o.action != PlanAction::NoOp)
    }
}

/// Diffs every resource change, drift entry and output of a plan.
///
/// # Arguments
///
/// * `plan` - The decoded plan document
/// * `schemas` - Provider schemas for every resource type in the plan
/// * `config` - Orchestrator settings
///
/// # Returns
///
/// The packaged diff. Resources that fail to diff are collected in
/// [`Diff::failures`] unless `config.fail_fast` is set, in which case the
/// first failure is returned as an error.
pub fn diff_plan(
    plan: &Plan,
    schemas: &ProviderSchemas,
    config: &PlanDiffConfig,
) -> Result<Diff, PlanDiffError> {
    check_format_version(&plan.format_version)?;
    let relevant = relevant_attributes_by_address(&plan.relevant_attributes)?;

    let mut diff = Diff::default();
    let mut rendered = BTreeSet::new();

    for change in &plan.resource_changes {
        debug!(address = %change.address, "diffing resource change");
        match diff_resource(change, schemas, Matcher::always(), false, config) {
            Ok(Some(resource)) => {
                rendered.insert(resource.address.clone());
                diff.resources.push(resource);
            }
            Ok(None) => debug!(address = %change.address, "skipping unchanged resource"),
            Err(source) => record_failure(&mut diff, config, &change.address, source)?,
        }
    }

    for drift in &plan.resource_drift {
        if rendered.contains(&drift.address) {
            continue;
        }
        let matcher = if plan.relevant_attributes.is_empty() {
            Matcher::always()
        } else {
            relevant
                .get(&drift.address)
                .cloned()
                .unwrap_or_else(|| Matcher::empty(true))
        };
        debug!(address = %drift.address, "diffing resource drift");
        match diff_resource(drift, schemas, matcher, true, config) {
            Ok(Some(resource)) => diff.resources.push(resource),
            Ok(None) => {}
            Err(source) => record_failure(&mut diff, config, &drift.address, source)?,
        }
    }

    for (name, change) in &plan.output_changes {
        debug!(output = %name, "diffing output change");
        match diff_output(name, change, config) {
            Ok(Some(output)) => diff.outputs.push(output),
            Ok(None) => {}
            Err(source) => record_failure(&mut diff, config, &format!("output.{name}"), source)?,
        }
    }

    info!(
        resources = diff.resources.len(),
        outputs = diff.outputs.len(),
        failures = diff.failures.len(),
        "plan diff complete"
    );
    Ok(diff)
}

fn record_failure(
    diff: &mut Diff,
    config: &PlanDiffConfig,
    address: &str,
    source: DiffError,
) -> Result<(), PlanDiffError> {
    if config.fail_fast {
        return Err(PlanDiffError::Resource {
            address: address.to_string(),
            source,
        });
    }
    warn!(address = %address, error = %source, "could not diff, continuing with the rest of the plan");
    diff.failures.push(DiffFailure {
        address: address.to_string(),
        message: source.to_string(),
    });
    Ok(())
}

fn diff_resource(
    resource: &ResourceChange,
    schemas: &ProviderSchemas,
    relevant: Matcher,
    drifted: bool,
    config: &PlanDiffConfig,
) -> Result<Option<ResourceDiff>> {
    let action = PlanAction::from_actions(&resource.change.actions)?;
    let moved = resource
        .previous_address
        .as_ref()
        .is_some_and(|previous| *previous != resource.address);
    let imported = resource.change.is_importing();

    let skip_no_op = drifted || !config.include_no_op;
    if action == PlanAction::NoOp && !moved && !imported && skip_no_op {
        return Ok(None);
    }

    let mode = ResourceMode::parse(&resource.mode)?;
    let schema = schemas.schema_for(&resource.provider_name, &resource.mode, &resource.resource_type)?;
    let computed = compute_diff_for_block(resource.change.to_change(relevant)?, &schema.block)?;
    if drifted && computed.action == Action::NoOp {
        return Ok(None);
    }

    let root = RenderNode::new(
        NodeKind::NestedBlock {
            name: mode.keyword().to_string(),
            labels: vec![resource.resource_type.clone(), resource.name.clone()],
            body: Box::new(computed.render()),
        },
        computed.action,
        false,
    );
    let sides = render_sides(&root, config.context_radius);

    Ok(Some(ResourceDiff {
        address: resource.address.clone(),
        previous_address: resource.previous_address.clone(),
        action,
        action_reason: resource.action_reason.clone(),
        moved,
        imported,
        drifted,
        diff: sides.diff,
        before: sides.before,
        after: sides.after,
        warnings: sides.warnings,
    }))
}

fn diff_output(name: &str, change: &JsonChange, config: &PlanDiffConfig) -> Result<Option<OutputDiff>> {
    let action = PlanAction::from_actions(&change.actions)?;
    if action == PlanAction::NoOp && !config.include_no_op {
        return Ok(None);
    }

    let computed = compute_diff_for_output(change.to_change(Matcher::always())?)?;
    let value = RenderNode::new(
        NodeKind::KeyValue {
            key: "value".to_string(),
            width: 0,
            value: Box::new(computed.render()),
        },
        computed.action,
        false,
    );
    let body = RenderNode::new(
        NodeKind::Block {
            attributes: vec![value],
            blocks: Vec::new(),
        },
        computed.action,
        false,
    );
    let root = RenderNode::new(
        NodeKind::NestedBlock {
            name: "output".to_string(),
            labels: vec![name.to_string()],
            body: Box::new(body),
        },
        computed.action,
        false,
    );
    let sides = render_sides(&root, config.context_radius);

    Ok(Some(OutputDiff {
        name: name.to_string(),
        action,
        diff: sides.diff,
        before: sides.before,
        after: sides.after,
        warnings: sides.warnings,
    }))
}

struct Sides {
    before: String,
    after: String,
    diff: String,
    warnings: Vec<Warning>,
}

fn render_sides(root: &RenderNode, context_radius: usize) -> Sides {
    let before = render_before(root);
    let after = render_after(root);

    let diff = TextDiff::from_lines(&before.text, &after.text)
        .unified_diff()
        .context_radius(context_radius)
        .header("before", "after")
        .to_string();

    let tag = |side: Side| move |w: RenderWarning| Warning {
        side,
        line: w.line,
        message: w.message,
    };
    let mut warnings: Vec<Warning> = before.warnings.into_iter().map(tag(Side::Before)).collect();
    warnings.extend(after.warnings.into_iter().map(tag(Side::After)));

    Sides {
        before: before.text,
        after: after.text,
        diff,
        warnings,
    }
}

/// Accepts `major.minor` versions in [`ACCEPTED_FORMAT_VERSIONS`].
pub fn check_format_version(version: &str) -> Result<()> {
    let supported = parse_version(version).is_some_and(|v| v >= (0, 1) && v < (2, 0));
    if supported {
        Ok(())
    } else {
        Err(DiffError::UnsupportedFormatVersion {
            version: version.to_string(),
            accepted: ACCEPTED_FORMAT_VERSIONS.to_string(),
        })
    }
}

fn parse_version(version: &str) -> Option<(u64, u64)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => minor.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

fn relevant_attributes_by_address(attributes: &[RelevantAttribute]) -> Result<BTreeMap<String, Matcher>> {
    let mut by_address: BTreeMap<String, Matcher> = BTreeMap::new();
    for attribute in attributes {
        let path = attribute.attribute.as_array().ok_or_else(|| {
            DiffError::attribute_paths(format!(
                "expected a path array for {}, got {}",
                attribute.resource, attribute.attribute
            ))
        })?;
        by_address
            .entry(attribute.resource.clone())
            .or_insert_with(|| Matcher::empty(true))
            .add_path(path.iter().cloned().map(Value::from).collect());
    }
    Ok(by_address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schemas() -> ProviderSchemas {
        serde_json::from_value(json!({
            "format_version": "1.0",
            "provider_schemas": {
                "registry.terraform.io/hashicorp/test": {
                    "resource_schemas": {
                        "test_thing": {"version": 0, "block": {"attributes": {
                            "id": {"type": "string", "computed": true},
                            "name": {"type": "string", "optional": true},
                            "size": {"type": "number", "optional": true}
                        }}}
                    }
                }
            }
        }))
        .unwrap()
    }

    fn plan(value: serde_json::Value) -> Plan {
        serde_json::from_value(value).unwrap()
    }

    fn thing(address: &str, actions: &[&str], before: serde_json::Value, after: serde_json::Value) -> serde_json::Value {
        json!({
            "address": address,
            "mode": "managed",
            "type": "test_thing",
            "name": address.rsplit('.').next().unwrap(),
            "provider_name": "registry.terraform.io/hashicorp/test",
            "change": {"actions": actions, "before": before, "after": after}
        })
    }

    #[test]
    fn test_format_version_range() {
        assert!(check_format_version("0.1").is_ok());
        assert!(check_format_version("1.2").is_ok());
        assert!(check_format_version("0.0").is_err());
        assert!(check_format_version("2.0").is_err());
        assert!(check_format_version("").is_err());
    }

    #[test]
    fn test_rejects_unsupported_version_before_diffing() {
        let p = plan(json!({"format_version": "3.0"}));
        let err = diff_plan(&p, &schemas(), &PlanDiffConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PlanDiffError::Diff(DiffError::UnsupportedFormatVersion { .. })
        ));
    }

    #[test]
    fn test_plan_action_from_actions() {
        let actions = |a: &[&str]| a.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(PlanAction::from_actions(&actions(&["delete", "create"])).unwrap(), PlanAction::DestroyThenCreate);
        assert_eq!(PlanAction::from_actions(&actions(&["create", "delete"])).unwrap(), PlanAction::CreateThenDestroy);
        assert!(PlanAction::from_actions(&actions(&["forget"])).is_err());
    }

    #[test]
    fn test_update_resource() {
        let p = plan(json!({
            "format_version": "1.2",
            "resource_changes": [thing("test_thing.a", &["update"], json!({"id": "1", "name": "old"}), json!({"id": "1", "name": "new"}))]
        }));
        let diff = diff_plan(&p, &schemas(), &PlanDiffConfig::default()).unwrap();
        let resource = &diff.resources[0];
        assert_eq!(resource.action, PlanAction::Update);
        assert_eq!(
            resource.before,
            "resource \"test_thing\" \"a\" {\n  id   = \"1\"\n  name = \"old\"\n}\n"
        );
        assert!(resource.diff.starts_with("--- before\n+++ after\n"));
        assert!(resource.diff.contains("-  name = \"old\"\n+  name = \"new\"\n"));
    }

    #[test]
    fn test_no_op_resource_skipped_unless_moved() {
        let mut moved = thing("test_thing.b", &["no-op"], json!({"id": "1"}), json!({"id": "1"}));
        moved["previous_address"] = json!("test_thing.old");
        let p = plan(json!({
            "format_version": "1.2",
            "resource_changes": [
                thing("test_thing.a", &["no-op"], json!({"id": "1"}), json!({"id": "1"})),
                moved
            ]
        }));
        let diff = diff_plan(&p, &schemas(), &PlanDiffConfig::default()).unwrap();
        assert_eq!(diff.resources.len(), 1);
        assert!(diff.resources[0].moved);
        assert!(diff.resources[0].diff.is_empty());
        assert!(!diff.has_changes());
    }

    #[test]
    fn test_failures_are_isolated() {
        let mut broken = thing("test_thing.broken", &["create"], json!(null), json!({"id": "1"}));
        broken["type"] = json!("test_missing");
        let p = plan(json!({
            "format_version": "1.2",
            "resource_changes": [broken, thing("test_thing.ok", &["create"], json!(null), json!({"id": "1"}))]
        }));
        let diff = diff_plan(&p, &schemas(), &PlanDiffConfig::default()).unwrap();
        assert_eq!(diff.resources.len(), 1);
        assert_eq!(diff.failures[0].address, "test_thing.broken");

        let config = PlanDiffConfig {
            fail_fast: true,
            ..Default::default()
        };
        assert!(matches!(
            diff_plan(&p, &schemas(), &config),
            Err(PlanDiffError::Resource { .. })
        ));
    }

    #[test]
    fn test_drift_narrowed_by_relevant_attributes() {
        let p = plan(json!({
            "format_version": "1.2",
            "resource_drift": [
                thing("test_thing.a", &["update"], json!({"id": "1", "name": "x", "size": 1}), json!({"id": "1", "name": "y", "size": 2}))
            ],
            "relevant_attributes": [{"resource": "test_thing.a", "attribute": ["size"]}]
        }));
        let diff = diff_plan(&p, &schemas(), &PlanDiffConfig::default()).unwrap();
        let drift = &diff.resources[0];
        assert!(drift.drifted);
        assert!(drift.diff.contains("-  size = 1\n+  size = 2\n"));
        assert!(!drift.diff.contains("+  name"));
    }

    #[test]
    fn test_drift_skipped_when_already_changed() {
        let change = thing("test_thing.a", &["update"], json!({"id": "1", "name": "a"}), json!({"id": "1", "name": "b"}));
        let p = plan(json!({
            "format_version": "1.2",
            "resource_changes": [change.clone()],
            "resource_drift": [change]
        }));
        let diff = diff_plan(&p, &schemas(), &PlanDiffConfig::default()).unwrap();
        assert_eq!(diff.resources.len(), 1);
        assert!(!diff.resources[0].drifted);
    }

    #[test]
    fn test_sensitive_output_warning() {
        let p = plan(json!({
            "format_version": "1.2",
            "output_changes": {
                "secret": {
                    "actions": ["update"],
                    "before": "x", "after": "x",
                    "before_sensitive": true, "after_sensitive": false
                }
            }
        }));
        let diff = diff_plan(&p, &schemas(), &PlanDiffConfig::default()).unwrap();
        let output = &diff.outputs[0];
        assert_eq!(output.after, "output \"secret\" {\n  value = (value)\n}\n");
        assert_eq!(
            output.warnings,
            vec![Warning {
                side: Side::After,
                line: 2,
                message: "This attribute value will no longer be marked as sensitive after applying this change (the value is unchanged)".to_string(),
            }]
        );
    }
}
