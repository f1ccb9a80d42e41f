//! plandiff - Structured diffs of infrastructure plans.
//!
//! Given a JSON plan and the provider schemas it was computed against, this
//! library reconciles the before and after state of every resource and output,
//! classifies each nested element as created, updated, deleted or unchanged,
//! tracks sensitivity, unknown values and forced replacement, and renders both
//! sides as HCL-like text with a unified diff between them.
//!
//! # Example
//!
//! ```no_run
//! use plandiff_rs::{diff_plan, format_diff, parse_plan_file, parse_schemas_file};
//! use plandiff_rs::{OutputFormat, OutputOptions, PlanDiffConfig};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = parse_plan_file(Path::new("plan.json"))?;
//! let schemas = parse_schemas_file(Path::new("schemas.json"))?;
//!
//! let diff = diff_plan(&plan, &schemas, &PlanDiffConfig::default())?;
//!
//! let output = format_diff(&diff, &OutputFormat::Terminal, &OutputOptions::default())?;
//! println!("{}", output);
//! # Ok(())
//! # }
//! ```

pub mod change;
pub mod collections;
pub mod computed;
pub mod differ;
pub mod error;
pub mod logging;
pub mod output;
pub mod parser;
pub mod path;
pub mod plan;
pub mod render;
pub mod schema;
pub mod value;

// Re-export commonly used types for convenience
pub use change::Change;
pub use computed::{Action, ComputedDiff, Renderer};
pub use differ::{
    compute_diff_for_attribute, compute_diff_for_block, compute_diff_for_output,
    compute_diff_for_type,
};
pub use error::{DiffError, OutputError, ParseError, PlanDiffError};
pub use output::{format_diff, format_summary, OutputFormat, OutputOptions, Summary};
pub use parser::{parse_plan_file, parse_plan_json, parse_schemas_file, parse_schemas_json};
pub use path::Matcher;
pub use plan::{diff_plan, Diff, DiffFailure, OutputDiff, Plan, PlanAction, PlanDiffConfig, ResourceDiff};
pub use render::{render_after, render_before, RenderNode};
pub use schema::{ProviderSchemas, Type};
pub use value::Value;
