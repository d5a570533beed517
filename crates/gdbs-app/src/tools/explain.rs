use serde::Deserialize;

use gdbs_core::prelude::*;
use gdbs_core::{analyze, render, DetailLevel, Focus};

use super::ToolContext;
use crate::rpc::ToolResult;

#[derive(Debug, Default, Deserialize)]
pub(super) struct ExplainArgs {
    #[serde(default)]
    detail_level: Option<String>,
    #[serde(default)]
    focus: Option<String>,
}

impl ExplainArgs {
    fn detail_level(&self) -> DetailLevel {
        parse_or_default(self.detail_level.as_deref())
    }

    fn focus(&self) -> Focus {
        parse_or_default(self.focus.as_deref())
    }
}

/// Unknown values fall back to the default rather than failing the call
fn parse_or_default<T>(raw: Option<&str>) -> T
where
    T: std::str::FromStr<Err = String> + Default,
{
    match raw.map(str::parse::<T>) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            debug!("{}, using default", e);
            T::default()
        }
        None => T::default(),
    }
}

pub(super) fn explain(context: &ToolContext, args: ExplainArgs) -> Result<ToolResult> {
    let log = &context.log_file;
    if !log.exists() {
        return Ok(ToolResult::error(format!(
            "Error: File {} does not exist. Nothing to analyze.",
            log.path().display()
        )));
    }

    let content = log.read_all()?;
    if content.trim().is_empty() {
        return Ok(ToolResult::text(
            "The GDB output file is empty. Run some GDB commands first to generate output.",
        ));
    }

    let (detail, focus) = (args.detail_level(), args.focus());
    let findings = analyze(&content);
    debug!(
        "Explained {} ({} errors, {} breakpoints, status {})",
        log.name(),
        findings.errors.len(),
        findings.breakpoints.len(),
        findings.execution_status
    );

    Ok(ToolResult::text(render(&findings, detail, focus)))
}
