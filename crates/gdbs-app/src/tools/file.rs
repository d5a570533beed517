use serde::Deserialize;

use gdbs_core::prelude::*;

use super::ToolContext;
use crate::rpc::ToolResult;

#[derive(Debug, Default, Deserialize)]
pub(super) struct ReadFileArgs {
    /// Lines from the end; zero or negative reads everything
    #[serde(default)]
    lines: i64,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ClearFileArgs {
    #[serde(default)]
    confirm: bool,
}

pub(super) fn read_file(context: &ToolContext, args: ReadFileArgs) -> Result<ToolResult> {
    let log = &context.log_file;
    if !log.exists() {
        return Ok(ToolResult::error(format!(
            "Error: File {} does not exist.",
            log.path().display()
        )));
    }

    let count = usize::try_from(args.lines).unwrap_or(0);
    let lines = log.read_lines(count)?;
    let header = if count > 0 {
        format!("Last {} lines of {}:", lines.len(), log.name())
    } else {
        format!("Full content of {} ({} lines):", log.name(), lines.len())
    };

    Ok(ToolResult::text(format!("{}\n\n{}", header, lines.concat())))
}

pub(super) fn file_info(context: &ToolContext) -> Result<ToolResult> {
    let log = &context.log_file;
    let Some(info) = log.info()? else {
        return Ok(ToolResult::text(format!(
            "File {} does not exist.",
            log.path().display()
        )));
    };

    let modified = info
        .modified
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.6f").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(ToolResult::text(format!(
        "File Information:\n\
         Path: {}\n\
         Size: {} bytes ({:.2} KB)\n\
         Lines: {}\n\
         Last Modified: {}\n\
         Exists: Yes",
        log.path().display(),
        info.size,
        info.size as f64 / 1024.0,
        info.line_count,
        modified
    )))
}

pub(super) fn clear_file(context: &ToolContext, args: ClearFileArgs) -> Result<ToolResult> {
    if !args.confirm {
        return Ok(ToolResult::error(
            "Error: You must set 'confirm' to true to clear the file. This is a safety measure.",
        ));
    }

    let log = &context.log_file;
    if log.clear()? {
        Ok(ToolResult::text(format!(
            "File {} has been cleared successfully.",
            log.name()
        )))
    } else {
        Ok(ToolResult::text(format!(
            "File {} does not exist (nothing to clear).",
            log.path().display()
        )))
    }
}
