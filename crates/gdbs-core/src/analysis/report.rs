//! Markdown report rendering for [`AnalysisFindings`].
//!
//! The template is fixed: sections appear in a fixed order and are kept or
//! dropped according to the [`DetailLevel`] and [`Focus`]. Nothing here reads
//! clocks, environment or files, so identical inputs render identical bytes.

use super::findings::{AnalysisFindings, DetailLevel, ExecutionStatus, Focus};

/// Errors listed in the report
const MAX_LISTED_ERRORS: usize = 10;

/// Errors considered for plain-language explanations
const MAX_EXPLAINED_ERRORS: usize = 5;

/// Plain-language explanations keyed by a substring of the error line
const ERROR_EXPLANATIONS: &[(&str, &str)] = &[
    (
        "Don't know how to run",
        "GDB doesn't know how to execute the program. Try: `run` or `target exec <file>`",
    ),
    (
        "The program is not being run",
        "The program hasn't been started yet. Use `run` command to begin execution",
    ),
    (
        "No symbol table is loaded",
        "GDB doesn't have debugging information. Load the executable with `file <path>`",
    ),
    (
        "No debugging symbols found",
        "The program was compiled without debug info. Recompile with `-g` flag",
    ),
    (
        "Undefined command",
        "You used a command that GDB doesn't recognize. Check spelling or use `help`",
    ),
    (
        "Unrecognized argument",
        "A command received an invalid argument. Check the command syntax",
    ),
    (
        "Segmentation fault",
        "The program accessed memory it doesn't own. Use `bt` to find the faulting frame",
    ),
];

const COMMAND_REFERENCE: &[&str] = &[
    "- `run` or `r` - Start program execution",
    "- `break <function>` or `b <function>` - Set breakpoint at function",
    "- `break <line>` or `b <line>` - Set breakpoint at line number",
    "- `continue` or `c` - Continue execution until next breakpoint",
    "- `file <path>` - Load executable file",
    "- `list` or `l` - Show source code",
    "- `info breakpoints` - List all breakpoints",
    "- `info registers` - Show CPU register values",
    "- `backtrace` or `bt` - Show function call stack",
    "- `print <variable>` or `p <variable>` - Print variable value",
];

/// Render `findings` as a markdown report
pub fn render(findings: &AnalysisFindings, detail: DetailLevel, focus: Focus) -> String {
    let mut out = String::new();

    if detail == DetailLevel::Simple {
        quick_summary(&mut out, findings);
    }

    out.push_str("## GDB Output Analysis\n");
    out.push_str(
        "This analysis breaks down the GDB debugging session to help you understand what's happening.\n",
    );

    if detail.is_extended() {
        executive_summary(&mut out, findings);
    }

    if !findings.file_info.is_empty() && focus.is_any(&[Focus::All, Focus::Execution]) {
        file_information(&mut out, findings);
    }

    if !findings.functions.is_empty()
        && focus.is_any(&[Focus::All, Focus::Assembly, Focus::Execution])
    {
        functions(&mut out, findings, detail);
    }

    if !findings.breakpoints.is_empty()
        && focus.is_any(&[Focus::All, Focus::Breakpoints, Focus::Execution])
    {
        breakpoints(&mut out, findings, detail);
    }

    if !findings.errors.is_empty() && focus.is_any(&[Focus::All, Focus::Errors]) {
        errors(&mut out, findings, detail);
    }

    if !findings.issues.is_empty() && focus.is_any(&[Focus::All, Focus::Errors]) {
        out.push_str("### ⚠️ Common Issues Detected\n");
        for issue in &findings.issues {
            out.push_str(&format!("- {}\n", issue));
        }
        out.push('\n');
    }

    if detail.is_extended() {
        technical_findings(&mut out, findings);
    }

    if !findings.recommendations.is_empty() {
        out.push_str("### 💡 Recommended Next Steps\n");
        for (i, rec) in findings.recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, rec));
        }
        out.push('\n');
    }

    if detail == DetailLevel::Detailed {
        out.push_str("### 📚 Quick GDB Command Reference\n");
        for entry in COMMAND_REFERENCE {
            out.push_str(entry);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

fn quick_summary(out: &mut String, f: &AnalysisFindings) {
    out.push_str("## Quick Summary\n\n");
    out.push_str("The GDB session shows:\n");
    out.push_str(&format!("- {} function(s) analyzed\n", f.functions.len()));
    out.push_str(&format!("- {} breakpoint(s) set\n", f.breakpoints.len()));
    out.push_str(&format!("- {} error(s) encountered\n", f.errors.len()));
    out.push_str(&format!("- Program status: {}\n\n", f.execution_status.label()));
}

fn executive_summary(out: &mut String, f: &AnalysisFindings) {
    out.push_str("### 📋 Executive Summary\n");
    out.push_str(&format!(
        "- **Execution Status**: {}\n",
        f.execution_status.title()
    ));
    out.push_str(&format!("- **Functions Found**: {}\n", f.functions.len()));
    out.push_str(&format!("- **Breakpoints Set**: {}\n", f.breakpoints.len()));
    out.push_str(&format!("- **Errors Detected**: {}\n", f.errors.len()));
    out.push_str(&format!(
        "- **Assembly Code Present**: {}\n\n",
        if f.assembly_present { "Yes" } else { "No" }
    ));
}

fn file_information(out: &mut String, f: &AnalysisFindings) {
    let info = &f.file_info;
    out.push_str("### 📁 File Information\n");
    if let Some(exe) = &info.executable {
        out.push_str(&format!("- **Executable**: `{}`\n", exe));
    }
    if let Some(file_type) = &info.file_type {
        out.push_str(&format!("- **File Type**: {}\n", file_type));
    }
    if let Some(entry) = &info.entry_point {
        out.push_str(&format!("- **Entry Point**: {}\n", entry));
    }
    if let Some(symbols) = &info.symbol_file {
        out.push_str(&format!("- **Symbol File**: `{}`\n", symbols));
    }
    out.push('\n');
}

fn functions(out: &mut String, f: &AnalysisFindings, detail: DetailLevel) {
    out.push_str("### 🔍 Functions Analyzed\n");
    for func in &f.functions {
        out.push_str(&format!(
            "- **{}()**: Assembly code was dumped for this function\n",
            func
        ));
    }
    out.push('\n');
    if detail == DetailLevel::Detailed {
        out.push_str("💡 **What this means**: GDB disassembled these functions to show the machine code instructions.\n\n");
    }
}

fn breakpoints(out: &mut String, f: &AnalysisFindings, detail: DetailLevel) {
    out.push_str("### 🎯 Breakpoints\n");
    for bp in &f.breakpoints {
        let status = if bp.enabled { "Enabled" } else { "Disabled" };
        out.push_str(&format!(
            "- **Breakpoint #{}**: {} at `{}` (address: 0x{})\n",
            bp.number, status, bp.location, bp.address
        ));
    }
    out.push('\n');
    if detail.is_extended() {
        out.push_str("💡 **What this means**: Breakpoints pause program execution at specific locations. Use 'continue' to run until the next breakpoint.\n\n");
    }
}

fn errors(out: &mut String, f: &AnalysisFindings, detail: DetailLevel) {
    out.push_str("### ❌ Errors and Issues\n");
    for error in f.errors.iter().take(MAX_LISTED_ERRORS) {
        out.push_str(&format!("- **Line {}**: {}\n", error.line, error.message));
    }
    out.push('\n');

    if detail.is_extended() {
        out.push_str("**Simple Explanations**:\n");
        for error in f.errors.iter().take(MAX_EXPLAINED_ERRORS) {
            if let Some((key, explanation)) = ERROR_EXPLANATIONS
                .iter()
                .find(|(key, _)| error.message.contains(key))
            {
                out.push_str(&format!("- **{}**: {}\n", key, explanation));
            }
        }
        out.push('\n');
    }
}

fn technical_findings(out: &mut String, f: &AnalysisFindings) {
    out.push_str("### 🔬 Technical Findings\n");

    if f.assembly_present {
        out.push_str("- **Assembly Code Present**: The output contains disassembled machine code\n");
        out.push_str("  - This shows the low-level instructions the CPU executes\n");
        out.push_str(
            "  - Useful for understanding program flow and debugging at the machine level\n",
        );
    }

    if !f.breakpoints.is_empty() {
        out.push_str("- **Breakpoints Configured**: Debugging breakpoints are set up\n");
        out.push_str("  - Breakpoints allow you to pause execution at specific points\n");
        out.push_str("  - Use `info breakpoints` to see all breakpoints\n");
    }

    match f.execution_status {
        ExecutionStatus::NotRunning => {
            out.push_str("- **Program Not Running**: The program is loaded but not executing\n");
            out.push_str("  - This is normal when first starting GDB\n");
            out.push_str("  - Use `run` to start execution\n");
        }
        ExecutionStatus::Stopped => {
            out.push_str("- **Program Paused**: Execution stopped at a breakpoint\n");
            out.push_str("  - Locals and registers of the current frame can be inspected\n");
        }
        _ => {}
    }

    out.push('\n');
}
