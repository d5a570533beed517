//! Rule tables for the transcript scan.
//!
//! Every line passes through [`LINE_RULES`] in order. Each rule is a tagged
//! variant whose effect on [`AnalysisFindings`] follows its own accumulation
//! policy:
//!
//! | Rule | Policy |
//! |------|--------|
//! | error signature | first signature wins, line recorded once |
//! | warning marker | appended |
//! | breakpoint row | appended, never merged |
//! | function dump header | appended, sets the assembly flag |
//! | instruction address | sets the assembly flag |
//! | file metadata | each key overwritten (last match wins) |
//! | execution status | first trigger in table order per line, last matching line wins |
//! | known issue | every trigger appends its diagnostic (duplicates kept) |
//!
//! After the scan, [`RECOMMENDATION_RULES`] is evaluated once against the
//! aggregate.

use std::sync::LazyLock;

use regex::Regex;

use super::findings::{AnalysisFindings, Breakpoint, ErrorFinding, ExecutionStatus, WarningFinding};

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

/// Error signatures in priority order: `(name, case-insensitive pattern)`.
///
/// "The program is not being run" is deliberately absent: it is an execution
/// state, handled by the status triggers.
const ERROR_SIGNATURES: &[(&str, &str)] = &[
    ("error", r"error: (.+)"),
    ("segfault", r"Segmentation fault"),
    ("signal", r"Signal (.+) received"),
    ("received_signal", r"Program received signal"),
    ("fatal", r"Fatal error"),
    ("cannot_run", r"Don't know how to run"),
    ("undefined_command", r"Undefined command"),
    ("no_symbol_table", r"No symbol table is loaded"),
    ("bad_argument", r"Unrecognized argument"),
];

static ERROR_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ERROR_SIGNATURES
        .iter()
        .map(|(name, pattern)| {
            let re = Regex::new(&format!("(?i){pattern}")).expect("Invalid error signature regex");
            (*name, re)
        })
        .collect()
});

/// `info breakpoints` row: `Num Type Disp Enb Address What`
static BREAKPOINT_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d+)\s+((?:hw |read |acc )?(?:breakpoint|watchpoint|catchpoint))\s+(keep|del|dis)\s+([yn])\s+0x([0-9a-fA-F]+)\s+(?:<(.+)>|in (.+))",
    )
    .expect("Invalid breakpoint row regex")
});

static FUNCTION_DUMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Dump of assembler code for function (.+):").expect("Invalid function dump regex")
});

static INSTRUCTION_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"0x[0-9a-fA-F]+\s+<[^>]+>:").expect("Invalid instruction address regex")
});

static SYMBOL_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Symbols from "(.+)""#).expect("Invalid symbol file regex")
});

static EXEC_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`(.+)', file type (.+)").expect("Invalid exec file regex")
});

static ENTRY_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Entry point: (0x[0-9a-fA-F]+)").expect("Invalid entry point regex")
});

/// `Breakpoint 1, main () at prog.c:5`
static BREAKPOINT_HIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:Temporary )?[Bb]reakpoint \d+, ").expect("Invalid breakpoint hit regex")
});

// ─────────────────────────────────────────────────────────────────────────────
// Substring trigger tables
// ─────────────────────────────────────────────────────────────────────────────

/// Status triggers in priority order; at most one applies per line.
const STATUS_TRIGGERS: &[(&str, ExecutionStatus)] = &[
    ("The program is not being run", ExecutionStatus::NotRunning),
    ("Program received signal", ExecutionStatus::Crashed),
    ("Program exited", ExecutionStatus::Exited),
    ("exited normally", ExecutionStatus::Exited),
    ("exited with code", ExecutionStatus::Exited),
    ("Reading symbols", ExecutionStatus::Loading),
    ("Starting program:", ExecutionStatus::Running),
];

pub(crate) const NO_DEBUG_SYMBOLS_ISSUE: &str =
    "No debugging symbols found - compile with -g flag for better debugging";

const ISSUE_TRIGGERS: &[(&str, &str)] = &[
    ("No debugging symbols found", NO_DEBUG_SYMBOLS_ISSUE),
    (
        "Don't know how to run",
        "Program target not configured - use 'run' command or 'target' command",
    ),
    ("Undefined command", "Invalid GDB command used"),
    (
        "No symbol table is loaded",
        "No symbol table loaded - use 'file' command to load executable",
    ),
];

// ─────────────────────────────────────────────────────────────────────────────
// Per-line rules
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of the per-line scan table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineRule {
    ErrorSignature,
    WarningMarker,
    BreakpointRow,
    FunctionDump,
    InstructionAddress,
    FileMetadata,
    ExecutionStatus,
    KnownIssue,
}

/// The scan order
pub(crate) const LINE_RULES: [LineRule; 8] = [
    LineRule::ErrorSignature,
    LineRule::WarningMarker,
    LineRule::BreakpointRow,
    LineRule::FunctionDump,
    LineRule::InstructionAddress,
    LineRule::FileMetadata,
    LineRule::ExecutionStatus,
    LineRule::KnownIssue,
];

impl LineRule {
    /// Apply this rule to one transcript line (`line_no` is 1-indexed)
    pub(crate) fn apply(self, line_no: usize, line: &str, findings: &mut AnalysisFindings) {
        match self {
            LineRule::ErrorSignature => {
                if let Some((signature, _)) =
                    ERROR_PATTERNS.iter().find(|(_, re)| re.is_match(line))
                {
                    findings.errors.push(ErrorFinding {
                        line: line_no,
                        message: line.trim().to_string(),
                        signature: *signature,
                    });
                }
            }
            LineRule::WarningMarker => {
                if line.to_lowercase().contains("warning") {
                    findings.warnings.push(WarningFinding {
                        line: line_no,
                        message: line.trim().to_string(),
                    });
                }
            }
            LineRule::BreakpointRow => {
                if let Some(caps) = BREAKPOINT_ROW.captures(line) {
                    let location = caps
                        .get(6)
                        .or_else(|| caps.get(7))
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_default();
                    findings.breakpoints.push(Breakpoint {
                        number: caps[1].to_string(),
                        kind: caps[2].to_string(),
                        disposition: caps[3].to_string(),
                        enabled: &caps[4] == "y",
                        address: caps[5].to_string(),
                        location,
                    });
                }
            }
            LineRule::FunctionDump => {
                if let Some(caps) = FUNCTION_DUMP.captures(line) {
                    findings.functions.push(caps[1].to_string());
                    findings.assembly_present = true;
                }
            }
            LineRule::InstructionAddress => {
                if INSTRUCTION_ADDRESS.is_match(line) {
                    findings.assembly_present = true;
                }
            }
            LineRule::FileMetadata => {
                let info = &mut findings.file_info;
                if let Some(caps) = SYMBOL_FILE.captures(line) {
                    info.symbol_file = Some(caps[1].to_string());
                }
                if let Some(caps) = EXEC_FILE.captures(line) {
                    info.executable = Some(caps[1].to_string());
                    info.file_type = Some(caps[2].trim_end_matches('.').to_string());
                }
                if let Some(caps) = ENTRY_POINT.captures(line) {
                    info.entry_point = Some(caps[1].to_string());
                }
            }
            LineRule::ExecutionStatus => {
                let triggered = STATUS_TRIGGERS
                    .iter()
                    .find(|(needle, _)| line.contains(needle))
                    .map(|(_, status)| *status)
                    .or_else(|| BREAKPOINT_HIT.is_match(line).then_some(ExecutionStatus::Stopped));
                if let Some(status) = triggered {
                    findings.execution_status = status;
                }
            }
            LineRule::KnownIssue => {
                for (needle, issue) in ISSUE_TRIGGERS {
                    if line.contains(needle) {
                        findings.issues.push((*issue).to_string());
                    }
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recommendations
// ─────────────────────────────────────────────────────────────────────────────

/// A recommendation emitted when `applies` holds for the final aggregate
pub(crate) struct RecommendationRule {
    pub applies: fn(&AnalysisFindings) -> bool,
    pub text: &'static str,
}

pub(crate) const RECOMMENDATION_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        applies: |f| f.execution_status == ExecutionStatus::NotRunning,
        text: "Use 'run' command to start the program execution",
    },
    RecommendationRule {
        applies: |f| f.file_info.executable.is_none(),
        text: "Load executable with 'file <path>' command",
    },
    RecommendationRule {
        applies: |f| f.issues.iter().any(|i| i == NO_DEBUG_SYMBOLS_ISSUE),
        text: "Recompile with debugging symbols: gcc -g -o program program.c",
    },
    RecommendationRule {
        applies: |f| !f.breakpoints.is_empty(),
        text: "Breakpoints are set - use 'continue' or 'run' to execute until breakpoint",
    },
    RecommendationRule {
        applies: |f| {
            f.breakpoints.is_empty() && f.execution_status == ExecutionStatus::NotRunning
        },
        text: "Consider setting breakpoints with 'break <function>' or 'break <line>' before running",
    },
    RecommendationRule {
        applies: |f| f.execution_status == ExecutionStatus::Stopped,
        text: "Execution is paused - inspect with 'bt' and 'info locals', then use 'next' or 'step'",
    },
    RecommendationRule {
        applies: |f| f.execution_status == ExecutionStatus::Crashed,
        text: "The program crashed - use 'bt' to see the call stack at the fault",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(rule: LineRule, lines: &[&str]) -> AnalysisFindings {
        let mut findings = AnalysisFindings::default();
        for (i, line) in lines.iter().enumerate() {
            rule.apply(i + 1, line, &mut findings);
        }
        findings
    }

    #[test]
    fn test_all_error_signatures_compile() {
        assert_eq!(ERROR_PATTERNS.len(), ERROR_SIGNATURES.len());
    }

    #[test]
    fn test_error_first_signature_wins() {
        // Matches both "error" and "undefined_command"
        let f = apply(
            LineRule::ErrorSignature,
            &["Error: Undefined command: \"foo\".  Try \"help\"."],
        );
        assert_eq!(f.errors.len(), 1);
        assert_eq!(f.errors[0].signature, "error");
        assert_eq!(f.errors[0].line, 1);
    }

    #[test]
    fn test_error_signatures_case_insensitive() {
        let f = apply(LineRule::ErrorSignature, &["SEGMENTATION FAULT (core dumped)"]);
        assert_eq!(f.errors[0].signature, "segfault");
    }

    #[test]
    fn test_not_being_run_is_not_an_error() {
        let f = apply(LineRule::ErrorSignature, &["The program is not being run."]);
        assert!(f.errors.is_empty());
    }

    #[test]
    fn test_warning_marker_case_insensitive() {
        let f = apply(
            LineRule::WarningMarker,
            &["WARNING: something", "no issue here", "  warning: trimmed  "],
        );
        assert_eq!(f.warnings.len(), 2);
        assert_eq!(f.warnings[1].line, 3);
        assert_eq!(f.warnings[1].message, "warning: trimmed");
    }

    #[test]
    fn test_breakpoint_row_enabled_flag() {
        let f = apply(
            LineRule::BreakpointRow,
            &[
                "Num     Type           Disp Enb Address            What",
                "1       breakpoint     keep y   0x0000000000401136 <main+4>",
                "2       breakpoint     keep n   0x0000000000401150 <f1+8>",
            ],
        );
        assert_eq!(f.breakpoints.len(), 2);
        assert_eq!(f.breakpoints[0].number, "1");
        assert_eq!(f.breakpoints[0].kind, "breakpoint");
        assert_eq!(f.breakpoints[0].disposition, "keep");
        assert!(f.breakpoints[0].enabled);
        assert_eq!(f.breakpoints[0].address, "0000000000401136");
        assert_eq!(f.breakpoints[0].location, "main+4");
        assert!(!f.breakpoints[1].enabled);
    }

    #[test]
    fn test_breakpoint_row_source_location() {
        let f = apply(
            LineRule::BreakpointRow,
            &["1       breakpoint     keep y   0x0000000000401136 in main at ctf.c:52"],
        );
        assert_eq!(f.breakpoints[0].location, "main at ctf.c:52");
    }

    #[test]
    fn test_breakpoint_number_kept_verbatim() {
        let f = apply(
            LineRule::BreakpointRow,
            &["99999999999   breakpoint     keep y   0x0000000000401136 <main+4>"],
        );
        assert_eq!(f.breakpoints.len(), 1);
        assert_eq!(f.breakpoints[0].number, "99999999999");
    }

    #[test]
    fn test_breakpoint_rows_not_merged() {
        let row = "3       breakpoint     keep y   0x0000000000401136 <main+4>";
        let f = apply(LineRule::BreakpointRow, &[row, row]);
        assert_eq!(f.breakpoints.len(), 2);
    }

    #[test]
    fn test_function_dump_sets_assembly() {
        let f = apply(
            LineRule::FunctionDump,
            &["Dump of assembler code for function f1:"],
        );
        assert_eq!(f.functions, vec!["f1"]);
        assert!(f.assembly_present);
    }

    #[test]
    fn test_instruction_address_sets_assembly() {
        let f = apply(
            LineRule::InstructionAddress,
            &["   0x0000000000401126 <+0>:\tpush   %rbp"],
        );
        assert!(f.assembly_present);
        assert!(f.functions.is_empty());
    }

    #[test]
    fn test_file_metadata_last_match_wins() {
        let f = apply(
            LineRule::FileMetadata,
            &[
                "Symbols from \"/tmp/old\".",
                "\t`/tmp/ctf', file type elf64-x86-64.",
                "\tEntry point: 0x401040",
                "Symbols from \"/tmp/ctf\".",
            ],
        );
        assert_eq!(f.file_info.symbol_file.as_deref(), Some("/tmp/ctf"));
        assert_eq!(f.file_info.executable.as_deref(), Some("/tmp/ctf"));
        assert_eq!(f.file_info.file_type.as_deref(), Some("elf64-x86-64"));
        assert_eq!(f.file_info.entry_point.as_deref(), Some("0x401040"));
    }

    #[test]
    fn test_status_last_line_wins() {
        let f = apply(
            LineRule::ExecutionStatus,
            &[
                "The program is not being run.",
                "Starting program: /tmp/ctf",
                "[Inferior 1 (process 42) exited normally]",
            ],
        );
        assert_eq!(f.execution_status, ExecutionStatus::Exited);
    }

    #[test]
    fn test_status_breakpoint_hit_is_stopped() {
        let f = apply(
            LineRule::ExecutionStatus,
            &["Breakpoint 1, main () at ctf.c:52"],
        );
        assert_eq!(f.execution_status, ExecutionStatus::Stopped);
    }

    #[test]
    fn test_status_breakpoint_set_is_not_stopped() {
        let f = apply(
            LineRule::ExecutionStatus,
            &["Breakpoint 1 at 0x401136: file ctf.c, line 52."],
        );
        assert_eq!(f.execution_status, ExecutionStatus::Unknown);
    }

    #[test]
    fn test_known_issues_keep_duplicates() {
        let line = "(No debugging symbols found in ./ctf)";
        let f = apply(LineRule::KnownIssue, &[line, line]);
        assert_eq!(f.issues, vec![NO_DEBUG_SYMBOLS_ISSUE, NO_DEBUG_SYMBOLS_ISSUE]);
    }
}
