//! Structured findings extracted from a GDB transcript

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A line that matched one of the error signatures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorFinding {
    /// 1-indexed line number in the transcript
    pub line: usize,
    /// The trimmed line text
    pub message: String,
    /// Name of the first signature that matched
    pub signature: &'static str,
}

/// A line containing a warning marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningFinding {
    pub line: usize,
    pub message: String,
}

/// One row of an `info breakpoints` table.
///
/// Rows are never merged: a breakpoint number listed twice yields two entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakpoint {
    /// As printed in the `Num` column
    pub number: String,
    /// `breakpoint`, `hw breakpoint`, `watchpoint`, ...
    pub kind: String,
    /// `keep`, `del` or `dis`
    pub disposition: String,
    pub enabled: bool,
    /// Hex digits without the `0x` prefix
    pub address: String,
    pub location: String,
}

/// Executable metadata. Each field keeps the last value seen in the transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub symbol_file: Option<String>,
    pub executable: Option<String>,
    pub file_type: Option<String>,
    pub entry_point: Option<String>,
}

impl FileInfo {
    pub fn is_empty(&self) -> bool {
        self.symbol_file.is_none()
            && self.executable.is_none()
            && self.file_type.is_none()
            && self.entry_point.is_none()
    }
}

/// Execution state of the debuggee as last reported in the transcript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Unknown,
    NotRunning,
    Crashed,
    Exited,
    Loading,
    Running,
    Stopped,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Unknown => "unknown",
            ExecutionStatus::NotRunning => "not_running",
            ExecutionStatus::Crashed => "crashed",
            ExecutionStatus::Exited => "exited",
            ExecutionStatus::Loading => "loading",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Stopped => "stopped",
        }
    }

    /// Lowercase words, e.g. `not running`
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Title-cased words, e.g. `Not Running`
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a single [`analyze`](super::analyze) call extracted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisFindings {
    pub errors: Vec<ErrorFinding>,
    pub warnings: Vec<WarningFinding>,
    pub breakpoints: Vec<Breakpoint>,
    pub functions: Vec<String>,
    /// Set once any disassembly header or instruction line is seen
    pub assembly_present: bool,
    pub execution_status: ExecutionStatus,
    pub file_info: FileInfo,
    /// Canned diagnostics, one per triggering line (duplicates kept)
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering parameters
// ─────────────────────────────────────────────────────────────────────────────

/// How much of the report to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetailLevel {
    Simple,
    #[default]
    Intermediate,
    Detailed,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Simple => "simple",
            DetailLevel::Intermediate => "intermediate",
            DetailLevel::Detailed => "detailed",
        }
    }

    /// Intermediate and detailed levels
    pub fn is_extended(&self) -> bool {
        !matches!(self, DetailLevel::Simple)
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(DetailLevel::Simple),
            "intermediate" => Ok(DetailLevel::Intermediate),
            "detailed" => Ok(DetailLevel::Detailed),
            other => Err(format!("unknown detail level: {other}")),
        }
    }
}

/// Which sections of the report to keep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    All,
    Errors,
    Breakpoints,
    Assembly,
    Execution,
}

impl Focus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Focus::All => "all",
            Focus::Errors => "errors",
            Focus::Breakpoints => "breakpoints",
            Focus::Assembly => "assembly",
            Focus::Execution => "execution",
        }
    }

    /// True when this focus is one of `allowed`
    pub fn is_any(&self, allowed: &[Focus]) -> bool {
        allowed.contains(self)
    }
}

impl FromStr for Focus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Focus::All),
            "errors" => Ok(Focus::Errors),
            "breakpoints" => Ok(Focus::Breakpoints),
            "assembly" => Ok(Focus::Assembly),
            "execution" => Ok(Focus::Execution),
            other => Err(format!("unknown focus: {other}")),
        }
    }
}
