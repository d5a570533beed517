//! GDB transcript analysis.
//!
//! [`analyze`] performs a single linear scan over the transcript, feeding each
//! line through the ordered rule table in [`rules`], then derives
//! recommendations from the aggregate. [`render`] turns the findings into a
//! markdown report filtered by [`DetailLevel`] and [`Focus`].
//!
//! Both functions are pure: same text and parameters, same bytes out.

mod findings;
mod report;
mod rules;

pub use findings::{
    AnalysisFindings, Breakpoint, DetailLevel, ErrorFinding, ExecutionStatus, FileInfo, Focus,
    WarningFinding,
};
pub use report::render;

use rules::{LINE_RULES, RECOMMENDATION_RULES};

/// Scan `text` and collect structured findings
pub fn analyze(text: &str) -> AnalysisFindings {
    let mut findings = AnalysisFindings::default();

    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        for rule in LINE_RULES {
            rule.apply(index + 1, line, &mut findings);
        }
    }

    findings.recommendations = RECOMMENDATION_RULES
        .iter()
        .filter(|rule| (rule.applies)(&findings))
        .map(|rule| rule.text.to_string())
        .collect();

    findings
}
