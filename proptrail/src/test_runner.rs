//! Failure reports for test runner output.
//!
//! The report is what [`assert`](crate::assert) panics with, so it is laid
//! out to be read in a test log and to be copied back into [`Parameters`]
//! to replay the failure.
//!
//! [`Parameters`]: crate::Parameters

use std::fmt::{self, Write};

use crate::config::Verbosity;
use crate::error::PropertyError;
use crate::execution::{ExecutionStatus, ExecutionTree, RunDetails};

/// Format a run as a multi-line report
pub fn format_run_details<T: fmt::Debug>(details: &RunDetails<T>) -> String {
    details.to_string()
}

impl<T: fmt::Debug> fmt::Display for RunDetails<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_run_details(f, self)
    }
}

fn write_run_details<T: fmt::Debug>(out: &mut impl Write, details: &RunDetails<T>) -> fmt::Result {
    if !details.failed {
        if details.interrupted {
            write!(out, "Property interrupted after {} tests", details.num_runs)?;
        } else {
            write!(out, "Property passed after {} tests", details.num_runs)?;
        }
        write!(out, " (seed: {}", details.seed)?;
        if details.num_skips > 0 {
            write!(out, ", skipped: {}", details.num_skips)?;
        }
        return out.write_char(')');
    }

    match &details.error {
        Some(PropertyError::TooManySkips { .. }) => {
            writeln!(
                out,
                "Failed to run property, too many pre-condition failures encountered"
            )?;
            write_replay_line(out, details)?;
            writeln!(out)?;
            writeln!(out, "Ran {} time(s)", details.num_runs)?;
            write!(out, "Skipped {} time(s)", details.num_skips)?;
            return Ok(());
        }
        Some(error @ (PropertyError::Config(_) | PropertyError::Path(_))) => {
            write!(out, "Property could not run: {error}")?;
            return Ok(());
        }
        _ => {}
    }

    if details.interrupted && details.counterexample.is_none() {
        writeln!(out, "Property interrupted after {} tests", details.num_runs)?;
    } else {
        writeln!(out, "Property failed after {} tests", details.num_runs)?;
    }
    write_replay_line(out, details)?;
    if let Some(counterexample) = &details.counterexample {
        writeln!(out, "Counterexample: {counterexample:?}")?;
        writeln!(out, "Shrunk {} time(s)", details.num_shrinks)?;
    }
    if let Some(error) = &details.error {
        write!(out, "Got error: {error}")?;
    }

    if details.verbose >= Verbosity::Verbose && !details.failures.is_empty() {
        write!(out, "\n\nEncountered failures were:")?;
        for failure in &details.failures {
            write!(out, "\n- {failure:?}")?;
        }
    }
    if details.verbose >= Verbosity::VeryVerbose && !details.execution_summary.is_empty() {
        write!(out, "\n\nExecution summary:")?;
        write_tree(out, &details.execution_summary, 0)?;
    }
    Ok(())
}

fn write_replay_line<T>(out: &mut impl Write, details: &RunDetails<T>) -> fmt::Result {
    write!(out, "{{ seed: {}", details.seed)?;
    if let Some(path) = &details.counterexample_path {
        write!(out, ", path: \"{path}\"")?;
    }
    if details
        .run_configuration
        .as_ref()
        .is_some_and(|config| config.end_on_failure)
    {
        write!(out, ", endOnFailure: true")?;
    }
    writeln!(out, " }}")
}

fn write_tree<T: fmt::Debug>(out: &mut impl Write, nodes: &[ExecutionTree<T>], depth: usize) -> fmt::Result {
    for node in nodes {
        let mark = match node.status {
            ExecutionStatus::Success => '√',
            ExecutionStatus::Skipped => '!',
            ExecutionStatus::Failure => '×',
        };
        write!(out, "\n{}{mark} {:?}", ". ".repeat(depth), node.value)?;
        write_tree(out, &node.children, depth + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    fn details(failed: bool) -> RunDetails<i32> {
        RunDetails {
            failed,
            interrupted: false,
            num_runs: 7,
            num_skips: 0,
            num_shrinks: 3,
            seed: 42,
            counterexample: failed.then_some(10),
            counterexample_path: failed.then(|| "6-+--+".to_string()),
            error: failed.then_some(PropertyError::Falsified),
            failures: Vec::new(),
            execution_summary: Vec::new(),
            verbose: Verbosity::None,
            run_configuration: None,
        }
    }

    #[test]
    fn test_failure_report() {
        let report = format_run_details(&details(true));
        assert_eq!(
            report,
            "Property failed after 7 tests\n\
             { seed: 42, path: \"6-+--+\" }\n\
             Counterexample: 10\n\
             Shrunk 3 time(s)\n\
             Got error: Property failed by returning false"
        );
    }

    #[test]
    fn test_success_report() {
        assert_eq!(
            format_run_details(&details(false)),
            "Property passed after 7 tests (seed: 42)"
        );
    }

    #[test]
    fn test_report_is_the_display_form() {
        assert_eq!(
            format!("run: {}", details(false)),
            "run: Property passed after 7 tests (seed: 42)"
        );
        let failed = details(true);
        assert_eq!(failed.to_string(), failed.report());
    }

    #[test]
    fn test_too_many_skips_report() {
        let mut run = details(true);
        run.counterexample = None;
        run.counterexample_path = None;
        run.num_skips = 71;
        run.error = Some(PropertyError::TooManySkips {
            num_skips: 71,
            max_skips: 70,
        });
        let report = format_run_details(&run);
        assert!(report.starts_with("Failed to run property, too many pre-condition failures"));
        assert!(report.contains("{ seed: 42 }"));
        assert!(report.ends_with("Skipped 71 time(s)"));
    }

    #[test]
    fn test_config_error_report() {
        let mut run = details(true);
        run.counterexample = None;
        run.error = Some(ConfigError::InvalidNumRuns(0).into());
        assert_eq!(
            format_run_details(&run),
            "Property could not run: Invalid number of runs: 0 (must be > 0)"
        );
    }

    #[test]
    fn test_verbose_sections() {
        let mut run = details(true);
        run.verbose = Verbosity::VeryVerbose;
        run.failures = vec![40, 10];
        run.execution_summary = vec![
            ExecutionTree {
                status: ExecutionStatus::Success,
                value: 1,
                children: Vec::new(),
            },
            ExecutionTree {
                status: ExecutionStatus::Failure,
                value: 40,
                children: vec![ExecutionTree {
                    status: ExecutionStatus::Skipped,
                    value: 0,
                    children: Vec::new(),
                }],
            },
        ];
        let report = format_run_details(&run);
        assert!(report.contains("Encountered failures were:\n- 40\n- 10"));
        assert!(report.contains("Execution summary:\n√ 1\n× 40\n. ! 0"));
    }
}
