//! Text rendering of an [`AggregateReport`].
//!
//! Layout: the timestamp line, then one `error:` line per check that could
//! not run, then one summary line per check that did, then (verbose only)
//! one detail table per check with offending items.

use std::io::{self, Write};

use colored::Colorize;
use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::config::RenderOptions;
use crate::report::{AggregateReport, CheckReport};

/// Write the full report to `out`.
pub fn render<W: Write>(report: &AggregateReport, options: RenderOptions, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", report.generated_at)?;

    for (name, message) in report.errors() {
        let line = format!("error: {name}: {message}");
        if options.color {
            writeln!(out, "{}", line.red().bold())?;
        } else {
            writeln!(out, "{line}")?;
        }
    }

    for outcome in &report.outcomes {
        if let Some(check) = outcome.report() {
            writeln!(out, "{}", summary_line(check, options.color))?;
        }
    }

    if options.verbose {
        for outcome in &report.outcomes {
            let Some(check) = outcome.report() else {
                continue;
            };
            if check.rows.is_empty() {
                continue;
            }
            writeln!(out)?;
            writeln!(out, "{}", heading(&outcome.name, options.color))?;
            writeln!(out, "{}", detail_table(check, options.color))?;
        }
    }

    out.flush()
}

fn summary_line(check: &CheckReport, color: bool) -> String {
    if !color {
        return check.summary.clone();
    }
    if check.is_healthy() {
        check.summary.green().to_string()
    } else {
        check.summary.red().to_string()
    }
}

fn heading(name: &str, color: bool) -> String {
    if color {
        format!("{}:", name.bold())
    } else {
        format!("{name}:")
    }
}

/// Detail table of one check. Headers are highlighted when colored.
pub fn detail_table(check: &CheckReport, color: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_MARKDOWN)
        .set_content_arrangement(ContentArrangement::Disabled);

    if color {
        table.enforce_styling();
        table.set_header(
            check
                .header
                .iter()
                .map(|h| Cell::new(h).fg(Color::Yellow).add_attribute(Attribute::Bold)),
        );
    } else {
        table.force_no_tty();
        table.set_header(check.header.iter().map(Cell::new));
    }

    for row in &check.rows {
        table.add_row(row.iter().map(Cell::new));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CheckOutcome, FailureClass};

    fn nodes_report() -> CheckReport {
        CheckReport {
            summary: "2 of 3 Nodes are up and healthy.".to_string(),
            header: vec!["Node".to_string(), "Status".to_string(), "Messages".to_string()],
            total: 3,
            healthy: 2,
            ignored: 0,
            unhealthy: 1,
            rows: vec![vec![
                "node-3".to_string(),
                "NotReady".to_string(),
                "no route".to_string(),
            ]],
            failure: Some(FailureClass::Node),
        }
    }

    fn aggregate() -> AggregateReport {
        AggregateReport::new(
            "2024-06-01 12:00:00",
            vec![
                CheckOutcome {
                    name: "nodes".to_string(),
                    result: Ok(nodes_report()),
                },
                CheckOutcome {
                    name: "pods".to_string(),
                    result: Err("Kubernetes API request failed: forbidden".to_string()),
                },
                CheckOutcome {
                    name: "rook-ceph".to_string(),
                    result: Ok(CheckReport::not_applicable("Rook-Ceph was not found.")),
                },
            ],
        )
    }

    fn rendered(options: RenderOptions) -> String {
        let mut out = Vec::new();
        render(&aggregate(), options, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_plain_output_order() {
        let text = rendered(RenderOptions {
            color: false,
            verbose: false,
        });
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "2024-06-01 12:00:00",
                "error: pods: Kubernetes API request failed: forbidden",
                "2 of 3 Nodes are up and healthy.",
                "Rook-Ceph was not found.",
            ]
        );
    }

    #[test]
    fn test_verbose_adds_tables_for_checks_with_rows() {
        let text = rendered(RenderOptions {
            color: false,
            verbose: true,
        });

        assert!(text.contains("\nnodes:\n"));
        assert!(text.contains("| node-3 | NotReady | no route |"));
        assert!(!text.contains("rook-ceph:"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_plain_table_has_header_separator() {
        let table = detail_table(&nodes_report(), false).to_string();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Node"));
        assert!(lines[1].starts_with("|-"));
    }
}
