// Terminal rendering of run results

use crate::run::EndpointRecord;
use colored::{ColoredString, Colorize};
use subprobe_scanner::{CrawlSummary, EndpointKind};

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn type_tag(kind: EndpointKind) -> ColoredString {
    match kind {
        EndpointKind::Relative => "REL".green(),
        EndpointKind::External => "EXT".red(),
    }
}

/// Colored `[status]` badge for a probed endpoint.
pub fn status_badge(status: Option<u16>) -> ColoredString {
    let Some(code) = status else {
        return "[?]".bright_black();
    };
    let badge = format!("[{}]", code);
    match code {
        200..=299 => badge.green(),
        300..=399 => badge.blue(),
        401 | 403 => badge.yellow(),
        400..=499 => badge.red(),
        500..=599 => badge.magenta(),
        _ => badge.bright_black(),
    }
}

/// One endpoint as a report line: type tag, resolved URL, source and, when
/// probing, the status badge.
pub fn render_endpoint_line(record: &EndpointRecord, probe: bool) -> String {
    let mut line = format!(
        "{} {} {}",
        type_tag(record.kind),
        record.resolved_url,
        format!("({})", record.source).bright_black()
    );
    if probe {
        line.push(' ');
        line.push_str(&status_badge(record.status).to_string());
    }
    line
}

/// Generate the terminal report: one line per record followed by a summary.
pub fn generate_results_report(
    records: &[EndpointRecord],
    summary: &CrawlSummary,
    probe: bool,
) -> String {
    let mut report = String::new();

    for record in records {
        report.push_str(&render_endpoint_line(record, probe));
        report.push('\n');
    }

    report.push('\n');
    report.push_str(DIVIDER);
    report.push_str("\n\n");
    report.push_str(&format!("{}\n", "# Summary:".bold()));
    report.push_str(&format!("  Pages visited: {}\n", summary.pages_visited));
    report.push_str(&format!(
        "  Scripts parsed: {}/{}\n",
        summary.scripts_parsed, summary.scripts_found
    ));
    if summary.parse_timeouts > 0 {
        report.push_str(&format!("  Parser timeouts: {}\n", summary.parse_timeouts));
    }
    report.push_str(&format!("  Endpoints found: {}\n", records.len()));
    if probe {
        let reachable = records
            .iter()
            .filter(|r| r.reachable == Some(true))
            .count();
        report.push_str(&format!("  Reachable: {}\n", reachable));
    }
    report.push_str(&format!(
        "  Finished at: {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    report
}
