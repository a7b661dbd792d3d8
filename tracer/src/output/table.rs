//! Summary tables
//!
//! Rendered once at shutdown from collector snapshots. Column widths are
//! fitted over every backend in the report so the CPU and GPU tables line
//! up; a backend without recorded time keeps its summary line but gets no
//! table.

use lumen_shared::types::events::Backend;
use lumen_shared::types::stats::CommandStat;

/// Width of the time column in the summary block
const TIME_WIDTH: usize = 20;

/// Gap between table columns
const COLUMN_GAP: &str = "  ";

/// Which timing report is being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Host API call time
    Api,
    /// Device execution time
    Device,
}

impl ReportKind {
    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Api => "API",
            ReportKind::Device => "Device",
        }
    }

    fn name_column(self) -> &'static str {
        match self {
            ReportKind::Api => "Function",
            ReportKind::Device => "Kernel",
        }
    }
}

/// One present backend in a report
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub backend: Backend,
    pub total_ns: u64,
    pub stats: &'a [CommandStat],
}

/// Right-aligned fixed-width columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    widths: Vec<usize>,
}

impl Columns {
    /// Fit widths to the header and every row
    pub fn fit<'a, I>(header: &[&str], rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Vec<String>>,
    {
        let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }
        Self { widths }
    }

    /// Render one line, every cell right-aligned
    pub fn line<S: AsRef<str>>(&self, cells: &[S]) -> String {
        let mut line = String::new();
        for (i, (cell, width)) in cells.iter().zip(&self.widths).enumerate() {
            if i > 0 {
                line.push_str(COLUMN_GAP);
            }
            line.push_str(&format!("{:>width$}", cell.as_ref(), width = width));
        }
        line.push('\n');
        line
    }

    /// Horizontal rule spanning the table
    pub fn rule(&self) -> String {
        let width = self.widths.iter().sum::<usize>()
            + COLUMN_GAP.len() * self.widths.len().saturating_sub(1);
        format!("{}\n", "-".repeat(width))
    }
}

/// Host or device timing report: summary block then one table per backend
pub fn timing_report(kind: ReportKind, elapsed_ns: u64, sections: &[Section<'_>]) -> String {
    let header = [
        kind.name_column(),
        "Calls",
        "Time (ns)",
        "Average (ns)",
        "Min (ns)",
        "Max (ns)",
    ];
    let tables: Vec<(Vec<Vec<String>>, Vec<String>)> = sections
        .iter()
        .map(|section| (timing_rows(section.stats), timing_footer(section.stats)))
        .collect();

    let mut out = format!("\n=== {} Timing Results: ===\n\n", kind.title());
    out.push_str(&summary(kind.title(), elapsed_ns, sections));
    out.push_str(&render_tables(&header, sections, &tables));
    out.push('\n');
    out
}

/// Kernel submission report: queued, submit and execute totals per kernel
pub fn submission_report(elapsed_ns: u64, sections: &[Section<'_>]) -> String {
    let header = ["Kernel", "Calls", "Queued (ns)", "Submit (ns)", "Execute (ns)"];
    let tables: Vec<(Vec<Vec<String>>, Vec<String>)> = sections
        .iter()
        .map(|section| (submission_rows(section.stats), submission_footer(section.stats)))
        .collect();

    let mut out = "\n=== Kernel Submission Results: ===\n\n".to_string();
    out.push_str(&summary(ReportKind::Device.title(), elapsed_ns, sections));
    out.push_str(&render_tables(&header, sections, &tables));
    out.push('\n');
    out
}

/// Total execution time followed by each present backend's total
fn summary(title: &str, elapsed_ns: u64, sections: &[Section<'_>]) -> String {
    let execution = "Total Execution Time (ns): ".to_string();
    let mut lines = vec![(execution, elapsed_ns)];
    for section in sections {
        lines.push((
            format!("Total {} Time for {} backend (ns): ", title, section.backend),
            section.total_ns,
        ));
    }

    let title_width = lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (label, value) in lines {
        out.push_str(&format!(
            "{:>title_width$}{:>time_width$}\n",
            label,
            value,
            title_width = title_width,
            time_width = TIME_WIDTH
        ));
    }
    out
}

fn render_tables(
    header: &[&str],
    sections: &[Section<'_>],
    tables: &[(Vec<Vec<String>>, Vec<String>)],
) -> String {
    let columns = Columns::fit(
        header,
        tables
            .iter()
            .flat_map(|(rows, footer)| rows.iter().chain(std::iter::once(footer))),
    );

    let mut out = String::new();
    for (section, (rows, footer)) in sections.iter().zip(tables) {
        if section.total_ns == 0 {
            continue;
        }
        out.push_str(&format!("\n== {} Backend: ==\n\n", section.backend));
        out.push_str(&columns.line(header));
        out.push_str(&columns.rule());
        for row in rows {
            out.push_str(&columns.line(row));
        }
        out.push_str(&columns.rule());
        out.push_str(&columns.line(footer));
    }
    out
}

fn timing_rows(stats: &[CommandStat]) -> Vec<Vec<String>> {
    stats
        .iter()
        .map(|stat| {
            let exec = &stat.exec;
            vec![
                exec.name.clone(),
                exec.count.to_string(),
                exec.total_ns.to_string(),
                exec.avg_ns().to_string(),
                exec.min_ns.to_string(),
                exec.max_ns.to_string(),
            ]
        })
        .collect()
}

fn timing_footer(stats: &[CommandStat]) -> Vec<String> {
    let calls: u64 = stats.iter().map(|s| s.exec.count).sum();
    let total = stats
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.exec.total_ns));
    let avg = if calls == 0 { 0 } else { total / calls };
    let min = stats.iter().map(|s| s.exec.min_ns).min().unwrap_or(0);
    let max = stats.iter().map(|s| s.exec.max_ns).max().unwrap_or(0);
    vec![
        "Total".to_string(),
        calls.to_string(),
        total.to_string(),
        avg.to_string(),
        min.to_string(),
        max.to_string(),
    ]
}

fn submission_rows(stats: &[CommandStat]) -> Vec<Vec<String>> {
    stats
        .iter()
        .map(|stat| {
            vec![
                stat.exec.name.clone(),
                stat.exec.count.to_string(),
                stat.queued_total_ns.to_string(),
                stat.submit_total_ns.to_string(),
                stat.exec.total_ns.to_string(),
            ]
        })
        .collect()
}

fn submission_footer(stats: &[CommandStat]) -> Vec<String> {
    let sum = |f: fn(&CommandStat) -> u64| stats.iter().fold(0u64, |acc, s| acc.saturating_add(f(s)));
    vec![
        "Total".to_string(),
        sum(|s| s.exec.count).to_string(),
        sum(|s| s.queued_total_ns).to_string(),
        sum(|s| s.submit_total_ns).to_string(),
        sum(|s| s.exec.total_ns).to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_shared::types::stats::NamedStat;

    fn stat(name: &str, durations: &[u64]) -> CommandStat {
        let mut stat = CommandStat::new(name, durations[0]);
        for &d in &durations[1..] {
            stat.exec.observe(d);
        }
        stat
    }

    /// Tokens of the last line starting with `name`
    fn row_tokens<'a>(report: &'a str, name: &str) -> Vec<&'a str> {
        report
            .lines()
            .rev()
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .find(|tokens| tokens.first() == Some(&name))
            .unwrap_or_default()
    }

    #[test]
    fn test_columns_right_align() {
        let rows = vec![vec!["clFinish".to_string(), "12".to_string()]];
        let columns = Columns::fit(&["Function", "Calls"], &rows);
        assert_eq!(columns.line(&["a", "1"]), "       a      1\n");
        assert_eq!(columns.rule(), "---------------\n");
    }

    #[test]
    fn test_timing_row_values() {
        let stats = vec![stat("clEnqueueX", &[100, 200, 300])];
        let sections = [Section {
            backend: Backend::Gpu,
            total_ns: 600,
            stats: &stats,
        }];
        let report = timing_report(ReportKind::Api, 10_000, &sections);

        assert!(report.contains("=== API Timing Results: ==="));
        assert!(report.contains("== GPU Backend: =="));
        assert_eq!(
            row_tokens(&report, "clEnqueueX"),
            vec!["clEnqueueX", "3", "600", "200", "100", "300"]
        );
        assert_eq!(row_tokens(&report, "Total"), vec!["Total", "3", "600", "200", "100", "300"]);
    }

    #[test]
    fn test_footer_follows_summary_lines() {
        let stats = vec![stat("clFinish", &[10, 30])];
        let sections = [Section {
            backend: Backend::Cpu,
            total_ns: 40,
            stats: &stats,
        }];
        let report = timing_report(ReportKind::Api, 1_000, &sections);

        let totals: Vec<Vec<&str>> = report
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .filter(|tokens| tokens.first() == Some(&"Total"))
            .collect();
        assert_eq!(totals.len(), 3);
        assert_eq!(totals[0][1], "Execution");
        assert_eq!(totals[1][1], "API");
        assert_eq!(totals[2], vec!["Total", "2", "40", "20", "10", "30"]);
    }

    #[test]
    fn test_zero_total_backend_has_no_table() {
        let gpu_stats = vec![stat("vector_add", &[50])];
        let sections = [
            Section {
                backend: Backend::Cpu,
                total_ns: 0,
                stats: &[],
            },
            Section {
                backend: Backend::Gpu,
                total_ns: 50,
                stats: &gpu_stats,
            },
        ];
        let report = timing_report(ReportKind::Device, 1_000, &sections);

        assert!(!report.contains("== CPU Backend: =="));
        assert!(report.contains("== GPU Backend: =="));
        assert!(report.contains("Total Device Time for CPU backend (ns): "));
    }

    #[test]
    fn test_tables_align_across_backends() {
        let cpu_stats = vec![stat("short", &[5])];
        let gpu_stats = vec![stat("a_much_longer_kernel_name", &[1_000_000])];
        let sections = [
            Section {
                backend: Backend::Cpu,
                total_ns: 5,
                stats: &cpu_stats,
            },
            Section {
                backend: Backend::Gpu,
                total_ns: 1_000_000,
                stats: &gpu_stats,
            },
        ];
        let report = timing_report(ReportKind::Device, 2_000_000, &sections);

        let header_lines: Vec<&str> = report
            .lines()
            .filter(|line| line.trim_start().starts_with("Kernel"))
            .collect();
        assert_eq!(header_lines.len(), 2);
        assert_eq!(header_lines[0], header_lines[1]);

        let short = report.lines().find(|l| l.contains("short")).unwrap();
        let long = report.lines().find(|l| l.contains("a_much_longer")).unwrap();
        assert_eq!(short.len(), long.len());
    }

    #[test]
    fn test_summary_width_uses_present_backends_only() {
        let stats = vec![stat("k", &[1])];
        let sections = [Section {
            backend: Backend::Gpu,
            total_ns: 1,
            stats: &stats,
        }];
        let report = timing_report(ReportKind::Api, 7, &sections);
        let gpu_line = report
            .lines()
            .find(|l| l.starts_with("Total API Time for GPU backend (ns): "))
            .unwrap();
        assert_eq!(gpu_line.len(), "Total API Time for GPU backend (ns): ".len() + TIME_WIDTH);
    }

    #[test]
    fn test_submission_report() {
        let mut kernel = CommandStat {
            exec: NamedStat::new("K", 400),
            queued_total_ns: 30,
            submit_total_ns: 70,
        };
        kernel.exec.observe(600);
        let stats = vec![kernel];
        let sections = [Section {
            backend: Backend::Gpu,
            total_ns: 1_000,
            stats: &stats,
        }];
        let report = submission_report(5_000, &sections);

        assert!(report.contains("=== Kernel Submission Results: ==="));
        assert_eq!(row_tokens(&report, "K"), vec!["K", "2", "30", "70", "1000"]);
    }
}
