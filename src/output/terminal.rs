// Colored terminal output for screening reports.

use anyhow::Result;
use colored::Colorize;

use super::ReportSink;
use crate::pipeline::analyzer::AnalysisResult;
use crate::pipeline::screener::ScreenReport;

pub struct TerminalSink;

impl ReportSink for TerminalSink {
    fn emit(&mut self, report: &ScreenReport) -> Result<()> {
        display_report(report);
        Ok(())
    }
}

/// Print the flagged list, then any inconclusive posts, then a summary.
pub fn display_report(report: &ScreenReport) {
    println!(
        "\n{}",
        "Posts flagged with BOTH hate speech and weapon detection:".bold()
    );

    if report.flagged.is_empty() {
        println!("  {}", "none".dimmed());
    } else {
        for result in &report.flagged {
            println!("  {} {}", "!!".red().bold(), format_flagged(result));
        }
    }

    if !report.inconclusive.is_empty() {
        println!(
            "\n{}",
            format!(
                "Inconclusive ({} posts, a model was unavailable):",
                report.inconclusive.len()
            )
            .yellow()
            .bold()
        );
        for post in &report.inconclusive {
            println!("  {} {}", "?".yellow(), post.post_url);
            for reason in &post.reasons {
                println!("      {}", super::truncate_chars(reason, 140).dimmed());
            }
        }
    }

    println!();
    println!("  Screened:     {}", report.posts_screened);
    println!("  Flagged:      {}", report.flagged.len().to_string().red());
    println!("  Inconclusive: {}", report.inconclusive.len().to_string().yellow());
    println!("  Clean:        {}", report.clean.to_string().green());
}

/// One flagged record as `<url> [hate_speech, weapon]`.
pub fn format_flagged(result: &AnalysisResult) -> String {
    let types: Vec<&str> = result
        .types_of_objectionable_content
        .iter()
        .map(|t| t.as_str())
        .collect();
    format!("{} [{}]", result.post_url, types.join(", "))
}
