// Newline-delimited JSON report sink.
//
// One object per line, appended to the target file so successive runs
// accumulate. Flagged and inconclusive posts are distinguished by `kind`:
//   {"kind":"flagged","post_url":"...","types_of_objectionable_content":["hate_speech","weapon"],"screened_at":"..."}
//   {"kind":"inconclusive","post_url":"...","reasons":["..."],"screened_at":"..."}

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ReportSink;
use crate::pipeline::analyzer::ContentType;
use crate::pipeline::screener::ScreenReport;

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Flagged {
        post_url: &'a str,
        types_of_objectionable_content: &'a [ContentType],
        screened_at: DateTime<Utc>,
    },
    Inconclusive {
        post_url: &'a str,
        reasons: &'a [String],
        screened_at: DateTime<Utc>,
    },
}

pub struct NdjsonSink {
    path: PathBuf,
}

impl NdjsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for NdjsonSink {
    fn emit(&mut self, report: &ScreenReport) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create report directory {}", parent.display())
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut out = BufWriter::new(file);

        write_records(&mut out, report, Utc::now())?;
        out.flush().context("Failed to flush NDJSON report")?;
        Ok(())
    }
}

/// Serialize a report as NDJSON lines into any writer.
pub fn write_records<W: Write>(
    out: &mut W,
    report: &ScreenReport,
    screened_at: DateTime<Utc>,
) -> Result<()> {
    for result in &report.flagged {
        let record = Record::Flagged {
            post_url: &result.post_url,
            types_of_objectionable_content: &result.types_of_objectionable_content,
            screened_at,
        };
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
    }
    for post in &report.inconclusive {
        let record = Record::Inconclusive {
            post_url: &post.post_url,
            reasons: &post.reasons,
            screened_at,
        };
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
