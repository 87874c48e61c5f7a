use std::io::{self, Write};

use serde::Serialize;

use crate::catalog::ResolvedCatalog;
use crate::convert::ConvertReport;
use crate::harvest::RunSummary;
use crate::verify::VerifyReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_children(catalog: &ResolvedCatalog) -> io::Result<()> {
        Self::print_json(&catalog.child_links)
    }

    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_verify(report: &VerifyReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_convert(report: &ConvertReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
