//! Command-line interface definitions for gort.
//!
//! Uses `clap` derive macros for declarative argument parsing. Arguments
//! map one-to-one onto [`ScanBuilder`] calls; anything left out falls back
//! to the loaded [`EngineSettings`].

use crate::config::EngineSettings;
use crate::os::ProbeClass;
use crate::scanner::{OsReport, PortResult, ScanBuilder, ScanOutcome, ScanType};
use crate::types::PortSpec;
use clap::{ArgAction, Parser};
use console::style;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Host reconnaissance: open ports, services and OS guesses.
#[derive(Parser, Debug)]
#[command(name = "gort")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Port, service and OS discovery for a single host", long_about = None)]
pub struct Args {
    /// Target IP address or hostname to scan
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Scan type to use
    #[arg(short = 's', long = "scan-type", value_enum)]
    pub scan_type: Option<ScanType>,

    /// Ports to scan (e.g., "80", "80,443", "1-1000", "22,80,443,8000-9000")
    #[arg(short, long)]
    pub ports: Option<PortSpec>,

    /// Timeout in milliseconds
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Maximum number of concurrent probes
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Also report closed and open|filtered ports
    #[arg(long)]
    pub show_closed: bool,

    /// Emit JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    /// Path to a settings file
    #[arg(long, value_name = "PATH", env = "GORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Default log directive for the verbosity flag count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Seed a builder from settings and apply every explicit argument.
    pub fn builder(&self, settings: &EngineSettings) -> ScanBuilder {
        let mut builder = ScanBuilder::from_settings(settings)
            .target(self.target.as_str())
            .show_closed(self.show_closed);

        if let Some(scan_type) = self.scan_type {
            builder = builder.scan_type(scan_type);
        }
        if let Some(spec) = &self.ports {
            builder = builder.port_spec(spec);
        }
        if let Some(ms) = self.timeout {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(limit) = self.concurrency {
            builder = builder.max_concurrency(limit);
        }
        builder
    }
}

/// Write an outcome in the requested format.
pub fn render<W: Write>(out: &mut W, outcome: &ScanOutcome, json: bool) -> io::Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, outcome)?;
        return writeln!(out);
    }

    match outcome {
        ScanOutcome::Ports(results) => render_ports(out, results)?,
        ScanOutcome::Os(report) => render_os(out, report)?,
    }

    if outcome.is_empty() {
        writeln!(out, "No open ports found")?;
    }
    Ok(())
}

fn render_ports<W: Write>(out: &mut W, results: &[PortResult]) -> io::Result<()> {
    for result in results {
        writeln!(out, "{}/{}\t{}", result.port, result.status, result.service)?;
    }
    Ok(())
}

fn render_os<W: Write>(out: &mut W, report: &OsReport) -> io::Result<()> {
    let guess = &report.fingerprint;
    writeln!(out, "{} {}", style("Target:").bold(), report.target)?;
    writeln!(
        out,
        "{} {} (confidence: {})",
        style("OS:").bold(),
        guess.os,
        guess.confidence
    )?;
    if let (Some(ttl), Some(window)) = (guess.ttl, guess.window_size) {
        writeln!(out, "  ttl {ttl}, window {window}")?;
    }

    match &report.vote {
        Some(vote) => writeln!(
            out,
            "{} {} ({} votes)",
            style("Services suggest:").bold(),
            vote.os,
            vote.votes
        )?,
        None => writeln!(out, "{} undetermined", style("Services suggest:").bold())?,
    }

    for response in &report.responses {
        if response.classification != ProbeClass::NoResponse {
            writeln!(
                out,
                "  probe {} -> {}: {:?}",
                response.kind, response.source_port, response.classification
            )?;
        }
    }

    render_ports(out, &report.open_ports)
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}
