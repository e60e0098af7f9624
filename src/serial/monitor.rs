//! Headless sweep monitor
//!
//! Terminal monitoring of analyzer output with:
//! - Timestamped line echo with peak-marker highlighting
//! - A summary block after every completed sweep
//! - Raw capture logging, replayable with `--replay`
//! - Session statistics on exit

use crate::sweep::frame::peak_sample;
use crate::sweep::protocol::{classify, Sample, SweepLine, SWEEP_DONE};
use crate::sweep::session::{SweepSession, TickOutcome};
use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Sleep between ticks when the port has no data.
const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Back-off after a failed read.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

static RUNNING: AtomicBool = AtomicBool::new(true);

/// Configuration for headless monitoring
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Prefix echoed lines with a local timestamp
    pub show_timestamps: bool,
    /// Capture log path (optional); raw lines, one per row
    pub log_file: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
            log_file: None,
        }
    }
}

/// Terminal monitor driven by a sweep session
pub struct SweepMonitor {
    config: MonitorConfig,
    session: SweepSession,
    log_writer: Option<BufWriter<File>>,
}

impl SweepMonitor {
    pub fn new(session: SweepSession, config: MonitorConfig) -> Self {
        Self {
            config,
            session,
            log_writer: None,
        }
    }

    /// Run until Ctrl+C or, for replayed captures, end of input.
    pub fn run(&mut self) -> Result<()> {
        if let Some(log_path) = self.config.log_file.clone() {
            let file = File::create(&log_path)
                .with_context(|| format!("Failed to create capture log: {}", log_path))?;
            self.log_writer = Some(BufWriter::new(file));
            println!("{} Logging to: {}", "[LOG]".cyan().bold(), log_path.white());
        }

        install_sigint_handler();
        RUNNING.store(true, Ordering::SeqCst);

        self.print_header();

        while RUNNING.load(Ordering::SeqCst) {
            match self.session.tick() {
                TickOutcome::Idle => {
                    if self.session.source_exhausted() {
                        break;
                    }
                    std::thread::sleep(IDLE_SLEEP);
                }
                TickOutcome::Buffered(line) => {
                    self.log_line(&line)?;
                    self.echo_line(&line);
                }
                TickOutcome::SweepCompleted => {
                    self.log_line(SWEEP_DONE)?;
                    self.print_sweep_summary();
                }
                TickOutcome::ReadError(e) => {
                    eprintln!("{} Read error: {}", "[ERROR]".red().bold(), e);
                    std::thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        self.print_session_summary();
        Ok(())
    }

    fn log_line(&mut self, line: &str) -> Result<()> {
        if let Some(ref mut writer) = self.log_writer {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        Ok(())
    }

    fn echo_line(&self, line: &str) {
        let mut output = String::new();

        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S%.3f");
            output.push_str(&format!("{} ", timestamp.to_string().dimmed()));
        }

        if let Some(note) = marker_annotation(line) {
            output.push_str(&line.cyan().to_string());
            output.push_str(&format!(" {}", format!("-> {}", note).dimmed()));
        } else {
            output.push_str(line);
        }

        println!("{}", output);
    }

    fn print_header(&self) {
        println!("{}", "\n--- Sweep Monitor Started ---".cyan().bold());
        println!("{}", "Press Ctrl+C to stop\n".yellow());
        println!("{}", "=".repeat(70).dimmed());
        println!(
            "{}: {}",
            "Source".cyan(),
            self.session.source_description().white()
        );
        if let Some(ref log) = self.config.log_file {
            println!("{}: {}", "Log".cyan(), log.white());
        }
        println!("{}", "=".repeat(70).dimmed());
        println!();
    }

    fn print_sweep_summary(&self) {
        let frame = self.session.frame();
        let sweep = self.session.stats().sweeps_completed;

        println!("\n{}", format!("--- Sweep {} ---", sweep).cyan().bold());
        println!(
            "  Coarse: {} samples, peak {} kHz{}",
            frame.coarse.len(),
            frame.peaks.coarse_max_khz.to_string().white().bold(),
            max_amplitude_note(&frame.coarse)
        );
        println!(
            "  Fine:   {} samples, peak raw {} kHz, smoothed {} kHz{}",
            frame.fine.len(),
            frame.peaks.fine_max_raw_khz.to_string().white().bold(),
            frame.peaks.fine_max_smoothed_khz,
            max_amplitude_note(&frame.fine)
        );
        println!();
    }

    fn print_session_summary(&self) {
        let stats = self.session.stats();

        println!("\n{}", "=".repeat(70).dimmed());
        println!("{}", "--- Monitor Summary ---".cyan().bold());
        println!("Lines received: {}", stats.lines_received);
        println!("Sweeps completed: {}", stats.sweeps_completed);
        println!(
            "Read errors: {}",
            if stats.read_errors > 0 {
                stats.read_errors.to_string().red().bold().to_string()
            } else {
                stats.read_errors.to_string().green().to_string()
            }
        );
        if stats.malformed_lines > 0 {
            println!(
                "Malformed lines skipped: {}",
                stats.malformed_lines.to_string().yellow()
            );
        }
        if stats.ignored_lines > 0 {
            println!("Non-protocol lines ignored: {}", stats.ignored_lines);
        }
        if let Some(ref log) = self.config.log_file {
            println!("Log saved to: {}", log.white());
        }
        println!("{}", "=".repeat(70).dimmed());
    }
}

/// Decoded suffix for peak marker lines, which get highlighted in the echo
/// stream.
fn marker_annotation(line: &str) -> Option<String> {
    match classify(line) {
        Ok(Some(
            SweepLine::CoarseMax { adc, freq_hz }
            | SweepLine::FineMaxRaw { adc, freq_hz }
            | SweepLine::FineMaxSmoothed { adc, freq_hz },
        )) => Some(format!("{} kHz (adc {})", freq_hz / 1000, adc)),
        _ => None,
    }
}

fn max_amplitude_note(samples: &[Sample]) -> String {
    match peak_sample(samples) {
        Some(s) => format!(", max adc {} at {} kHz", s.adc, s.freq_khz),
        None => String::new(),
    }
}

/// Install a SIGINT handler that flips the running flag.
fn install_sigint_handler() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
    }
}

#[cfg(unix)]
extern "C" fn handle_sigint(_: libc::c_int) {
    RUNNING.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::session::FileReplay;
    use std::fs;

    #[test]
    fn test_marker_annotation() {
        assert_eq!(
            marker_annotation("COARSE_MAX;50;200000").as_deref(),
            Some("200 kHz (adc 50)")
        );
        assert_eq!(
            marker_annotation("FINE_MAX_SMOOTHED;498;13561000").as_deref(),
            Some("13561 kHz (adc 498)")
        );
        assert!(marker_annotation("COARSE;0;100;10").is_none());
        assert!(marker_annotation("boot: esp32").is_none());
    }

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert!(config.show_timestamps);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_capture_log_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.log");
        let output = dir.path().join("output.log");

        let lines = "COARSE;0;100;10\nCOARSE_MAX;10;100000\nSWEEP_DONE\n";
        fs::write(&input, lines).unwrap();

        let session = SweepSession::new(Box::new(FileReplay::open(&input).unwrap()));
        let config = MonitorConfig {
            show_timestamps: false,
            log_file: Some(output.to_string_lossy().to_string()),
        };
        SweepMonitor::new(session, config).run().unwrap();

        // The capture log reproduces the input stream, sentinel included.
        assert_eq!(fs::read_to_string(&output).unwrap(), lines);
    }
}
