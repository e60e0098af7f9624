//! Sweep capture session
//!
//! Owns the line source, the in-flight line buffer, and the latest parsed
//! frame. One `tick` performs one bounded read attempt, so any event loop
//! (the GUI repaint cycle, the headless monitor loop, a test) can drive a
//! session at its own cadence. Replaces the ambient timer/serial/plot
//! globals of the usual quick script with a single object.

use crate::sweep::frame::SweepFrame;
use crate::sweep::protocol::SWEEP_DONE;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Upper bound on buffered lines between sentinels. A stream that never
/// terminates a sweep is dropped and accumulation restarts.
pub const MAX_BUFFERED_LINES: usize = 65_536;

/// A source of newline-delimited analyzer output.
///
/// `Ok(None)` means no complete line was available within the source's
/// read timeout; the caller simply tries again on its next tick.
pub trait LineSource {
    fn next_line(&mut self) -> Result<Option<String>>;

    /// Short human-readable description for status displays.
    fn describe(&self) -> String;

    /// True once the source can never produce another line.
    fn exhausted(&self) -> bool {
        false
    }
}

/// Replays a capture log as a line source, one line per tick.
pub struct FileReplay {
    path: String,
    lines: VecDeque<String>,
}

impl FileReplay {
    /// Load a capture log produced by the monitor's `--log` option.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open replay file: {}", path.display()))?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<_>>()
            .with_context(|| format!("Failed to read replay file: {}", path.display()))?;
        Ok(Self {
            path: path.display().to_string(),
            lines,
        })
    }

    /// Lines left to replay.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for FileReplay {
    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    fn describe(&self) -> String {
        format!("replay:{}", self.path)
    }

    fn exhausted(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Running totals across a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub lines_received: u64,
    pub sweeps_completed: u64,
    pub read_errors: u64,
    pub malformed_lines: u64,
    pub ignored_lines: u64,
}

/// Result of one polling tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No data available this tick.
    Idle,
    /// A payload line was appended to the buffer.
    Buffered(String),
    /// The sentinel arrived: the buffer was parsed into a frame and cleared.
    SweepCompleted,
    /// The read failed; the cycle was skipped.
    ReadError(String),
}

/// Accumulates analyzer output until each `SWEEP_DONE` sentinel, then
/// parses the batch into the session's frame.
pub struct SweepSession {
    source: Box<dyn LineSource>,
    buffer: Vec<String>,
    frame: SweepFrame,
    stats: SessionStats,
}

impl SweepSession {
    pub fn new(source: Box<dyn LineSource>) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            frame: SweepFrame::default(),
            stats: SessionStats::default(),
        }
    }

    /// One polling tick: attempt to read a single line.
    ///
    /// Read errors are logged and the cycle skipped; the session stays
    /// usable for the next tick. On the sentinel the buffered transmission
    /// is parsed exactly once and the buffer is cleared, whatever it
    /// contained.
    pub fn tick(&mut self) -> TickOutcome {
        let line = match self.source.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => return TickOutcome::Idle,
            Err(e) => {
                warn!("serial read error: {}", e);
                self.stats.read_errors += 1;
                return TickOutcome::ReadError(e.to_string());
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return TickOutcome::Idle;
        }
        self.stats.lines_received += 1;

        if trimmed == SWEEP_DONE {
            let parse = self.frame.rebuild(&self.buffer);
            self.stats.malformed_lines += parse.malformed_lines as u64;
            self.stats.ignored_lines += parse.ignored_lines as u64;
            self.stats.sweeps_completed += 1;
            self.buffer.clear();
            debug!(
                "sweep {} complete: {} coarse, {} fine samples ({} data, {} marker lines)",
                self.stats.sweeps_completed,
                self.frame.coarse.len(),
                self.frame.fine.len(),
                parse.data_lines,
                parse.marker_lines
            );
            return TickOutcome::SweepCompleted;
        }

        if self.buffer.len() >= MAX_BUFFERED_LINES {
            warn!(
                "no sentinel after {} lines, dropping buffer",
                MAX_BUFFERED_LINES
            );
            self.buffer.clear();
        }
        self.buffer.push(trimmed.to_string());
        TickOutcome::Buffered(trimmed.to_string())
    }

    /// Latest completed frame; empty until the first sentinel.
    pub fn frame(&self) -> &SweepFrame {
        &self.frame
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Lines waiting for the next sentinel.
    pub fn buffered_lines(&self) -> usize {
        self.buffer.len()
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    pub fn source_exhausted(&self) -> bool {
        self.source.exhausted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds a fixed script of read results, then reports no data.
    struct ScriptedSource {
        script: VecDeque<Result<Option<String>>>,
    }

    impl ScriptedSource {
        fn new<I: IntoIterator<Item = &'static str>>(lines: I) -> Self {
            Self {
                script: lines
                    .into_iter()
                    .map(|l| Ok(Some(l.to_string())))
                    .collect(),
            }
        }

        fn push_error(&mut self, msg: &str) {
            self.script.push_back(Err(anyhow::anyhow!(msg.to_string())));
        }
    }

    impl LineSource for ScriptedSource {
        fn next_line(&mut self) -> Result<Option<String>> {
            self.script.pop_front().unwrap_or(Ok(None))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }

        fn exhausted(&self) -> bool {
            self.script.is_empty()
        }
    }

    fn drive(session: &mut SweepSession) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let outcome = session.tick();
            if outcome == TickOutcome::Idle && session.source_exhausted() {
                return outcomes;
            }
            outcomes.push(outcome);
        }
    }

    #[test]
    fn test_sentinel_completes_one_sweep() {
        let source = ScriptedSource::new([
            "COARSE;0;100;10",
            "COARSE;1;200;50",
            "COARSE_MAX;50;200000",
            "SWEEP_DONE",
        ]);
        let mut session = SweepSession::new(Box::new(source));
        let outcomes = drive(&mut session);

        assert_eq!(outcomes.last(), Some(&TickOutcome::SweepCompleted));
        assert_eq!(session.stats().sweeps_completed, 1);
        assert_eq!(session.buffered_lines(), 0);

        let frame = session.frame();
        assert_eq!(frame.coarse.len(), 2);
        assert_eq!(frame.peaks.coarse_max_khz, 200);
    }

    #[test]
    fn test_second_sweep_replaces_first() {
        let source = ScriptedSource::new([
            "COARSE;0;100;10",
            "SWEEP_DONE",
            "FINE;0;105;12",
            "SWEEP_DONE",
        ]);
        let mut session = SweepSession::new(Box::new(source));
        drive(&mut session);

        assert_eq!(session.stats().sweeps_completed, 2);
        assert!(session.frame().coarse.is_empty());
        assert_eq!(session.frame().fine.len(), 1);
    }

    #[test]
    fn test_sentinel_with_empty_buffer_clears_frame() {
        let source = ScriptedSource::new(["COARSE;0;100;10", "SWEEP_DONE", "SWEEP_DONE"]);
        let mut session = SweepSession::new(Box::new(source));
        drive(&mut session);

        assert_eq!(session.stats().sweeps_completed, 2);
        assert!(session.frame().is_empty());
    }

    #[test]
    fn test_read_error_skips_cycle_and_continues() {
        let mut source = ScriptedSource::new([]);
        source.push_error("device unplugged");
        source.script.push_back(Ok(Some("COARSE;0;100;10".to_string())));
        source.script.push_back(Ok(Some("SWEEP_DONE".to_string())));

        let mut session = SweepSession::new(Box::new(source));
        let outcomes = drive(&mut session);

        assert!(matches!(outcomes[0], TickOutcome::ReadError(_)));
        assert_eq!(session.stats().read_errors, 1);
        assert_eq!(session.stats().sweeps_completed, 1);
        assert_eq!(session.frame().coarse.len(), 1);
    }

    #[test]
    fn test_blank_lines_are_not_buffered() {
        let source = ScriptedSource::new(["", "  ", "COARSE;0;100;10"]);
        let mut session = SweepSession::new(Box::new(source));
        drive(&mut session);

        assert_eq!(session.buffered_lines(), 1);
        assert_eq!(session.stats().lines_received, 1);
    }

    #[test]
    fn test_malformed_lines_counted_after_sweep() {
        let source = ScriptedSource::new(["COARSE;0;oops;10", "SWEEP_DONE"]);
        let mut session = SweepSession::new(Box::new(source));
        drive(&mut session);

        assert_eq!(session.stats().malformed_lines, 1);
        assert!(session.frame().is_empty());
    }

    #[test]
    fn test_runaway_buffer_is_dropped() {
        let mut source = ScriptedSource::new([]);
        for _ in 0..=MAX_BUFFERED_LINES {
            source.script.push_back(Ok(Some("FINE;0;100;1".to_string())));
        }
        source.script.push_back(Ok(Some("SWEEP_DONE".to_string())));

        let mut session = SweepSession::new(Box::new(source));
        drive(&mut session);

        // Only the line that arrived after the drop survives to the parse.
        assert_eq!(session.frame().fine.len(), 1);
    }

    #[test]
    fn test_file_replay_round_trip() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.log");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "COARSE;0;100;10").unwrap();
        writeln!(file, "SWEEP_DONE").unwrap();
        drop(file);

        let replay = FileReplay::open(&path).unwrap();
        assert_eq!(replay.remaining(), 2);

        let mut session = SweepSession::new(Box::new(replay));
        drive(&mut session);
        assert_eq!(session.stats().sweeps_completed, 1);
        assert!(session.source_exhausted());
    }
}
