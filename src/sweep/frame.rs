//! Parsed sweep frames
//!
//! A frame holds the result of one complete transmission: the coarse and
//! fine sample sequences in measurement order plus the three peak
//! annotations. Frames are transient and rebuilt from scratch on every
//! completed sweep.

use crate::sweep::protocol::{classify, Sample, SweepLine};
use log::warn;

/// Hz-to-kHz divisor applied to every peak marker.
const KHZ: u64 = 1000;

/// Peak frequencies reported by the analyzer, in kilohertz.
///
/// Each value comes from a dedicated marker line and is reset to zero at
/// the start of every parse pass; a repeated marker overwrites the value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeakAnnotations {
    pub coarse_max_khz: u32,
    pub fine_max_raw_khz: u32,
    pub fine_max_smoothed_khz: u32,
}

/// Line counters for one parse pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub data_lines: usize,
    pub marker_lines: usize,
    pub ignored_lines: usize,
    pub malformed_lines: usize,
}

/// One complete parsed sweep: coarse pass, fine pass, and peak markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepFrame {
    pub coarse: Vec<Sample>,
    pub fine: Vec<Sample>,
    pub peaks: PeakAnnotations,
}

impl SweepFrame {
    /// Rebuild the frame from a buffered transmission.
    ///
    /// All previous state is cleared first, so rebuilding twice from the
    /// same buffer yields an identical frame. Samples are appended in input
    /// order. Malformed lines are skipped with a warning; unrecognized
    /// lines and stray sentinels are ignored.
    pub fn rebuild<S: AsRef<str>>(&mut self, lines: &[S]) -> ParseStats {
        self.coarse.clear();
        self.fine.clear();
        self.peaks = PeakAnnotations::default();

        let mut stats = ParseStats::default();
        for line in lines {
            match classify(line.as_ref()) {
                Ok(Some(SweepLine::Coarse { index, sample })) => {
                    // An index gap means a line was lost in transit.
                    if index as usize != self.coarse.len() {
                        warn!("coarse index gap: expected {}, got {}", self.coarse.len(), index);
                    }
                    self.coarse.push(sample);
                    stats.data_lines += 1;
                }
                Ok(Some(SweepLine::Fine { index, sample })) => {
                    if index as usize != self.fine.len() {
                        warn!("fine index gap: expected {}, got {}", self.fine.len(), index);
                    }
                    self.fine.push(sample);
                    stats.data_lines += 1;
                }
                Ok(Some(SweepLine::CoarseMax { freq_hz, .. })) => {
                    self.peaks.coarse_max_khz = (freq_hz / KHZ) as u32;
                    stats.marker_lines += 1;
                }
                Ok(Some(SweepLine::FineMaxRaw { freq_hz, .. })) => {
                    self.peaks.fine_max_raw_khz = (freq_hz / KHZ) as u32;
                    stats.marker_lines += 1;
                }
                Ok(Some(SweepLine::FineMaxSmoothed { freq_hz, .. })) => {
                    self.peaks.fine_max_smoothed_khz = (freq_hz / KHZ) as u32;
                    stats.marker_lines += 1;
                }
                Ok(Some(SweepLine::SweepDone)) | Ok(None) => {
                    stats.ignored_lines += 1;
                }
                Err(e) => {
                    warn!("skipping malformed line: {}", e);
                    stats.malformed_lines += 1;
                }
            }
        }
        stats
    }

    /// True when the frame holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.coarse.is_empty() && self.fine.is_empty()
    }
}

/// Sample with the highest amplitude, if any.
pub fn peak_sample(samples: &[Sample]) -> Option<&Sample> {
    samples.iter().max_by_key(|s| s.adc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_example_sweep() {
        let lines = ["COARSE;0;100;10", "COARSE;1;200;50", "COARSE_MAX;50;200000"];
        let mut frame = SweepFrame::default();
        let stats = frame.rebuild(&lines);

        assert_eq!(
            frame.coarse,
            vec![
                Sample {
                    freq_khz: 100,
                    adc: 10
                },
                Sample {
                    freq_khz: 200,
                    adc: 50
                },
            ]
        );
        assert!(frame.fine.is_empty());
        assert_eq!(frame.peaks.coarse_max_khz, 200);
        assert_eq!(stats.data_lines, 2);
        assert_eq!(stats.marker_lines, 1);
    }

    #[test]
    fn test_samples_keep_input_order() {
        let lines = ["FINE;0;300;5", "FINE;1;100;9", "FINE;2;200;7"];
        let mut frame = SweepFrame::default();
        frame.rebuild(&lines);

        let freqs: Vec<u32> = frame.fine.iter().map(|s| s.freq_khz).collect();
        assert_eq!(freqs, vec![300, 100, 200]);
    }

    #[test]
    fn test_peak_markers_overwrite() {
        let lines = ["COARSE_MAX;10;100000", "COARSE_MAX;20;300000"];
        let mut frame = SweepFrame::default();
        frame.rebuild(&lines);
        assert_eq!(frame.peaks.coarse_max_khz, 300);
    }

    #[test]
    fn test_peak_conversion_floors() {
        let mut frame = SweepFrame::default();
        frame.rebuild(&["FINE_MAX_RAW;1;1999"]);
        assert_eq!(frame.peaks.fine_max_raw_khz, 1);
        frame.rebuild(&["FINE_MAX_RAW;1;999"]);
        assert_eq!(frame.peaks.fine_max_raw_khz, 0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let lines = [
            "COARSE;0;100;10",
            "FINE;0;105;12",
            "FINE_MAX_SMOOTHED;12;105000",
        ];
        let mut frame = SweepFrame::default();
        frame.rebuild(&lines);
        let first = frame.clone();
        frame.rebuild(&lines);
        assert_eq!(frame, first);
    }

    #[test]
    fn test_rebuild_clears_previous_sweep() {
        let mut frame = SweepFrame::default();
        frame.rebuild(&["COARSE;0;100;10", "COARSE_MAX;10;100000"]);
        frame.rebuild(&["FINE;0;105;12"]);

        assert!(frame.coarse.is_empty());
        assert_eq!(frame.fine.len(), 1);
        assert_eq!(frame.peaks.coarse_max_khz, 0);
    }

    #[test]
    fn test_index_gap_still_appends_in_order() {
        // A dropped line leaves a gap; the survivors keep their order.
        let lines = ["COARSE;0;100;10", "COARSE;2;300;30"];
        let mut frame = SweepFrame::default();
        frame.rebuild(&lines);

        let freqs: Vec<u32> = frame.coarse.iter().map(|s| s.freq_khz).collect();
        assert_eq!(freqs, vec![100, 300]);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let lines = ["COARSE;0;100;10", "COARSE;broken", "COARSE;1;200;50"];
        let mut frame = SweepFrame::default();
        let stats = frame.rebuild(&lines);

        assert_eq!(frame.coarse.len(), 2);
        assert_eq!(stats.malformed_lines, 1);
    }

    #[test]
    fn test_unknown_and_sentinel_lines_are_ignored() {
        let lines = ["boot: esp32", "SWEEP_DONE", "COARSE;0;100;10"];
        let mut frame = SweepFrame::default();
        let stats = frame.rebuild(&lines);

        assert_eq!(frame.coarse.len(), 1);
        assert_eq!(stats.ignored_lines, 2);
        assert_eq!(stats.malformed_lines, 0);
    }

    #[test]
    fn test_peak_sample() {
        let samples = [
            Sample {
                freq_khz: 100,
                adc: 10,
            },
            Sample {
                freq_khz: 200,
                adc: 50,
            },
            Sample {
                freq_khz: 300,
                adc: 30,
            },
        ];
        assert_eq!(peak_sample(&samples).unwrap().freq_khz, 200);
        assert!(peak_sample(&[]).is_none());
    }
}
