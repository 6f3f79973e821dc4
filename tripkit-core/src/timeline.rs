//! Effect timeline derivation
//!
//! Turns the three timing fields of a substance (onset, peak, after-effects)
//! into contiguous phases and a sampled intensity curve for charting.
//!
//! ```text
//! intensity
//!   100 ┤        ╭╮
//!       │      ╭─╯ ╰──╮
//!       │    ╭─╯      ╰────╮
//!     0 ┼────╯              ╰ ─ ─ ─ ─ ─ ─
//!       0     onset      peak     after-effects (not sampled)
//! ```
//!
//! Everything here is pure: the same text always yields the same timeline.

use crate::duration::{self, DurationRange};
use crate::format::format_offset_label;
use serde::Serialize;

/// Number of intensity samples across onset + peak.
pub const SAMPLE_COUNT: usize = 32;

/// Maximum number of axis labels.
pub const MAX_LABELS: usize = 6;

/// Which part of the experience a phase covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    Onset,
    Peak,
    AfterEffects,
}

impl PhaseName {
    pub fn label(&self) -> &'static str {
        match self {
            PhaseName::Onset => "Onset",
            PhaseName::Peak => "Peak",
            PhaseName::AfterEffects => "After-effects",
        }
    }
}

/// One phase, positioned on the timeline in minutes from dosing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePhase {
    pub name: PhaseName,
    /// Range as parsed from the catalog text
    pub range: DurationRange,
    pub start_minutes: f64,
    pub end_minutes: f64,
}

impl TimelinePhase {
    pub fn duration_minutes(&self) -> f64 {
        self.end_minutes - self.start_minutes
    }
}

/// Intensity (0..=100) at an offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntensitySample {
    pub offset_minutes: f64,
    pub intensity: f64,
}

/// Time-axis tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLabel {
    pub offset_minutes: f64,
    pub text: String,
}

/// Derived timeline for one substance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    /// Onset, Peak, AfterEffects, in that order
    pub phases: [TimelinePhase; 3],
    /// Curve across onset and peak; empty when both are zero
    pub samples: Vec<IntensitySample>,
    pub labels: Vec<AxisLabel>,
    /// End of after-effects
    pub total_minutes: f64,
}

impl Timeline {
    pub fn onset(&self) -> &TimelinePhase {
        &self.phases[0]
    }

    pub fn peak(&self) -> &TimelinePhase {
        &self.phases[1]
    }

    pub fn after_effects(&self) -> &TimelinePhase {
        &self.phases[2]
    }

    /// Span covered by `samples`
    pub fn sampled_minutes(&self) -> f64 {
        self.peak().end_minutes
    }

    /// Phase containing `offset_minutes`; boundaries belong to the later phase.
    pub fn phase_at(&self, offset_minutes: f64) -> Option<PhaseName> {
        if offset_minutes < 0.0 || offset_minutes > self.total_minutes {
            return None;
        }
        self.phases
            .iter()
            .rev()
            .find(|p| p.start_minutes <= offset_minutes && p.duration_minutes() > 0.0)
            .map(|p| p.name)
    }
}

/// Rise through onset: `100 * p^2` for progress `p` in `[0, 1]`.
///
/// Felt onset accelerates, so the ramp is super-linear. `f(0) = 0`,
/// `f(1) = 100`, strictly increasing.
pub fn onset_curve(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    clamp_intensity(100.0 * p * p)
}

/// Decay through peak: `100 * e^(-2p)` for progress `p` in `[0, 1]`.
///
/// `f(0) = 100`, strictly decreasing, `f(1) = 100 * e^-2` (about 13.5).
pub fn peak_curve(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    clamp_intensity(100.0 * (-2.0 * p).exp())
}

fn clamp_intensity(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Build a timeline from the raw timing text of each phase.
///
/// Each phase lasts the average of its parsed range. Returns `None` when the
/// three phases add up to zero minutes, which is the normal outcome for
/// substances with no timing data.
pub fn build_timeline(
    onset: Option<&str>,
    peak: Option<&str>,
    after_effects: Option<&str>,
) -> Option<Timeline> {
    let onset_range = duration::parse(onset);
    let peak_range = duration::parse(peak);
    let after_range = duration::parse(after_effects);

    let onset_minutes = onset_range.avg_minutes();
    let peak_minutes = peak_range.avg_minutes();
    let after_minutes = after_range.avg_minutes();

    let total_minutes = onset_minutes + peak_minutes + after_minutes;
    if total_minutes <= 0.0 {
        return None;
    }

    let peak_start = onset_minutes;
    let peak_end = onset_minutes + peak_minutes;

    let phases = [
        TimelinePhase {
            name: PhaseName::Onset,
            range: onset_range,
            start_minutes: 0.0,
            end_minutes: peak_start,
        },
        TimelinePhase {
            name: PhaseName::Peak,
            range: peak_range,
            start_minutes: peak_start,
            end_minutes: peak_end,
        },
        TimelinePhase {
            name: PhaseName::AfterEffects,
            range: after_range,
            start_minutes: peak_end,
            end_minutes: total_minutes,
        },
    ];

    let samples = sample_curve(onset_minutes, peak_minutes);
    let labels = axis_labels(peak_end);

    Some(Timeline {
        phases,
        samples,
        labels,
        total_minutes,
    })
}

/// Sample onset and peak with [`SAMPLE_COUNT`] points.
///
/// Intervals are split between the two phases in proportion to their length,
/// and the onset/peak boundary is always an exact sample.
fn sample_curve(onset_minutes: f64, peak_minutes: f64) -> Vec<IntensitySample> {
    let span = onset_minutes + peak_minutes;
    if span <= 0.0 {
        return Vec::new();
    }

    let intervals = SAMPLE_COUNT - 1;
    let min_onset = usize::from(onset_minutes > 0.0);
    let max_onset = intervals - usize::from(peak_minutes > 0.0);
    let onset_intervals = ((intervals as f64 * onset_minutes / span).round() as usize)
        .clamp(min_onset, max_onset);
    let peak_intervals = intervals - onset_intervals;

    let mut samples = Vec::with_capacity(SAMPLE_COUNT);
    samples.push(IntensitySample {
        offset_minutes: 0.0,
        intensity: if onset_minutes > 0.0 {
            onset_curve(0.0)
        } else {
            peak_curve(0.0)
        },
    });

    for i in 1..=onset_intervals {
        let progress = i as f64 / onset_intervals as f64;
        samples.push(IntensitySample {
            offset_minutes: onset_minutes * progress,
            intensity: onset_curve(progress),
        });
    }

    for j in 1..=peak_intervals {
        let progress = j as f64 / peak_intervals as f64;
        samples.push(IntensitySample {
            offset_minutes: onset_minutes + peak_minutes * progress,
            intensity: peak_curve(progress),
        });
    }

    samples
}

/// Evenly spaced labels across `[0, span]`.
fn axis_labels(span: f64) -> Vec<AxisLabel> {
    if span <= 0.0 {
        return Vec::new();
    }
    let steps = MAX_LABELS - 1;
    (0..=steps)
        .map(|i| {
            let offset = span * i as f64 / steps as f64;
            AxisLabel {
                offset_minutes: offset,
                text: format_offset_label(offset),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_zero_total_is_none() {
        assert!(build_timeline(Some("0 minutes"), Some("0 minutes"), Some("0 minutes")).is_none());
        assert!(build_timeline(None, None, None).is_none());
        assert!(build_timeline(Some("garbage"), Some(""), None).is_none());
    }

    #[test]
    fn test_phase_boundaries() {
        let timeline =
            build_timeline(Some("30-30 minutes"), Some("2-2 hours"), Some("1-3 hours")).unwrap();

        assert_eq!(timeline.onset().start_minutes, 0.0);
        assert_eq!(timeline.onset().end_minutes, 30.0);
        assert_eq!(timeline.peak().start_minutes, 30.0);
        assert_eq!(timeline.peak().end_minutes, 150.0);
        assert_eq!(timeline.after_effects().start_minutes, 150.0);
        assert_eq!(timeline.after_effects().end_minutes, 270.0);
        assert_eq!(timeline.total_minutes, 270.0);
        assert_eq!(timeline.sampled_minutes(), 150.0);

        for pair in timeline.phases.windows(2) {
            assert_eq!(pair[0].end_minutes, pair[1].start_minutes);
        }
    }

    #[test]
    fn test_curve_shape() {
        let timeline = build_timeline(Some("30-30 minutes"), Some("2-2 hours"), None).unwrap();
        let samples = &timeline.samples;
        assert_eq!(samples.len(), SAMPLE_COUNT);

        assert_close(samples[0].intensity, 0.0);

        let boundary = samples
            .iter()
            .position(|s| s.offset_minutes == 30.0)
            .expect("boundary sample");
        assert_close(samples[boundary].intensity, 100.0);

        for pair in samples[..=boundary].windows(2) {
            assert!(pair[1].intensity > pair[0].intensity);
        }
        for pair in samples[boundary..].windows(2) {
            assert!(pair[1].intensity < pair[0].intensity);
        }

        let last = samples.last().unwrap();
        assert_close(last.offset_minutes, 150.0);
        assert_close(last.intensity, 100.0 * (-2.0f64).exp());
    }

    #[test]
    fn test_offsets_strictly_increase_and_stay_in_range() {
        let timeline = build_timeline(Some("20-40 minutes"), Some("4-6 hours"), None).unwrap();
        for pair in timeline.samples.windows(2) {
            assert!(pair[1].offset_minutes > pair[0].offset_minutes);
        }
        for sample in &timeline.samples {
            assert!((0.0..=100.0).contains(&sample.intensity));
        }
    }

    #[test]
    fn test_curve_endpoints() {
        assert_close(onset_curve(0.0), 0.0);
        assert_close(onset_curve(1.0), 100.0);
        assert_close(peak_curve(0.0), 100.0);
        assert_close(peak_curve(1.0), 100.0 * (-2.0f64).exp());
        // Inputs outside [0, 1] are clamped
        assert_close(onset_curve(2.0), 100.0);
        assert_close(peak_curve(-1.0), 100.0);
    }

    #[test]
    fn test_curves_are_monotonic() {
        let steps: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        for pair in steps.windows(2) {
            assert!(onset_curve(pair[1]) > onset_curve(pair[0]));
            assert!(peak_curve(pair[1]) < peak_curve(pair[0]));
        }
    }

    #[test]
    fn test_pure() {
        let a = build_timeline(Some("45-90 minutes"), Some("8-12 hours"), Some("1 hour"));
        let b = build_timeline(Some("45-90 minutes"), Some("8-12 hours"), Some("1 hour"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_onset_starts_at_peak() {
        let timeline = build_timeline(None, Some("1 hour"), None).unwrap();
        assert_eq!(timeline.samples.len(), SAMPLE_COUNT);
        assert_close(timeline.samples[0].intensity, 100.0);
    }

    #[test]
    fn test_no_peak_ends_at_full_intensity() {
        let timeline = build_timeline(Some("30 minutes"), None, None).unwrap();
        assert_eq!(timeline.samples.len(), SAMPLE_COUNT);
        assert_close(timeline.samples.last().unwrap().intensity, 100.0);
    }

    #[test]
    fn test_after_effects_only_has_no_samples() {
        let timeline = build_timeline(None, None, Some("2 hours")).unwrap();
        assert!(timeline.samples.is_empty());
        assert!(timeline.labels.is_empty());
        assert_eq!(timeline.total_minutes, 120.0);
    }

    #[test]
    fn test_labels() {
        let timeline = build_timeline(Some("30-30 minutes"), Some("2-2 hours"), None).unwrap();
        let texts: Vec<&str> = timeline.labels.iter().map(|l| l.text.as_str()).collect();
        assert!(texts.len() <= MAX_LABELS);
        assert_eq!(texts, vec!["0m", "30m", "1h", "1.5h", "2h", "2.5h"]);
        for pair in texts.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }

        let short = build_timeline(Some("5 minutes"), Some("10 minutes"), None).unwrap();
        assert!(short.labels.iter().all(|l| l.text.ends_with('m')));
        for pair in short.labels.windows(2) {
            assert!(pair[1].offset_minutes >= pair[0].offset_minutes);
        }
    }

    #[test]
    fn test_phase_at() {
        let timeline =
            build_timeline(Some("30 minutes"), Some("2 hours"), Some("1 hour")).unwrap();
        assert_eq!(timeline.phase_at(0.0), Some(PhaseName::Onset));
        assert_eq!(timeline.phase_at(29.0), Some(PhaseName::Onset));
        assert_eq!(timeline.phase_at(30.0), Some(PhaseName::Peak));
        assert_eq!(timeline.phase_at(200.0), Some(PhaseName::AfterEffects));
        assert_eq!(timeline.phase_at(500.0), None);
    }
}
