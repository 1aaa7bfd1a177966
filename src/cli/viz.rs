//! Terminal charts for QC output
//!
//! Histograms are drawn with block characters; control charts use braille
//! graphics so a few hundred readings still fit on one screen.

use drawille::Canvas;

use crate::core::spc::{ControlChart, Histogram, SpecLimits};

/// Default canvas size for control charts (braille pixels)
pub const CHART_WIDTH: u32 = 120;
pub const CHART_HEIGHT: u32 = 40;

/// Widest histogram bar, in characters
pub const BAR_WIDTH: usize = 40;

/// Render a horizontal bar histogram
///
/// Bins holding a spec limit or the target are tagged on the right.
///
/// # Example Output
/// ```text
/// 2.3745-2.3750  │                                          0
/// 2.3750-2.3755  │██████████                                2  ◀ LSL
/// 2.3755-2.3760  │████████████████████████████████████████  8
/// ```
pub fn render_histogram(histogram: &Histogram, spec: Option<&SpecLimits>) -> String {
    if histogram.is_empty() {
        return "  (no measurements)".to_string();
    }

    let max = histogram.max_count().max(1);
    let label_width = histogram
        .bins
        .iter()
        .map(|b| b.range_label().len())
        .max()
        .unwrap_or(0);
    let last = histogram.bins.len() - 1;

    let mut lines = Vec::with_capacity(histogram.bins.len());
    for (i, bin) in histogram.bins.iter().enumerate() {
        let len = (bin.count * BAR_WIDTH).div_ceil(max);
        let bar = "█".repeat(len);
        let mut line = format!(
            "{:<lw$}  │{:<bw$}  {}",
            bin.range_label(),
            bar,
            bin.count,
            lw = label_width,
            bw = BAR_WIDTH
        );

        if let Some(spec) = spec {
            let in_bin = |v: f64| {
                v >= bin.bin_start && (v < bin.bin_end || (i == last && v <= bin.bin_end))
            };
            let mut tags = Vec::new();
            if in_bin(spec.lsl) {
                tags.push("LSL");
            }
            if in_bin(spec.target) {
                tags.push("TARGET");
            }
            if in_bin(spec.usl) {
                tags.push("USL");
            }
            if !tags.is_empty() {
                line.push_str("  ◀ ");
                line.push_str(&tags.join(" "));
            }
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Render an individuals control chart
///
/// The center line is solid, UCL/LCL are dotted, and points outside the
/// control limits are drawn as small crosses.
pub fn render_control_chart(chart: &ControlChart, width: u32, height: u32) -> String {
    if chart.is_empty() {
        return "  (no measurements)".to_string();
    }
    let width = width.max(8);
    let height = height.max(8);

    let values = chart.points.iter().map(|p| p.value);
    let data_min = values.clone().fold(f64::INFINITY, f64::min);
    let data_max = values.fold(f64::NEG_INFINITY, f64::max);
    let mut lo = data_min.min(chart.limits.lcl);
    let mut hi = data_max.max(chart.limits.ucl);
    if hi - lo <= f64::EPSILON {
        lo -= 0.001;
        hi += 0.001;
    }

    let to_y = |v: f64| -> u32 {
        let frac = (hi - v) / (hi - lo);
        (frac * (height - 1) as f64).round().clamp(0.0, (height - 1) as f64) as u32
    };
    let n = chart.points.len();
    let to_x = |i: usize| -> u32 {
        if n <= 1 {
            width / 2
        } else {
            ((i as f64 / (n - 1) as f64) * (width - 1) as f64).round() as u32
        }
    };

    let mut canvas = Canvas::new(width, height);

    // Limits
    let center_y = to_y(chart.limits.center);
    let ucl_y = to_y(chart.limits.ucl);
    let lcl_y = to_y(chart.limits.lcl);
    for x in 0..width {
        canvas.set(x, center_y);
        if x % 4 == 0 {
            canvas.set(x, ucl_y);
            canvas.set(x, lcl_y);
        }
    }

    // Series
    let mut prev: Option<(u32, u32)> = None;
    for (i, point) in chart.points.iter().enumerate() {
        let (x, y) = (to_x(i), to_y(point.value));
        if let Some((px, py)) = prev {
            canvas.line(px, py, x, y);
        } else {
            canvas.set(x, y);
        }
        if point.out_of_control {
            for (dx, dy) in [(-1i64, -1i64), (1, 1), (-1, 1), (1, -1)] {
                let cx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
                let cy = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
                canvas.set(cx, cy);
            }
        }
        prev = Some((x, y));
    }

    let mut output = canvas.frame();
    output.push_str(&format!(
        "\n  UCL={:.4}  CL={:.4}  LCL={:.4}  n={}",
        chart.limits.ucl, chart.limits.center, chart.limits.lcl, n
    ));
    output
}

/// Render a 1D bar comparing the observed range with the spec limits
///
/// # Example Output
/// ```text
///   LSL=2.3750  USL=2.3850
///   ─────│─────────[══════]───────────│─────
///   Min=2.3790  Max=2.3822
/// ```
pub fn render_range_bar(min: f64, max: f64, lower_limit: f64, upper_limit: f64) -> String {
    let bar_width = 60;

    let full_range = (upper_limit - lower_limit).abs().max(f64::EPSILON);
    let spec_margin = full_range * 0.1;

    let view_min = lower_limit.min(min) - spec_margin;
    let view_max = upper_limit.max(max) + spec_margin;
    let view_range = view_max - view_min;

    let pos = |v: f64| -> usize {
        let p = ((v - view_min) / view_range * bar_width as f64).max(0.0) as usize;
        p.min(bar_width - 1)
    };
    let pos_lower = pos(lower_limit);
    let pos_upper = pos(upper_limit);
    let pos_min = pos(min);
    let pos_max = pos(max);

    let mut bar: Vec<char> = vec!['─'; bar_width];
    bar[pos_lower] = '│';
    bar[pos_upper] = '│';

    for cell in bar.iter_mut().take(pos_max + 1).skip(pos_min) {
        *cell = if *cell == '│' { '╋' } else { '═' };
    }
    bar[pos_min] = if bar[pos_min] == '╋' { '╟' } else { '[' };
    bar[pos_max] = if bar[pos_max] == '╋' { '╢' } else { ']' };

    let bar_str: String = bar.into_iter().collect();

    format!(
        "  LSL={:.4}  USL={:.4}\n  {}\n  Min={:.4}  Max={:.4}",
        lower_limit, upper_limit, bar_str, min, max
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spc::{build_control_chart, build_histogram};

    #[test]
    fn test_render_histogram_identical_values() {
        let histogram = build_histogram(&[1.0, 1.0, 1.0], None, 20);
        let output = render_histogram(&histogram, None);
        insta::assert_snapshot!(output, @"1.0000  │████████████████████████████████████████  3");
    }

    #[test]
    fn test_render_histogram_tags_spec() {
        let spec = SpecLimits::new(2.385, 2.380, 2.375);
        let histogram = build_histogram(&[2.379, 2.380, 2.381], Some(&spec), 10);
        let output = render_histogram(&histogram, Some(&spec));
        assert_eq!(output.lines().count(), 10);
        assert!(output.contains("◀ LSL"));
        assert!(output.contains("USL"));
        assert!(output.contains("TARGET"));
    }

    #[test]
    fn test_render_histogram_empty() {
        let output = render_histogram(&Histogram::default(), None);
        assert!(output.contains("no measurements"));
    }

    #[test]
    fn test_render_control_chart() {
        let chart = build_control_chart(&[2.380, 2.381, 2.379, 2.380, 2.382]);
        let output = render_control_chart(&chart, CHART_WIDTH, CHART_HEIGHT);
        assert!(output.contains("UCL="));
        assert!(output.contains("n=5"));
        assert!(output
            .chars()
            .any(|c| c as u32 >= 0x2800 && c as u32 <= 0x28FF));
    }

    #[test]
    fn test_render_control_chart_flat_series() {
        let chart = build_control_chart(&[2.38, 2.38]);
        let output = render_control_chart(&chart, 20, 8);
        assert!(output.contains("CL=2.3800"));
    }

    #[test]
    fn test_render_range_bar() {
        let output = render_range_bar(2.379, 2.382, 2.375, 2.385);
        assert!(output.contains("LSL=2.3750"));
        assert!(output.contains("USL=2.3850"));
        assert!(output.contains("Min=2.3790"));
        assert!(output.contains('['));
        assert!(output.contains(']'));
    }

    #[test]
    fn test_render_range_bar_outside_spec() {
        let output = render_range_bar(2.370, 2.390, 2.375, 2.385);
        assert!(output.contains("Max=2.3900"));
    }
}
