// SVG chart renderer - Draws a chart specification as an SVG line chart
use crate::application::chart_container::ChartContainer;
use crate::application::chart_renderer::ChartRenderer;
use crate::domain::chart::ChartSpec;
use crate::domain::graphic::VectorGraphic;
use crate::domain::statistics::round2;
use std::fmt::Write;

const COLORS: [&str; 4] = ["#4682b4", "#c0c0c0", "#28a745", "#a0a0a0"];
const AXIS_COLOR: &str = "#6c7680";
const GRID_COLOR: &str = "#e2e6e9";
const TEXT_COLOR: &str = "#36414c";
const Y_TICKS: usize = 5;

/// Plot margins in pixels.
#[derive(Debug, Clone, Copy)]
struct Insets {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Default for Insets {
    fn default() -> Self {
        Self {
            left: 64.0,
            right: 24.0,
            top: 48.0,
            bottom: 96.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SvgChartRenderer {
    width: u32,
    height: u32,
    insets: Insets,
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self::new(800, 300)
    }
}

impl SvgChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            insets: Insets::default(),
        }
    }

    pub fn to_svg(&self, spec: &ChartSpec) -> Result<String, std::fmt::Error> {
        let (w, h) = (self.width as f64, self.height as f64);
        let l = self.insets.left;
        let r = (w - self.insets.right).max(l + 1.0);
        let t = self.insets.top;
        let b = (h - self.insets.bottom).max(t + 1.0);

        let n = spec.labels.len();
        let y_span = (spec.y_axis_max - spec.y_axis_min).max(1e-9);
        let sx = |i: usize| -> f64 {
            if n <= 1 {
                (l + r) / 2.0
            } else {
                l + i as f64 / (n - 1) as f64 * (r - l)
            }
        };
        let sy = |v: f64| -> f64 { b - (v - spec.y_axis_min) / y_span * (b - t) };

        let mut svg = String::new();
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#
        )?;
        writeln!(svg, r##"  <rect width="{w}" height="{h}" fill="#ffffff"/>"##)?;
        writeln!(
            svg,
            r#"  <text x="{l}" y="24" fill="{TEXT_COLOR}" font-size="14" font-weight="600">{}</text>"#,
            escape_xml(&spec.title)
        )?;

        // Y axis grid and ticks
        for k in 0..Y_TICKS {
            let value = spec.y_axis_min + y_span * k as f64 / (Y_TICKS - 1) as f64;
            let y = sy(value);
            writeln!(
                svg,
                r#"  <line x1="{l}" y1="{y:.1}" x2="{r}" y2="{y:.1}" stroke="{GRID_COLOR}" stroke-width="1"/>"#
            )?;
            writeln!(
                svg,
                r#"  <text x="{:.1}" y="{:.1}" fill="{TEXT_COLOR}" font-size="10" text-anchor="end">{}</text>"#,
                l - 6.0,
                y + 3.0,
                round2(value)
            )?;
        }
        writeln!(
            svg,
            r#"  <line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="{AXIS_COLOR}" stroke-width="1"/>"#
        )?;

        // X axis tick labels, rotated 90 degrees
        for (i, label) in spec.labels.iter().enumerate() {
            let x = sx(i);
            writeln!(
                svg,
                r#"  <text transform="translate({x:.1},{:.1}) rotate(90)" fill="{TEXT_COLOR}" font-size="10">{}</text>"#,
                b + 6.0,
                escape_xml(label)
            )?;
        }

        // One polyline per run of present values, no markers or fill
        for (idx, line) in spec.series.iter().enumerate() {
            let color = COLORS[idx % COLORS.len()];
            let dash = if line.is_dashed() { r#" stroke-dasharray="2 4""# } else { "" };
            writeln!(svg, r#"  <g stroke="{color}" stroke-width="2" fill="none"{dash}>"#)?;
            for run in present_runs(&line.values, n) {
                let points: Vec<String> = run
                    .iter()
                    .map(|&(i, v)| format!("{:.1},{:.1}", sx(i), sy(v)))
                    .collect();
                writeln!(svg, r#"    <polyline points="{}"/>"#, points.join(" "))?;
            }
            writeln!(svg, "  </g>")?;
        }

        // Hover columns carrying the tooltip of every series at a label
        let column = if n <= 1 { r - l } else { (r - l) / (n - 1) as f64 };
        for (i, label) in spec.labels.iter().enumerate() {
            let mut tooltip = escape_xml(label);
            for line in &spec.series {
                let value = line.values.get(i).copied().flatten();
                write!(
                    tooltip,
                    "\n{}: {}",
                    escape_xml(&line.name),
                    escape_xml(&spec.tooltip(value))
                )?;
            }
            writeln!(
                svg,
                r#"  <rect x="{:.1}" y="{t}" width="{column:.1}" height="{:.1}" fill="transparent"><title>{tooltip}</title></rect>"#,
                sx(i) - column / 2.0,
                b - t
            )?;
        }

        // Legend
        let mut x = l;
        for (idx, line) in spec.series.iter().enumerate() {
            let color = COLORS[idx % COLORS.len()];
            writeln!(
                svg,
                r#"  <rect x="{x:.1}" y="{:.1}" width="10" height="3" fill="{color}"/>"#,
                h - 14.0
            )?;
            writeln!(
                svg,
                r#"  <text x="{:.1}" y="{:.1}" fill="{TEXT_COLOR}" font-size="10">{}</text>"#,
                x + 14.0,
                h - 10.0,
                escape_xml(&line.name)
            )?;
            x += 24.0 + line.name.chars().count() as f64 * 6.0;
        }

        svg.push_str("</svg>\n");
        Ok(svg)
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, spec: &ChartSpec, target: &ChartContainer) -> anyhow::Result<()> {
        // Build fully before touching the container so a failure leaves the old chart
        let markup = self.to_svg(spec)?;
        target.clear();
        target.draw(VectorGraphic::new(markup));
        target.mark_settled();
        tracing::debug!("Rendered '{}' into {}", spec.title, target.id());
        Ok(())
    }
}

/// Consecutive present values as `(index, value)` runs; absent readings split runs.
fn present_runs(values: &[Option<f64>], points: usize) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (i, value) in values.iter().take(points).enumerate() {
        match value {
            Some(v) if v.is_finite() => current.push((i, *v)),
            _ => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
