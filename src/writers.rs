//! Rendering sinks for analysis results
//!
//! A `Writer` consumes the ordered (text, stats) sequence the core produces
//! and emits one rendered document per analyzed file. The HTML writer
//! reproduces the red-green (optionally red-blue) gradient of the original
//! viewer: hue reflects the specialization hit rate, lightness the share of
//! unquickened instructions.

use std::fs;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

use crate::analysis::AnalysisReport;
use crate::stats::Stats;

pub trait Writer {
    /// Add one chunk of attributed source text.
    fn add(&mut self, source: &str, stats: Stats);

    /// Emit the rendered document.
    fn emit(&self) -> String;

    /// File extension for rendered output.
    fn extension(&self) -> &'static str;

    /// A fresh writer with the same configuration, for the next file.
    fn fresh(&self) -> Box<dyn Writer>;
}

/// HTML view with a color gradient per chunk.
pub struct HtmlWriter {
    blue: bool,
    dark: bool,
    parts: Vec<String>,
}

impl HtmlWriter {
    pub fn new(blue: bool, dark: bool) -> Self {
        let (background, foreground) = if dark {
            ("black", "white")
        } else {
            ("white", "black")
        };
        let parts = vec![
            "<!doctype html>".to_string(),
            "<html>".to_string(),
            "<head>".to_string(),
            "<meta http-equiv='content-type' content='text/html;charset=utf-8'/>".to_string(),
            "</head>".to_string(),
            format!("<body style='background-color:{background};color:{foreground}'>"),
            "<pre>".to_string(),
        ];
        Self { blue, dark, parts }
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// RGB color code for a chunk. Hue runs along the red-green gradient
    /// with the hit rate (negated for red-blue); lightness rises with the
    /// unquickened share; saturation is always full.
    fn color(&self, stats: Stats) -> String {
        let quickened = stats.specialized + stats.adaptive;
        if quickened == 0 {
            return "#ffffff".to_string();
        }
        let mut hue = stats.specialized as f64 / quickened as f64 / 3.0;
        if self.blue {
            hue = -hue;
        }
        let lightness = (stats.unquickened as f64
            / (quickened + stats.unquickened) as f64)
            .max(0.5);
        let (r, g, b) = hls_to_rgb(hue, lightness, 1.0);
        format!(
            "#{:02x}{:02x}{:02x}",
            (255.0 * r) as u8,
            (255.0 * g) as u8,
            (255.0 * b) as u8
        )
    }
}

impl Writer for HtmlWriter {
    fn add(&mut self, source: &str, stats: Stats) {
        let color = self.color(stats);
        let attribute = if self.dark { "color" } else { "background-color" };
        let escaped = Self::escape_html(source);
        if color == "#ffffff" {
            self.parts.push(escaped);
        } else {
            self.parts
                .push(format!("<span style='{attribute}:{color}'>{escaped}</span>"));
        }
    }

    fn emit(&self) -> String {
        let mut page = self.parts.concat();
        page.push_str("</pre></body></html>");
        page
    }

    fn extension(&self) -> &'static str {
        "html"
    }

    fn fresh(&self) -> Box<dyn Writer> {
        Box::new(HtmlWriter::new(self.blue, self.dark))
    }
}

/// JSON view emitting `{"data": [{"source", "stats"}, ...]}`.
pub struct JsonWriter {
    indent: Option<usize>,
    data: Vec<serde_json::Value>,
}

impl JsonWriter {
    pub fn new(indent: Option<usize>) -> Self {
        Self {
            indent,
            data: Vec::new(),
        }
    }
}

impl Writer for JsonWriter {
    fn add(&mut self, source: &str, stats: Stats) {
        self.data.push(serde_json::json!({
            "source": source,
            "stats": stats,
        }));
    }

    fn emit(&self) -> String {
        let document = serde_json::json!({ "data": self.data });
        match self.indent {
            Some(width) => {
                let indent = " ".repeat(width);
                let formatter =
                    serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut out = Vec::new();
                let mut serializer =
                    serde_json::Serializer::with_formatter(&mut out, formatter);
                serde::Serialize::serialize(&document, &mut serializer)
                    .expect("JSON document serialization cannot fail");
                String::from_utf8(out).expect("serde_json emits UTF-8")
            }
            None => document.to_string(),
        }
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn fresh(&self) -> Box<dyn Writer> {
        Box::new(JsonWriter::new(self.indent))
    }
}

/// colorsys-compatible HLS to RGB conversion.
fn hls_to_rgb(hue: f64, lightness: f64, saturation: f64) -> (f64, f64, f64) {
    if saturation == 0.0 {
        return (lightness, lightness, lightness);
    }
    let m2 = if lightness <= 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let m1 = 2.0 * lightness - m2;
    (
        hls_component(m1, m2, hue + 1.0 / 3.0),
        hls_component(m1, m2, hue),
        hls_component(m1, m2, hue - 1.0 / 3.0),
    )
}

fn hls_component(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

/// Longest common ancestor of a set of absolute paths.
fn common_path(paths: &[PathBuf]) -> PathBuf {
    let Some(first) = paths.first() else {
        return PathBuf::new();
    };
    let mut prefix: Vec<Component> = first.components().collect();
    for path in &paths[1..] {
        let components: Vec<Component> = path.components().collect();
        let shared = prefix
            .iter()
            .zip(components.iter())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(shared);
    }
    // A common prefix that is a full path to one of the files must back up
    // to its parent directory.
    let mut common: PathBuf = prefix.iter().collect();
    if paths.iter().any(|p| *p == common) {
        common.pop();
    }
    common
}

/// Render every file of a report: one document per analyzed path, written
/// under `out_dir` (mirroring the layout below the common path prefix) or
/// to stdout when no output directory is given.
pub fn view(report: &AnalysisReport, writer: &dyn Writer, out_dir: Option<&Path>) -> Result<()> {
    let paths: Vec<PathBuf> = report.files.iter().map(|(p, _)| p.clone()).collect();
    let common = common_path(&paths);

    if let Some(out_dir) = out_dir {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    }

    for (path, results) in &report.files {
        let mut writer = writer.fresh();
        for (source, stats) in results {
            writer.add(source, *stats);
        }
        let rendered = writer.emit();

        match out_dir {
            Some(out_dir) => {
                let relative = path.strip_prefix(&common).unwrap_or(path);
                let out_file = out_dir
                    .join(relative)
                    .with_extension(writer.extension());
                if let Some(parent) = out_file.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                fs::write(&out_file, rendered)
                    .with_context(|| format!("writing {}", out_file.display()))?;
                tracing::info!(path = %out_file.display(), "wrote report");
            }
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                writeln!(handle, "{rendered}").context("writing report to stdout")?;
            }
        }
    }
    Ok(())
}
