use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::artifact::{EventReport, ScriptReport};
use super::types::{ReportError, ReportResult};

/// On-disk representation of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// JSON only
    #[default]
    Json,
    /// HTML page plus a JSON manifest beside it
    Html,
}

impl ReportFormat {
    /// Infer the format from an output path's extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
            Some("html") | Some("htm") => ReportFormat::Html,
            _ => ReportFormat::Json,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    /// Parse a format name ("json" or "html"), ignoring case
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "html" | "htm" => Ok(ReportFormat::Html),
            _ => Err(ReportError::UnknownFormat(name.to_string())),
        }
    }
}

/// Write a report to `output_path`, returning every file written.
///
/// HTML reports also get a JSON manifest at `output_path` with a `.json`
/// extension, so any report can be loaded back with [`ScriptReport::load`].
pub fn write_report(report: &ScriptReport, output_path: &Path) -> ReportResult<Vec<PathBuf>> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(report)?;
    match ReportFormat::from_path(output_path) {
        ReportFormat::Json => {
            fs::write(output_path, json)?;
            Ok(vec![output_path.to_path_buf()])
        }
        ReportFormat::Html => {
            let manifest_path = output_path.with_extension("json");
            fs::write(output_path, render_html(report, output_path))?;
            fs::write(&manifest_path, json)?;
            Ok(vec![output_path.to_path_buf(), manifest_path])
        }
    }
}

/// Render a self-contained HTML page for a report
pub fn render_html(report: &ScriptReport, output_path: &Path) -> String {
    // Screenshot paths are relative to the output path itself, so links are
    // built from the report's own file name
    let link_base = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut html = String::new();
    let _ = writeln!(html, "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>{}</title>", escape(&report.name));
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n");

    let _ = writeln!(html, "<h1>{}</h1>", escape(&report.name));
    html.push_str("<table class=\"meta\">\n");
    meta_row(&mut html, "Browser", report.browser.as_deref());
    meta_row(&mut html, "Script", report.script.as_deref());
    meta_row(&mut html, "Host", report.host.as_deref());
    meta_row(&mut html, "Generated", Some(&report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()));
    let _ = writeln!(
        html,
        "<tr><th>Totals</th><td>{} passed, {} warnings, {} failed</td></tr>",
        report.pass_count, report.warning_count, report.failure_count
    );
    html.push_str("</table>\n");

    for function in &report.functions {
        let _ = writeln!(
            html,
            "<h2>{} <small>({} passed, {} warnings, {} failed)</small></h2>",
            escape(&function.name),
            function.pass_count,
            function.warning_count,
            function.fail_count
        );
        html.push_str("<table class=\"events\">\n<tr><th>Status</th><th>Title</th><th>Message</th><th>Evidence</th></tr>\n");
        for event in &function.events {
            event_row(&mut html, event, &link_base);
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn meta_row(html: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        let _ = writeln!(html, "<tr><th>{}</th><td>{}</td></tr>", label, escape(value));
    }
}

fn event_row(html: &mut String, event: &EventReport, link_base: &str) {
    let mut evidence = String::new();
    if let Some(screenshot) = &event.screenshot_path {
        let href = format!("{}{}", link_base, screenshot).replace('\\', "/");
        let _ = write!(evidence, "<a href=\"{}\">screenshot</a>", escape(&href));
    }
    if let Some(stack) = event.stack_trace.as_ref().filter(|s| !s.is_empty()) {
        let _ = write!(evidence, "<pre>{}</pre>", escape(&stack.join("\n")));
    }

    let _ = writeln!(
        html,
        "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        event.status.as_str(),
        event.status,
        escape(&event.title),
        escape(&event.message),
        evidence
    );
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "<style>
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; margin-bottom: 1.5em; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; vertical-align: top; }
tr.pass td:first-child { color: #2a7d2a; }
tr.warning td:first-child { color: #b8860b; }
tr.fail td:first-child { color: #b22222; font-weight: bold; }
pre { margin: 0; font-size: 0.8em; }
</style>
";
