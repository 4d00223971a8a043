//! Standalone HTML document writer
//!
//! Wraps the plotly figure in a single HTML page. The figure data is always
//! embedded inline. plotly.js is loaded from its CDN unless a local copy is
//! inlined with [`HtmlWriter::with_inline_plotly`], which makes the page work
//! offline.

use std::path::Path;

use chrono::Utc;

use super::{ChartData, PlotlyWriter, Writer};
use crate::{Result, SalesvizError, VERSION};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Escape text for HTML element content and attribute values
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Make serialized JSON safe to place inside a `<script>` element
fn escape_script_json(json: &str) -> String {
    json.replace("</", "<\\/").replace("<!--", "<\\!--")
}

/// Keep inlined JavaScript from closing its own `<script>` element
fn escape_inline_script(code: &str) -> String {
    code.replace("</script", "<\\/script")
        .replace("</SCRIPT", "<\\/SCRIPT")
}

/// How the page gets plotly.js
#[derive(Debug, Clone, PartialEq, Eq)]
enum PlotlyScript {
    /// `<script src="...">`
    Src(String),
    /// Library source embedded in the page
    Inline(String),
}

/// A button that re-runs the export on the server and downloads the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportButton {
    /// Endpoint receiving a POST
    pub url: String,
    pub label: String,
    /// Suggested download file name
    pub file_name: String,
}

/// Standalone HTML writer
pub struct HtmlWriter {
    plotly: PlotlyScript,
    export_button: Option<ExportButton>,
    timestamp: bool,
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self {
            plotly: PlotlyScript::Src(PLOTLY_CDN.to_string()),
            export_button: None,
            timestamp: true,
        }
    }

    /// Load plotly.js from another location
    pub fn with_plotly_src(mut self, src: impl Into<String>) -> Self {
        self.plotly = PlotlyScript::Src(src.into());
        self
    }

    /// Embed a local copy of plotly.js (e.g. `plotly.min.js`) in the page
    pub fn with_inline_plotly(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path).map_err(|e| {
            SalesvizError::MissingInput(format!("plotly.js at {}: {}", path.display(), e))
        })?;
        self.plotly = PlotlyScript::Inline(code);
        Ok(self)
    }

    fn plotly_script(&self) -> String {
        match &self.plotly {
            PlotlyScript::Src(src) => format!(
                "<script src=\"{}\" charset=\"utf-8\"></script>",
                escape_html(src)
            ),
            PlotlyScript::Inline(code) => {
                format!("<script>\n{}\n</script>", escape_inline_script(code))
            }
        }
    }

    /// Add an export button to the page
    pub fn with_export_button(mut self, button: ExportButton) -> Self {
        self.export_button = Some(button);
        self
    }

    /// Omit the generation timestamp, making output byte-for-byte repeatable
    pub fn without_timestamp(mut self) -> Self {
        self.timestamp = false;
        self
    }

    fn button_html(button: &ExportButton) -> String {
        format!(
            r#"<div class="salesviz-toolbar"><button id="salesviz-export" type="button" data-url="{url}" data-file="{file}">{label}</button></div>
<script>
document.getElementById("salesviz-export").addEventListener("click", async (event) => {{
  const button = event.currentTarget;
  button.disabled = true;
  try {{
    const response = await fetch(button.dataset.url, {{ method: "POST" }});
    if (!response.ok) {{
      const body = await response.json().catch(() => null);
      throw new Error(body && body.error ? body.error.message : response.statusText);
    }}
    const blob = await response.blob();
    const link = document.createElement("a");
    link.href = URL.createObjectURL(blob);
    link.download = button.dataset.file;
    link.click();
    URL.revokeObjectURL(link.href);
  }} catch (err) {{
    alert("Export failed: " + err.message);
  }} finally {{
    button.disabled = false;
  }}
}});
</script>
"#,
            url = escape_html(&button.url),
            file = escape_html(&button.file_name),
            label = escape_html(&button.label),
        )
    }
}

impl Default for HtmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for HtmlWriter {
    type Output = String;

    fn write(&self, data: &ChartData) -> Result<String> {
        let figure = PlotlyWriter::new().write(data)?;
        let figure_json = serde_json::to_string(&figure)
            .map_err(|e| SalesvizError::WriterError(format!("Failed to serialize figure: {}", e)))?;

        let generated = if self.timestamp {
            format!(
                "\n<meta name=\"generated\" content=\"{}\">",
                Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
            )
        } else {
            String::new()
        };
        let toolbar = self
            .export_button
            .as_ref()
            .map(Self::button_html)
            .unwrap_or_default();

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="generator" content="salesviz {version}">{generated}
<title>{title}</title>
{plotly_script}
<style>
html, body {{ margin: 0; height: 100%; font-family: sans-serif; }}
#salesviz-chart {{ width: 100%; height: 100vh; }}
.salesviz-toolbar {{ position: absolute; top: 8px; left: 8px; z-index: 10; }}
</style>
</head>
<body>
{toolbar}<div id="salesviz-chart"></div>
<script type="application/json" id="salesviz-figure">{figure}</script>
<script>
const figure = JSON.parse(document.getElementById("salesviz-figure").textContent);
Plotly.newPlot("salesviz-chart", figure.data, figure.layout, figure.config);
</script>
</body>
</html>
"#,
            version = VERSION,
            generated = generated,
            title = escape_html(&data.chart.title),
            plotly_script = self.plotly_script(),
            toolbar = toolbar,
            figure = escape_script_json(&figure_json),
        ))
    }
}
