//! Text, CSV, JSON and HTML renderings of a report.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::model::entry::ReconciliationEntry;

#[derive(Debug, Clone, Copy)]
pub struct TableStyle<'a> {
    pub sep: &'a str,
    /// Maximum characters per column.
    pub limit: usize,
    pub align: bool,
    /// Underline the header row.
    pub draw_title: bool,
}

pub const TEXT_TABLE: TableStyle<'static> = TableStyle {
    sep: " | ",
    limit: 60,
    align: true,
    draw_title: true,
};

pub const CSV: TableStyle<'static> = TableStyle {
    sep: ";",
    limit: 1024,
    align: false,
    draw_title: false,
};

/// Render a header row plus one row per entry.
pub fn table(entries: &[ReconciliationEntry], style: TableStyle<'_>) -> String {
    let mut rows = vec![ReconciliationEntry::headers()];
    rows.extend(entries.iter().map(ReconciliationEntry::row));

    let widths: Vec<usize> = (0..rows[0].len())
        .map(|col| {
            rows.iter()
                .map(|r| r[col].chars().count())
                .max()
                .unwrap_or(0)
                .min(style.limit)
        })
        .collect();

    let mut out = String::new();
    let mut draw_title = style.draw_title;
    for row in &rows {
        let cells: Vec<String> = if style.align {
            row.iter()
                .zip(&widths)
                .map(|(cell, width)| {
                    let cell: String = cell.chars().take(style.limit).collect();
                    format!("{cell:<width$}")
                })
                .collect()
        } else {
            row.iter().map(|c| c.to_string()).collect()
        };
        let line = cells.join(style.sep);
        out.push_str(&line);
        out.push('\n');

        if draw_title {
            out.push_str(&"-".repeat(line.chars().count()));
            out.push('\n');
            draw_title = false;
        }
    }
    out
}

pub fn json(entries: &[ReconciliationEntry]) -> Result<String> {
    serde_json::to_string_pretty(entries).context("Failed to serialize report")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn importance_style(importance: &str) -> &'static str {
    match importance {
        "Critical" => r#" style="color:#d12b1f""#,
        "High" => r#" style="color:#e07714""#,
        "Medium" => r#" style="color:#0b9b3d""#,
        "Wishlist" => r#" style="color:#2727a7""#,
        "Undecided" => r#" style="color:#6d6d6e""#,
        _ => "",
    }
}

fn status_style(status: &str) -> &'static str {
    match status {
        "New" => r#" style="background-color:#af7850""#,
        "Confirmed" | "Incomplete" => r#" style="background-color:#E94348""#,
        "Triaged" => r#" style="background-color:#F77200""#,
        "Fix Committed" => r#" style="background-color:#b5d4a7""#,
        "Fix Released" => r#" style="background-color:#6ab44b""#,
        _ => "",
    }
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html><title>Jira / Launchpad status</title>
<head>
<style>
#search { width: 100%; font-size: 14px; padding: 12px 20px; border: 1px solid #ddd; margin-bottom: 12px; }
#JIRA-LP-TABLE th, #JIRA-LP-TABLE td { text-align: left; }
#JIRA-LP-TABLE tr { border-bottom: 1px solid #ddd; }
#JIRA-LP-TABLE tr:hover { background-color: #f1f1f1; }
table, th, td { border: 1px solid black; }
</style>
<script>
function search() {
  var filter = document.getElementById("search").value.toUpperCase();
  var rows = document.getElementById("JIRA-LP-TABLE").getElementsByTagName("TR");
  for (var i = 1; i < rows.length; i++) {
    var text = rows[i].textContent || rows[i].innerText;
    rows[i].style.display = text.toUpperCase().indexOf(filter) > -1 ? "" : "none";
  }
}
function sortTable(n, numerical) {
  var table = document.getElementById("JIRA-LP-TABLE");
  var body = Array.prototype.slice.call(table.rows, 1);
  var asc = table.getAttribute("data-sort") !== n + "asc";
  body.sort(function (a, b) {
    var x = a.cells[n].innerText, y = b.cells[n].innerText;
    var c = numerical ? Number(x) - Number(y) : x.toLowerCase().localeCompare(y.toLowerCase());
    return asc ? c : -c;
  });
  body.forEach(function (row) { row.parentNode.appendChild(row); });
  table.setAttribute("data-sort", n + (asc ? "asc" : "desc"));
}
</script>
</head>
"#;

/// Searchable, sortable HTML table. `browse` maps an issue key to its URL.
pub fn html(
    entries: &[ReconciliationEntry],
    browse: &dyn Fn(&str) -> String,
    generated_at: &str,
) -> String {
    let mut out = String::from(HTML_HEAD);
    out.push_str("<body>\n");
    out.push_str(&format!("<p>Report generated on {}</p>\n", escape(generated_at)));
    out.push_str(r#"<input type="text" id="search" onkeyup="search()" placeholder="Search ..">"#);
    out.push_str("\n<table id=\"JIRA-LP-TABLE\">\n<tr>\n");
    for (i, header) in ReconciliationEntry::headers().iter().enumerate() {
        let numerical = *header == "Heat" || *header == "LaunchPad ID";
        out.push_str(&format!(
            "<th onclick=\"sortTable({i},{numerical})\">{header}</th>\n"
        ));
    }
    out.push_str("</tr>\n");

    for entry in entries {
        let summary = if entry.summary.chars().count() > 80 {
            format!("{} ...", entry.summary.chars().take(80).collect::<String>())
        } else {
            entry.summary.clone()
        };
        let packages = if entry.packages.split(',').count() > 2 {
            "multiple packages".to_string()
        } else {
            entry.packages.clone()
        };

        out.push_str("<tr>\n");
        out.push_str(&format!(
            "\t<td><a href=\"{}\">{}</a></td>\n",
            escape(&browse(&entry.key)),
            escape(&entry.key)
        ));
        out.push_str(&format!("\t<td>{}</td>\n", escape(&summary)));
        out.push_str(&format!("\t<td>{}</td>\n", escape(&entry.status)));
        match entry.source_id() {
            Some(id) => out.push_str(&format!(
                "\t<td><a href=\"https://pad.lv/{id}\">{id}</a></td>\n"
            )),
            None => out.push_str(&format!("\t<td>{}</td>\n", escape(&entry.source_id))),
        }
        out.push_str(&format!("\t<td>{}</td>\n", escape(&entry.heat)));
        out.push_str(&format!(
            "\t<td{}><b>{}</b></td>\n",
            importance_style(&entry.importance),
            escape(&entry.importance)
        ));
        out.push_str(&format!("\t<td>{}</td>\n", escape(&packages)));
        for status in &entry.series {
            out.push_str(&format!(
                "\t<td{}>{}</td>\n",
                status_style(status),
                escape(status)
            ));
        }
        out.push_str("</tr>\n");
    }

    out.push_str("</table>\n</body></html>\n");
    out
}

/// Files requested for a report; stdout gets the text table when none are.
#[derive(Debug, Clone, Default)]
pub struct ReportOutputs {
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub html: Option<PathBuf>,
}

impl ReportOutputs {
    pub fn is_empty(&self) -> bool {
        self.csv.is_none() && self.json.is_none() && self.html.is_none()
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write every requested format. A failing format is logged and does not
/// stop the others; returns how many failed.
pub fn write_all(
    entries: &[ReconciliationEntry],
    outputs: &ReportOutputs,
    browse: &dyn Fn(&str) -> String,
) -> usize {
    let mut failures = 0;

    if let Some(path) = &outputs.json {
        match json(entries).and_then(|j| write_file(path, &j)) {
            Ok(()) => log::info!("JSON report saved as {}", path.display()),
            Err(e) => {
                log::error!("{e:#}");
                failures += 1;
            }
        }
    }

    if let Some(path) = &outputs.html {
        let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        match write_file(path, &html(entries, browse, &generated_at)) {
            Ok(()) => log::info!("HTML report saved as {}", path.display()),
            Err(e) => {
                log::error!("{e:#}");
                failures += 1;
            }
        }
    }

    if let Some(path) = &outputs.csv {
        match write_file(path, &table(entries, CSV)) {
            Ok(()) => log::info!("CSV report saved as {}", path.display()),
            Err(e) => {
                log::error!("{e:#}");
                failures += 1;
            }
        }
    }

    if outputs.is_empty() {
        print!("{}", table(entries, TEXT_TABLE));
    }

    failures
}
