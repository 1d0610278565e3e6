use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::{ScannerRow, format_percent, matrix_argmax};
use crate::report::{matrix_clip_note, matrix_is_clipped, matrix_window};
use crate::state::{PredictionView, ResultPanel};

const STYLE: &str = "body{font-family:system-ui,sans-serif;background:#0f172a;color:#e2e8f0;margin:2rem}\
.result-card,.error-card,.loading-card{max-width:760px;margin:auto;padding:1.5rem;border-radius:12px;background:#1e293b}\
.error-card{color:#f87171}\
.result-header{display:flex;justify-content:space-between;align-items:center}\
.badge-league{background:#334155;padding:.2rem .6rem;border-radius:6px}\
.prediction-value{font-size:2rem;font-weight:700}\
.stats-grid{display:grid;grid-template-columns:1fr 1fr;gap:1rem;margin:1rem 0}\
table.score-matrix{border-collapse:collapse;margin:1rem 0}\
table.score-matrix td,table.score-matrix th{padding:.25rem .5rem;text-align:right}\
td.best{background:#4ade80;color:#0f172a;font-weight:700}\
.scanner-row{display:grid;grid-template-columns:2fr 2fr 1fr;padding:.4rem 0;border-bottom:1px solid #334155}\
.scanner-row.positive{color:#4ade80}\
.picks{margin-top:1rem}";

/// Escapes text for element content and double-quoted attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn render_panel(panel: &ResultPanel) -> String {
    match panel {
        ResultPanel::Idle => String::new(),
        ResultPanel::Loading => render_loading_card(),
        ResultPanel::Failed(msg) => render_error_card(msg),
        ResultPanel::Ready(view) => render_result_card(view),
    }
}

pub fn render_loading_card() -> String {
    "<div class=\"loading-card\"><div class=\"spinner\"></div><p>Analysing the match...</p></div>"
        .to_string()
}

pub fn render_error_card(msg: &str) -> String {
    format!("<div class=\"error-card\">{}</div>", escape_html(msg))
}

pub fn render_result_card(view: &PredictionView) -> String {
    let req = &view.request;
    let pred = &view.prediction;
    let mut html = String::new();

    html.push_str("<div class=\"result-card\">");
    let _ = write!(
        html,
        "<div class=\"result-header\"><h3>{} vs {}</h3><div class=\"badge-league\">{}</div></div>",
        escape_html(&req.home_team),
        escape_html(&req.away_team),
        escape_html(req.division.as_deref().unwrap_or("-"))
    );

    let (score, prob) = match pred.most_likely() {
        Some(s) => (s.label, s.prob),
        None => ("-".to_string(), String::new()),
    };
    let _ = write!(
        html,
        "<div class=\"main-prediction\"><span class=\"label\">Main prediction</span>\
         <div class=\"prediction-value\">{}</div><span class=\"prob\">{}</span></div>",
        escape_html(&score),
        escape_html(&prob)
    );

    let _ = write!(
        html,
        "<div class=\"stats-grid\"><div class=\"stat-item\"><span>xG home</span><strong>{}</strong></div>\
         <div class=\"stat-item\"><span>xG away</span><strong>{}</strong></div></div>",
        escape_html(&pred.xg.home),
        escape_html(&pred.xg.away)
    );

    if !pred.matrix.is_empty() {
        html.push_str(&render_matrix(&pred.matrix));
    }

    html.push_str("<div class=\"scanner-list\"><h4>Market scanner</h4>");
    for row in &pred.scanner {
        html.push_str(&render_scanner_row(row));
    }
    html.push_str("</div>");

    if pred.rational.is_some() || pred.safe.is_some() {
        html.push_str("<div class=\"picks\">");
        if let Some(row) = &pred.rational {
            let _ = write!(
                html,
                "<p class=\"pick rational\">Rational pick: <strong>{}</strong> {}</p>",
                escape_html(&row.name),
                escape_html(&row.odd_text())
            );
        }
        if let Some(row) = &pred.safe {
            let _ = write!(
                html,
                "<p class=\"pick safe\">Safe pick: <strong>{}</strong> {} ({})</p>",
                escape_html(&row.name),
                escape_html(&row.odd_text()),
                escape_html(&row.prob_txt)
            );
        }
        html.push_str("</div>");
    }

    html.push_str("</div>");
    html
}

pub fn render_scanner_row(row: &ScannerRow) -> String {
    let class = if row.is_positive() {
        "scanner-row positive"
    } else {
        "scanner-row"
    };
    let status = if row.status.trim().is_empty() {
        row.tier().label().to_string()
    } else {
        row.status.clone()
    };
    format!(
        "<div class=\"{class}\"><div class=\"market-name\">{}</div>\
         <div class=\"market-data\"><span class=\"tag-odd\">{}</span>\
         <span class=\"tag-implied\">{}</span><span class=\"tag-prob\">{}</span>\
         <span class=\"tag-fair\">{}</span></div>\
         <div class=\"market-status\">{}</div></div>",
        escape_html(&row.name),
        escape_html(&row.odd_text()),
        escape_html(&row.odd_prob),
        escape_html(&row.prob_txt),
        escape_html(&row.fair_odd),
        escape_html(&status)
    )
}

fn render_matrix(matrix: &[Vec<f64>]) -> String {
    let window = matrix_window(matrix);
    let best = matrix_argmax(&window).map(|(h, a, _)| (h, a));
    let cols = window.iter().map(Vec::len).max().unwrap_or(0);

    let mut html = String::from("<table class=\"score-matrix\"><tr><th>H\\A</th>");
    for a in 0..cols {
        let _ = write!(html, "<th>{a}</th>");
    }
    html.push_str("</tr>");
    for (h, row) in window.iter().enumerate() {
        let _ = write!(html, "<tr><th>{h}</th>");
        for (a, p) in row.iter().enumerate() {
            let class = if best == Some((h, a)) { " class=\"best\"" } else { "" };
            let _ = write!(html, "<td{class}>{}</td>", format_percent(*p));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    if matrix_is_clipped(matrix) {
        let _ = write!(html, "<p class=\"matrix-note\">{}</p>", matrix_clip_note());
    }
    html
}

pub fn render_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{style}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape_html(title),
        style = STYLE
    )
}

pub fn export_file_name(home: &str, away: &str, date: &str) -> String {
    format!("prediction-{}-{}-{}.html", slug(home), slug(away), slug(date))
}

/// Writes the panel as a standalone page under `dir` and returns its path.
/// A result is named after the date it was predicted for; `browsed_date` only names error pages.
pub fn export_panel(panel: &ResultPanel, dir: &Path, browsed_date: &str) -> Result<PathBuf> {
    let (name, title) = match panel {
        ResultPanel::Ready(view) => (
            export_file_name(
                &view.request.home_team,
                &view.request.away_team,
                &view.request.date,
            ),
            format!("{} vs {}", view.request.home_team, view.request.away_team),
        ),
        ResultPanel::Failed(_) => (
            format!("prediction-error-{}.html", slug(browsed_date)),
            "Prediction error".to_string(),
        ),
        ResultPanel::Idle | ResultPanel::Loading => {
            return Err(anyhow::anyhow!("nothing to export yet"));
        }
    };

    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(name);
    let html = render_document(&title, &render_panel(panel));
    let tmp = path.with_extension("html.tmp");
    fs::write(&tmp, html).context("write html export")?;
    fs::rename(&tmp, &path).context("swap html export")?;
    tracing::info!(path = %path.display(), "exported prediction card");
    Ok(path)
}

fn slug(raw: &str) -> String {
    let mut out = String::new();
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "x".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{
        escape_html, export_file_name, export_panel, render_error_card, render_matrix,
        render_scanner_row,
    };
    use crate::model::{PredictRequest, Prediction, ScannerRow};
    use crate::state::{PredictionView, ResultPanel};

    fn ready_panel(date: &str) -> ResultPanel {
        ResultPanel::Ready(Box::new(PredictionView {
            request: PredictRequest {
                home_team: "Ajax".to_string(),
                away_team: "PSV".to_string(),
                division: Some("N1".to_string()),
                date: date.to_string(),
                odd_h: 2.1,
                odd_d: 3.4,
                odd_a: 3.2,
                odd_1x: None,
                odd_12: None,
                odd_x2: None,
            },
            prediction: Prediction::default(),
        }))
    }

    #[test]
    fn escapes_markup_and_quotes() {
        assert_eq!(
            escape_html(r#"<b>"Spurs" & 'Co'</b>"#),
            "&lt;b&gt;&quot;Spurs&quot; &amp; &#39;Co&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn error_card_never_injects_markup() {
        let html = render_error_card("Prediction failed: <script>x</script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn positive_rows_get_positive_class() {
        let row = ScannerRow {
            name: "DC 1X".to_string(),
            odd: Some(1.4),
            status: "💎 MUITO VALOR!".to_string(),
            ..ScannerRow::default()
        };
        let html = render_scanner_row(&row);
        assert!(html.starts_with("<div class=\"scanner-row positive\">"));
        assert!(html.contains("@1.40"));
    }

    #[test]
    fn export_names_are_slugged() {
        assert_eq!(
            export_file_name("Nott'm Forest", "Man City", "2026-10-19"),
            "prediction-nott-m-forest-man-city-2026-10-19.html"
        );
        assert_eq!(export_file_name("", "?", "d"), "prediction-x-x-d.html");
    }

    #[test]
    fn export_uses_the_predicted_date() {
        let dir = std::env::temp_dir().join(format!("xg_terminal_export_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let path = export_panel(&ready_panel("2026-10-19"), &dir, "2026-10-20").expect("export");
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("prediction-ajax-psv-2026-10-19.html")
        );
        let html = fs::read_to_string(&path).expect("exported page");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Ajax vs PSV</title>"));

        let err_path = export_panel(
            &ResultPanel::Failed("Prediction failed: boom".to_string()),
            &dir,
            "2026-10-20",
        )
        .expect("export error card");
        assert!(err_path.ends_with("prediction-error-2026-10-20.html"));

        assert!(export_panel(&ResultPanel::Loading, &dir, "2026-10-20").is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn best_cell_is_picked_inside_the_shown_window() {
        let mut matrix = vec![vec![0.01; 8]; 8];
        matrix[1][2] = 0.09;
        matrix[7][7] = 0.30;
        let html = render_matrix(&matrix);
        assert!(html.contains("<td class=\"best\">9.0%</td>"));
        assert!(!html.contains("30.0%"));
        assert!(html.contains("Showing 0-5 goals per side"));

        let small = render_matrix(&[vec![0.2, 0.1], vec![0.3, 0.05]]);
        assert!(small.contains("<td class=\"best\">30.0%</td>"));
        assert!(!small.contains("matrix-note"));
    }
}
