use crate::model::{ScannerRow, format_percent};
use crate::state::{PredictionView, ResultPanel};

/// Goals shown per side in the score matrix (0..=5).
pub const MATRIX_GOALS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Heading,
    Highlight,
    Positive,
    Muted,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub text: String,
    pub tone: Tone,
}

impl ReportLine {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

pub fn panel_lines(panel: &ResultPanel) -> Vec<ReportLine> {
    match panel {
        ResultPanel::Idle => vec![ReportLine::new(
            "Pick a fixture, check the form and press p",
            Tone::Muted,
        )],
        ResultPanel::Loading => vec![ReportLine::new("Analysing the match...", Tone::Muted)],
        ResultPanel::Failed(msg) => vec![ReportLine::new(msg.clone(), Tone::Error)],
        ResultPanel::Ready(view) => prediction_lines(view),
    }
}

pub fn prediction_lines(view: &PredictionView) -> Vec<ReportLine> {
    let req = &view.request;
    let pred = &view.prediction;
    let mut lines = Vec::new();

    let division = req.division.as_deref().unwrap_or("-");
    lines.push(ReportLine::new(
        format!("{} vs {}  [{}]", req.home_team, req.away_team, division),
        Tone::Heading,
    ));

    match pred.most_likely() {
        Some(score) if score.prob.is_empty() => {
            lines.push(ReportLine::new(format!("Main pick: {}", score.label), Tone::Highlight));
        }
        Some(score) => lines.push(ReportLine::new(
            format!("Main pick: {} ({})", score.label, score.prob),
            Tone::Highlight,
        )),
        None => lines.push(ReportLine::new("Main pick: -", Tone::Muted)),
    }
    lines.push(ReportLine::new(
        format!(
            "xG home {}  |  xG away {}",
            or_dash(&pred.xg.home),
            or_dash(&pred.xg.away)
        ),
        Tone::Plain,
    ));

    if !pred.matrix.is_empty() {
        lines.push(ReportLine::new("", Tone::Plain));
        lines.push(ReportLine::new("Score matrix (home rows, away cols)", Tone::Heading));
        lines.extend(matrix_lines(&pred.matrix));
    }

    lines.push(ReportLine::new("", Tone::Plain));
    lines.push(ReportLine::new("Market scanner", Tone::Heading));
    if pred.scanner.is_empty() {
        lines.push(ReportLine::new("No markets scanned", Tone::Muted));
    }
    for row in &pred.scanner {
        let tone = if row.is_positive() {
            Tone::Positive
        } else {
            Tone::Plain
        };
        lines.push(ReportLine::new(scanner_line(row), tone));
    }

    if let Some(row) = &pred.rational {
        lines.push(ReportLine::new("", Tone::Plain));
        lines.push(ReportLine::new(
            format!("Rational pick: {} {}", row.name, row.odd_text()),
            Tone::Highlight,
        ));
    }
    if let Some(row) = &pred.safe {
        if pred.rational.is_none() {
            lines.push(ReportLine::new("", Tone::Plain));
        }
        lines.push(ReportLine::new(
            format!("Safe pick: {} {} ({})", row.name, row.odd_text(), or_dash(&row.prob_txt)),
            Tone::Highlight,
        ));
    }
    lines
}

pub fn scanner_line(row: &ScannerRow) -> String {
    let status = if row.status.trim().is_empty() {
        row.tier().label().to_string()
    } else {
        row.status.trim().to_string()
    };
    // Status sits next to the name so it survives a narrow panel.
    format!(
        "{:<20} {:<15} {:>6} imp {} p {} fair {}",
        row.name,
        status,
        row.odd_text(),
        or_dash(&row.odd_prob),
        or_dash(&row.prob_txt),
        or_dash(&row.fair_odd)
    )
}

/// The top-left window of the matrix that both the terminal and HTML views show.
pub fn matrix_window(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    matrix
        .iter()
        .take(MATRIX_GOALS)
        .map(|row| row.iter().take(MATRIX_GOALS).copied().collect())
        .collect()
}

pub fn matrix_is_clipped(matrix: &[Vec<f64>]) -> bool {
    matrix.len() > MATRIX_GOALS || matrix.iter().any(|row| row.len() > MATRIX_GOALS)
}

pub fn matrix_clip_note() -> String {
    format!("Showing 0-{} goals per side", MATRIX_GOALS - 1)
}

fn matrix_lines(matrix: &[Vec<f64>]) -> Vec<ReportLine> {
    let window = matrix_window(matrix);
    let cols = window.iter().map(Vec::len).max().unwrap_or(0);
    let mut header = String::from("     ");
    for a in 0..cols {
        header.push_str(&format!("{a:>6}"));
    }
    let mut lines = vec![ReportLine::new(header, Tone::Muted)];
    for (h, row) in window.iter().enumerate() {
        let mut text = format!("{h:>3}  ");
        for p in row {
            text.push_str(&format!("{:>6}", format_percent(*p)));
        }
        lines.push(ReportLine::new(text, Tone::Plain));
    }
    if matrix_is_clipped(matrix) {
        lines.push(ReportLine::new(matrix_clip_note(), Tone::Muted));
    }
    lines
}

fn or_dash(raw: &str) -> &str {
    if raw.trim().is_empty() { "-" } else { raw }
}
