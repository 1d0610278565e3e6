use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    #[serde(default, deserialize_with = "de_price")]
    pub h: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub d: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub a: Option<f64>,
}

/// A supported fixture as listed by `/api/fixtures`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default, alias = "home", deserialize_with = "de_text")]
    pub home_team: String,
    #[serde(default, alias = "away", deserialize_with = "de_text")]
    pub away_team: String,
    #[serde(default, alias = "league_name", deserialize_with = "de_text")]
    pub league: String,
    #[serde(default, alias = "div_code", deserialize_with = "de_text")]
    pub division: String,
    #[serde(default, deserialize_with = "de_text")]
    pub country: String,
    #[serde(default, deserialize_with = "de_text")]
    pub match_time: String,
    #[serde(default, alias = "status_short", deserialize_with = "de_text")]
    pub status: String,
    #[serde(default)]
    pub odds: Option<OddsSnapshot>,
}

impl Fixture {
    pub fn label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// Bookmaker prices for the 1X2 and double-chance markets. `None` means "not quoted".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OddsQuote {
    #[serde(default, deserialize_with = "de_price")]
    pub odd_h: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub odd_d: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub odd_a: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub odd_1x: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub odd_12: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub odd_x2: Option<f64>,
}

impl OddsQuote {
    pub fn is_empty(&self) -> bool {
        [
            self.odd_h,
            self.odd_d,
            self.odd_a,
            self.odd_1x,
            self.odd_12,
            self.odd_x2,
        ]
        .iter()
        .all(Option::is_none)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest {
    pub home_team: String,
    pub away_team: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    pub date: String,
    pub odd_h: f64,
    pub odd_d: f64,
    pub odd_a: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_1x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_12: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_x2: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExpectedGoals {
    #[serde(default, deserialize_with = "de_text")]
    pub home: String,
    #[serde(default, deserialize_with = "de_text")]
    pub away: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Scoreline {
    #[serde(default, alias = "placar", deserialize_with = "de_text")]
    pub label: String,
    #[serde(default, deserialize_with = "de_text")]
    pub prob: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScannerRow {
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_price")]
    pub odd: Option<f64>,
    #[serde(default, deserialize_with = "de_text")]
    pub odd_prob: String,
    #[serde(default, deserialize_with = "de_number")]
    pub prob_raw: Option<f64>,
    #[serde(default, alias = "prob", deserialize_with = "de_text")]
    pub prob_txt: String,
    #[serde(default, deserialize_with = "de_text")]
    pub fair_odd: String,
    #[serde(default, deserialize_with = "de_number")]
    pub ev: Option<f64>,
    #[serde(default, deserialize_with = "de_text")]
    pub status: String,
}

impl ScannerRow {
    pub fn tier(&self) -> ValueTier {
        ValueTier::from_status(&self.status)
            .or_else(|| self.ev.map(ValueTier::from_ev))
            .unwrap_or(ValueTier::Unknown)
    }

    pub fn is_positive(&self) -> bool {
        self.tier().is_positive()
    }

    pub fn odd_text(&self) -> String {
        self.odd
            .map(|odd| format!("@{odd:.2}"))
            .unwrap_or_else(|| "@-".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTier {
    StrongValue,
    Value,
    Fair,
    Weak,
    Unknown,
}

impl ValueTier {
    /// Reads the tier out of a status label; the API labels in Portuguese.
    pub fn from_status(status: &str) -> Option<Self> {
        let s = status.to_lowercase();
        if s.contains("muito valor") || s.contains("strong value") || s.contains("great value") {
            Some(Self::StrongValue)
        } else if s.contains("fraco") || s.contains("weak") || s.contains("poor") {
            Some(Self::Weak)
        } else if s.contains("justo") || s.contains("fair") {
            Some(Self::Fair)
        } else if s.contains("valor") || s.contains("value") {
            Some(Self::Value)
        } else {
            None
        }
    }

    pub fn from_ev(ev: f64) -> Self {
        if ev > 0.05 {
            Self::StrongValue
        } else if ev > 0.0 {
            Self::Value
        } else if ev > -0.05 {
            Self::Fair
        } else {
            Self::Weak
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Self::StrongValue | Self::Value)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StrongValue => "STRONG VALUE",
            Self::Value => "VALUE",
            Self::Fair => "FAIR",
            Self::Weak => "WEAK",
            Self::Unknown => "-",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Prediction {
    #[serde(default, deserialize_with = "de_text")]
    pub home: String,
    #[serde(default, deserialize_with = "de_text")]
    pub away: String,
    #[serde(default)]
    pub xg: ExpectedGoals,
    #[serde(default)]
    pub score: Option<Scoreline>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub most_likely_score: Option<String>,
    #[serde(default)]
    pub matrix: Vec<Vec<f64>>,
    #[serde(default, alias = "market_scanner")]
    pub scanner: Vec<ScannerRow>,
    #[serde(default)]
    pub rational: Option<ScannerRow>,
    #[serde(default)]
    pub safe: Option<ScannerRow>,
}

impl Prediction {
    /// The reported scoreline, falling back to the densest matrix cell.
    pub fn most_likely(&self) -> Option<Scoreline> {
        if let Some(score) = self.score.as_ref().filter(|s| !s.label.trim().is_empty()) {
            return Some(score.clone());
        }
        if let Some(label) = self
            .most_likely_score
            .as_ref()
            .filter(|s| !s.trim().is_empty())
        {
            return Some(Scoreline {
                label: label.clone(),
                prob: String::new(),
            });
        }
        let (h, a, p) = matrix_argmax(&self.matrix)?;
        Some(Scoreline {
            label: format!("{h} - {a}"),
            prob: format_percent(p),
        })
    }
}

/// First maximum in row-major order, as `(home_goals, away_goals, prob)`.
pub fn matrix_argmax(matrix: &[Vec<f64>]) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for (h, row) in matrix.iter().enumerate() {
        for (a, &p) in row.iter().enumerate() {
            if !p.is_finite() {
                continue;
            }
            match best {
                Some((_, _, bp)) if p <= bp => {}
                _ => best = Some((h, a, p)),
            }
        }
    }
    best
}

pub fn format_percent(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

pub fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>> {
    let Some(root) = parse_root(raw, "invalid fixtures json")? else {
        return Ok(Vec::new());
    };
    if let Some(msg) = api_error(&root) {
        return Err(anyhow!(msg));
    }
    serde_json::from_value(root).context("unexpected fixtures payload")
}

pub fn parse_odds_json(raw: &str) -> Result<OddsQuote> {
    let Some(root) = parse_root(raw, "invalid odds json")? else {
        return Err(anyhow!("empty odds response"));
    };
    if let Some(msg) = api_error(&root) {
        return Err(anyhow!(msg));
    }
    serde_json::from_value(root).context("unexpected odds payload")
}

pub fn parse_prediction_json(raw: &str) -> Result<Prediction> {
    let Some(root) = parse_root(raw, "invalid prediction json")? else {
        return Err(anyhow!("empty prediction response"));
    };
    if let Some(msg) = api_error(&root) {
        return Err(anyhow!(msg));
    }
    serde_json::from_value(root).context("unexpected prediction payload")
}

/// The API reports failures as `{"error": "..."}`, sometimes with a 200 status.
pub fn api_error(root: &Value) -> Option<String> {
    let err = root.as_object()?.get("error")?;
    match err {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

pub fn api_error_from_body(raw: &str) -> Option<String> {
    serde_json::from_str::<Value>(raw.trim())
        .ok()
        .as_ref()
        .and_then(api_error)
}

fn parse_root(raw: &str, what: &'static str) -> Result<Option<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    serde_json::from_str(trimmed).context(what).map(Some)
}

pub fn price_from_value(value: &Value) -> Option<f64> {
    let n = number_from_value(value)?;
    (n > 0.0).then_some(n)
}

fn number_from_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn de_price<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(price_from_value))
}

fn de_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn de_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(text_from_value).unwrap_or_default())
}

fn de_opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(text_from_value))
}

fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value
        .as_ref()
        .and_then(text_from_value)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
