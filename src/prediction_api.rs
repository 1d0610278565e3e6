use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::http_client::http_client;
use crate::model::{
    Fixture, OddsQuote, PredictRequest, Prediction, api_error_from_body, parse_fixtures_json,
    parse_odds_json, parse_prediction_json,
};

const FIXTURES_PATH: &str = "/api/fixtures";
const ODDS_PATH: &str = "/api/odds";
const PREDICT_PATH: &str = "/api/predict";

/// The three round-trips the client makes. Implemented over HTTP by [`HttpBackend`].
pub trait PredictionBackend {
    fn fixtures(&self, date: NaiveDate) -> Result<Vec<Fixture>>;
    fn odds(&self, fixture_id: &str) -> Result<OddsQuote>;
    fn predict(&self, request: &PredictRequest) -> Result<Prediction>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    cfg: ClientConfig,
}

impl HttpBackend {
    pub fn new(cfg: ClientConfig) -> Self {
        Self { cfg }
    }
}

impl PredictionBackend for HttpBackend {
    fn fixtures(&self, date: NaiveDate) -> Result<Vec<Fixture>> {
        fetch_fixtures(&self.cfg, date)
    }

    fn odds(&self, fixture_id: &str) -> Result<OddsQuote> {
        fetch_odds(&self.cfg, fixture_id)
    }

    fn predict(&self, request: &PredictRequest) -> Result<Prediction> {
        request_prediction(&self.cfg, request)
    }
}

pub fn fetch_fixtures(cfg: &ClientConfig, date: NaiveDate) -> Result<Vec<Fixture>> {
    let date = date.format("%Y-%m-%d").to_string();
    info!(%date, "requesting fixtures");
    let (status, body) = post_json(cfg, FIXTURES_PATH, &json!({ "date": date }))
        .context("fixtures request failed")?;
    if !status.is_success() {
        return Err(http_failure(status, &body));
    }
    let fixtures = parse_fixtures_json(&body)?;
    info!(%date, count = fixtures.len(), "fixtures received");
    Ok(fixtures)
}

pub fn fetch_odds(cfg: &ClientConfig, fixture_id: &str) -> Result<OddsQuote> {
    info!(fixture_id, "requesting odds");
    let body = json!({ "fixture_id": fixture_id_value(fixture_id) });
    let (status, body) = post_json(cfg, ODDS_PATH, &body).context("odds request failed")?;
    if !status.is_success() {
        return Err(http_failure(status, &body));
    }
    parse_odds_json(&body)
}

pub fn request_prediction(cfg: &ClientConfig, request: &PredictRequest) -> Result<Prediction> {
    info!(
        home = %request.home_team,
        away = %request.away_team,
        "requesting prediction"
    );
    let (status, body) =
        post_json(cfg, PREDICT_PATH, request).context("prediction request failed")?;
    if !status.is_success() {
        return Err(http_failure(status, &body));
    }
    parse_prediction_json(&body)
}

fn post_json<T: Serialize + ?Sized>(
    cfg: &ClientConfig,
    path: &str,
    payload: &T,
) -> Result<(StatusCode, String)> {
    let url = cfg.endpoint(path);
    let client = http_client(cfg.timeout_secs)?;
    debug!(%url, "POST");
    let resp = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .json(payload)
        .send()
        .with_context(|| format!("POST {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        warn!(%url, %status, "api returned an error status");
    }
    Ok((status, body))
}

/// Builds the error for a non-2xx reply, preferring the API's own `error` message.
pub fn http_failure(status: StatusCode, body: &str) -> anyhow::Error {
    if let Some(msg) = api_error_from_body(body) {
        return anyhow!(msg);
    }
    let snippet = body_snippet(body);
    if snippet.is_empty() {
        return anyhow!("server error (http {})", status.as_u16());
    }
    anyhow!("http {}: {}", status, snippet)
}

fn body_snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(220)
        .collect::<String>()
}

/// The API keys fixtures by numeric id; keep numbers numeric on the wire.
fn fixture_id_value(fixture_id: &str) -> Value {
    let trimmed = fixture_id.trim();
    match trimmed.parse::<u64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(trimmed),
    }
}
