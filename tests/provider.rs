use std::sync::Mutex;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;

use xg_terminal::model::{Fixture, OddsQuote, PredictRequest, Prediction};
use xg_terminal::persist::FixtureCache;
use xg_terminal::prediction_api::PredictionBackend;
use xg_terminal::provider::{handle_command, spawn_provider};
use xg_terminal::state::{Delta, ProviderCommand};

#[derive(Default)]
struct StubBackend {
    fixtures: Vec<Fixture>,
    odds_error: Option<String>,
    seen_requests: Mutex<Vec<PredictRequest>>,
}

impl PredictionBackend for StubBackend {
    fn fixtures(&self, _date: NaiveDate) -> Result<Vec<Fixture>> {
        Ok(self.fixtures.clone())
    }

    fn odds(&self, fixture_id: &str) -> Result<OddsQuote> {
        if let Some(msg) = &self.odds_error {
            return Err(anyhow!(msg.clone()).context(format!("odds for {fixture_id}")));
        }
        Ok(OddsQuote {
            odd_h: Some(2.1),
            ..OddsQuote::default()
        })
    }

    fn predict(&self, request: &PredictRequest) -> Result<Prediction> {
        if let Ok(mut seen) = self.seen_requests.lock() {
            seen.push(request.clone());
        }
        Ok(Prediction {
            home: request.home_team.clone(),
            away: request.away_team.clone(),
            ..Prediction::default()
        })
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("date")
}

fn request() -> PredictRequest {
    PredictRequest {
        home_team: "Celtic".to_string(),
        away_team: "Rangers".to_string(),
        division: Some("SC0".to_string()),
        date: "2026-10-19".to_string(),
        odd_h: 1.9,
        odd_d: 3.5,
        odd_a: 3.9,
        odd_1x: None,
        odd_12: None,
        odd_x2: None,
    }
}

#[test]
fn odds_errors_keep_context_chain() {
    let backend = StubBackend {
        odds_error: Some("Odds indisponíveis".to_string()),
        ..StubBackend::default()
    };
    let delta = handle_command(
        &backend,
        None,
        ProviderCommand::FetchOdds {
            seq: 4,
            fixture_id: "55".to_string(),
        },
    );
    let Delta::Odds {
        seq,
        fixture_id,
        result,
    } = delta
    else {
        panic!("expected odds delta");
    };
    assert_eq!(seq, 4);
    assert_eq!(fixture_id, "55");
    assert_eq!(result, Err("odds for 55: Odds indisponíveis".to_string()));
}

#[test]
fn fetched_fixtures_are_cached() {
    let dir = std::env::temp_dir().join(format!("xg_terminal_provider_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let cache = FixtureCache::at(dir.join("fixtures.json"));
    let backend = StubBackend {
        fixtures: vec![Fixture {
            id: Some("8".to_string()),
            home_team: "Celtic".to_string(),
            away_team: "Rangers".to_string(),
            league: "Premiership".to_string(),
            ..Fixture::default()
        }],
        ..StubBackend::default()
    };

    let delta = handle_command(
        &backend,
        Some(&cache),
        ProviderCommand::FetchFixtures { seq: 1, date: day() },
    );
    assert!(matches!(delta, Delta::Fixtures { result: Ok(ref rows), .. } if rows.len() == 1));

    let (cached, _) = cache.load(day()).expect("cached list");
    assert_eq!(cached[0].home_team, "Celtic");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn worker_answers_commands_in_order() {
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let handle = spawn_provider(StubBackend::default(), None, tx, cmd_rx);

    cmd_tx
        .send(ProviderCommand::FetchFixtures { seq: 1, date: day() })
        .expect("send");
    cmd_tx
        .send(ProviderCommand::Predict {
            seq: 1,
            request: request(),
        })
        .expect("send");
    drop(cmd_tx);

    let first = rx.recv_timeout(Duration::from_secs(5)).expect("fixtures delta");
    assert!(matches!(first, Delta::Fixtures { result: Ok(ref rows), .. } if rows.is_empty()));

    let second = rx.recv_timeout(Duration::from_secs(5)).expect("prediction delta");
    let Delta::Prediction { request, result, .. } = second else {
        panic!("expected prediction delta");
    };
    assert_eq!(request.home_team, "Celtic");
    assert_eq!(result.map(|p| p.away), Ok("Rangers".to_string()));

    handle.join().expect("provider thread");
}
