use chrono::NaiveDate;

use xg_terminal::model::{Fixture, OddsQuote, OddsSnapshot, Prediction, Scoreline};
use xg_terminal::state::{
    AppState, Delta, FixturesStatus, Focus, ProviderCommand, ResultPanel, apply_delta,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("date")
}

fn fixture(id: Option<&str>, home: &str, away: &str, league: &str) -> Fixture {
    Fixture {
        id: id.map(str::to_string),
        home_team: home.to_string(),
        away_team: away.to_string(),
        league: league.to_string(),
        division: "E0".to_string(),
        ..Fixture::default()
    }
}

fn loaded_state() -> AppState {
    let mut state = AppState::new(day());
    let ProviderCommand::FetchFixtures { seq, date } = state.request_fixtures() else {
        panic!("expected fixtures command");
    };
    apply_delta(
        &mut state,
        Delta::Fixtures {
            seq,
            date,
            result: Ok(vec![
                fixture(Some("1"), "Arsenal", "Chelsea", "Premier League"),
                fixture(Some("2"), "Benfica", "Porto", "Primeira Liga"),
                fixture(None, "Brighton", "Wolves", "Premier League"),
            ]),
        },
    );
    state
}

#[test]
fn fixtures_reply_groups_and_enables_selection() {
    let state = loaded_state();
    assert_eq!(state.fixtures_status, FixturesStatus::Ready);
    assert_eq!(state.groups.len(), 2);
    assert_eq!(state.display_order(), vec![0, 2, 1]);
    assert!(state.fixtures_selectable());
}

#[test]
fn selection_walks_display_order() {
    let mut state = loaded_state();
    state.select_next();
    assert_eq!(
        state.selected_fixture().map(|f| f.home_team.as_str()),
        Some("Brighton")
    );
    state.select_next();
    state.select_next();
    assert_eq!(state.selected, 0);
    state.select_prev();
    assert_eq!(
        state.selected_fixture().map(|f| f.home_team.as_str()),
        Some("Benfica")
    );
}

#[test]
fn empty_and_failed_fixture_replies() {
    let mut state = AppState::new(day());
    let ProviderCommand::FetchFixtures { seq, date } = state.request_fixtures() else {
        panic!("expected fixtures command");
    };
    apply_delta(&mut state, Delta::Fixtures { seq, date, result: Ok(Vec::new()) });
    assert_eq!(state.fixtures_status, FixturesStatus::Empty);
    assert!(state.choose_selected().is_none());

    let ProviderCommand::FetchFixtures { seq, date } = state.request_fixtures() else {
        panic!("expected fixtures command");
    };
    apply_delta(
        &mut state,
        Delta::Fixtures {
            seq,
            date,
            result: Err("fixtures request failed: connection refused".to_string()),
        },
    );
    assert_eq!(
        state.fixtures_status,
        FixturesStatus::Failed("fixtures request failed: connection refused".to_string())
    );
    assert!(state.logs.iter().any(|l| l.starts_with("[WARN] Fixtures error")));
}

#[test]
fn stale_fixture_reply_is_ignored() {
    let mut state = AppState::new(day());
    let ProviderCommand::FetchFixtures { seq: first, date } = state.request_fixtures() else {
        panic!("expected fixtures command");
    };
    let _ = state.shift_date(1);

    apply_delta(
        &mut state,
        Delta::Fixtures {
            seq: first,
            date,
            result: Ok(vec![fixture(Some("1"), "Old", "Reply", "L")]),
        },
    );
    assert!(state.fixtures.is_empty());
    assert_eq!(state.fixtures_status, FixturesStatus::Loading);
}

#[test]
fn choosing_fixture_fills_form_and_requests_odds() {
    let mut state = loaded_state();
    let cmd = state.choose_selected().expect("odds command");
    let ProviderCommand::FetchOdds { seq, fixture_id } = cmd else {
        panic!("expected odds command");
    };
    assert_eq!(fixture_id, "1");
    assert_eq!(state.form.home_team, "Arsenal");
    assert_eq!(state.form.odd_h, "1.90");

    apply_delta(
        &mut state,
        Delta::Odds {
            seq,
            fixture_id,
            result: Ok(OddsQuote {
                odd_h: Some(1.85),
                odd_d: Some(3.6),
                odd_a: Some(4.2),
                odd_1x: Some(1.25),
                ..OddsQuote::default()
            }),
        },
    );
    assert_eq!(state.form.odd_h, "1.85");
    assert_eq!(state.form.odd_1x, "1.25");
    assert!(state.form.odd_12.is_empty());
}

#[test]
fn fixture_without_id_skips_odds() {
    let mut state = loaded_state();
    state.select_next();
    assert!(state.choose_selected().is_none());
    assert_eq!(state.form.home_team, "Brighton");
    assert!(state.logs.iter().any(|l| l.contains("odds lookup skipped")));
}

#[test]
fn snapshot_prices_fill_the_form() {
    let mut state = AppState::new(day());
    let ProviderCommand::FetchFixtures { seq, date } = state.request_fixtures() else {
        panic!("expected fixtures command");
    };
    let mut f = fixture(None, "Lazio", "Roma", "Serie A");
    f.odds = Some(OddsSnapshot {
        h: Some(2.45),
        d: None,
        a: Some(2.9),
    });
    apply_delta(&mut state, Delta::Fixtures { seq, date, result: Ok(vec![f]) });
    let _ = state.choose_selected();
    assert_eq!(state.form.odd_h, "2.45");
    assert_eq!(state.form.odd_d, "3.20");
    assert_eq!(state.form.odd_a, "2.90");
}

#[test]
fn odds_for_previous_pick_do_not_overwrite_form() {
    let mut state = loaded_state();
    let Some(ProviderCommand::FetchOdds { seq: old, .. }) = state.choose_selected() else {
        panic!("expected odds command");
    };
    state.select_prev();
    let _ = state.choose_selected();
    assert_eq!(state.form.home_team, "Benfica");

    apply_delta(
        &mut state,
        Delta::Odds {
            seq: old,
            fixture_id: "1".to_string(),
            result: Ok(OddsQuote {
                odd_h: Some(9.0),
                ..OddsQuote::default()
            }),
        },
    );
    assert_eq!(state.form.odd_h, "1.90");
}

#[test]
fn odds_for_previous_pick_do_not_reach_fixture_without_id() {
    let mut state = loaded_state();
    let Some(ProviderCommand::FetchOdds { seq: old, fixture_id }) = state.choose_selected() else {
        panic!("expected odds command");
    };
    state.select_next();
    assert!(state.choose_selected().is_none());
    assert_eq!(state.form.home_team, "Brighton");

    apply_delta(
        &mut state,
        Delta::Odds {
            seq: old,
            fixture_id,
            result: Ok(OddsQuote {
                odd_h: Some(9.0),
                odd_1x: Some(1.11),
                ..OddsQuote::default()
            }),
        },
    );
    assert_eq!(state.form.odd_h, "1.90");
    assert!(state.form.odd_1x.is_empty());
}

#[test]
fn odds_error_is_logged_and_form_kept() {
    let mut state = loaded_state();
    let Some(ProviderCommand::FetchOdds { seq, fixture_id }) = state.choose_selected() else {
        panic!("expected odds command");
    };
    apply_delta(
        &mut state,
        Delta::Odds {
            seq,
            fixture_id,
            result: Err("Odds indisponíveis".to_string()),
        },
    );
    assert_eq!(state.form.odd_h, "1.90");
    assert_eq!(
        state.logs.back().map(String::as_str),
        Some("[WARN] Odds unavailable: Odds indisponíveis")
    );
}

#[test]
fn submit_round_trip_sets_result_panel() {
    let mut state = loaded_state();
    let _ = state.choose_selected();
    let Some(ProviderCommand::Predict { seq, request }) = state.submit() else {
        panic!("expected predict command");
    };
    assert_eq!(state.result, ResultPanel::Loading);
    assert_eq!(request.home_team, "Arsenal");
    assert_eq!(request.date, "2026-10-19");

    let prediction = Prediction {
        score: Some(Scoreline {
            label: "1 - 0".to_string(),
            prob: "13.2%".to_string(),
        }),
        ..Prediction::default()
    };
    apply_delta(
        &mut state,
        Delta::Prediction {
            seq,
            request,
            result: Ok(prediction),
        },
    );
    let ResultPanel::Ready(view) = &state.result else {
        panic!("expected ready panel");
    };
    assert_eq!(view.request.away_team, "Chelsea");
}

#[test]
fn prediction_failures_become_error_panel() {
    let mut state = loaded_state();
    assert!(state.submit().is_none());
    assert_eq!(
        state.result,
        ResultPanel::Failed("Prediction failed: home and away teams are required".to_string())
    );

    let _ = state.choose_selected();
    let Some(ProviderCommand::Predict { seq, request }) = state.submit() else {
        panic!("expected predict command");
    };
    apply_delta(
        &mut state,
        Delta::Prediction {
            seq,
            request,
            result: Err("Modelos offline".to_string()),
        },
    );
    assert_eq!(
        state.result,
        ResultPanel::Failed("Prediction failed: Modelos offline".to_string())
    );
}

#[test]
fn submit_commits_pending_edit() {
    let mut state = loaded_state();
    let _ = state.choose_selected();
    state.toggle_focus();
    assert_eq!(state.focus, Focus::Form);
    state.begin_edit();
    for _ in 0..10 {
        state.edit_pop();
    }
    for c in "Spurs".chars() {
        state.edit_push(c);
    }
    let Some(ProviderCommand::Predict { request, .. }) = state.submit() else {
        panic!("expected predict command");
    };
    assert_eq!(request.home_team, "Spurs");
    assert!(!state.is_editing());
}
