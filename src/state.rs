use std::collections::VecDeque;
use std::time::SystemTime;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};

use crate::form::{FormField, PredictionForm};
use crate::model::{Fixture, OddsQuote, PredictRequest, Prediction};

const MAX_LOGS: usize = 200;
const UNNAMED_LEAGUE: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Fixtures,
    Form,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixturesStatus {
    Idle,
    Loading,
    Ready,
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueGroup {
    pub league: String,
    /// Indices into `AppState::fixtures`, in API order.
    pub fixtures: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView {
    pub request: PredictRequest,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultPanel {
    Idle,
    Loading,
    Ready(Box<PredictionView>),
    Failed(String),
}

/// Latest request number issued per flow. Replies carrying an older number are stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSeq {
    pub fixtures: u64,
    pub odds: u64,
    pub predict: u64,
}

#[derive(Debug, Clone)]
pub enum Delta {
    Fixtures {
        seq: u64,
        date: NaiveDate,
        result: Result<Vec<Fixture>, String>,
    },
    Odds {
        seq: u64,
        fixture_id: String,
        result: Result<OddsQuote, String>,
    },
    Prediction {
        seq: u64,
        request: PredictRequest,
        result: Result<Prediction, String>,
    },
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchFixtures { seq: u64, date: NaiveDate },
    FetchOdds { seq: u64, fixture_id: String },
    Predict { seq: u64, request: PredictRequest },
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub date: NaiveDate,
    pub fixtures: Vec<Fixture>,
    pub groups: Vec<LeagueGroup>,
    pub fixtures_status: FixturesStatus,
    pub fixtures_cached_at: Option<SystemTime>,
    pub selected: usize,
    pub chosen: Option<Fixture>,
    pub form: PredictionForm,
    pub form_field: FormField,
    pub edit_buffer: Option<String>,
    pub focus: Focus,
    pub result: ResultPanel,
    /// First visible line of the results panel.
    pub result_scroll: u16,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub seq: RequestSeq,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(today_utc())
    }
}

impl AppState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            fixtures: Vec::new(),
            groups: Vec::new(),
            fixtures_status: FixturesStatus::Idle,
            fixtures_cached_at: None,
            selected: 0,
            chosen: None,
            form: PredictionForm::default(),
            form_field: FormField::HomeTeam,
            edit_buffer: None,
            focus: Focus::Fixtures,
            result: ResultPanel::Idle,
            result_scroll: 0,
            logs: VecDeque::new(),
            help_overlay: false,
            seq: RequestSeq::default(),
        }
    }

    pub fn request_fixtures(&mut self) -> ProviderCommand {
        self.seq.fixtures += 1;
        self.fixtures_status = FixturesStatus::Loading;
        ProviderCommand::FetchFixtures {
            seq: self.seq.fixtures,
            date: self.date,
        }
    }

    pub fn change_date(&mut self, date: NaiveDate) -> ProviderCommand {
        self.date = date;
        self.set_fixtures(Vec::new());
        self.fixtures_cached_at = None;
        self.request_fixtures()
    }

    pub fn shift_date(&mut self, days: i64) -> ProviderCommand {
        let date = self
            .date
            .checked_add_signed(ChronoDuration::days(days))
            .unwrap_or(self.date);
        self.change_date(date)
    }

    /// Shows a previously saved list while the fresh request is in flight.
    pub fn show_cached_fixtures(&mut self, fixtures: Vec<Fixture>, fetched_at: SystemTime) {
        if self.fixtures_status != FixturesStatus::Loading || fixtures.is_empty() {
            return;
        }
        self.set_fixtures(fixtures);
        self.fixtures_cached_at = Some(fetched_at);
    }

    pub fn fixtures_selectable(&self) -> bool {
        self.fixtures_status == FixturesStatus::Ready
    }

    pub fn display_order(&self) -> Vec<usize> {
        self.groups
            .iter()
            .flat_map(|g| g.fixtures.iter().copied())
            .collect()
    }

    pub fn selected_fixture(&self) -> Option<&Fixture> {
        let idx = *self.display_order().get(self.selected)?;
        self.fixtures.get(idx)
    }

    pub fn select_next(&mut self) {
        let total = self.fixtures.len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % total;
    }

    pub fn select_prev(&mut self) {
        let total = self.fixtures.len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        if self.selected == 0 {
            self.selected = total - 1;
        } else {
            self.selected -= 1;
        }
    }

    /// Fills the form from the highlighted fixture and asks for fresh odds when it has an id.
    pub fn choose_selected(&mut self) -> Option<ProviderCommand> {
        if !self.fixtures_selectable() {
            self.push_log("[INFO] Fixture list is not ready");
            return None;
        }
        let fixture = self.selected_fixture()?.clone();
        self.edit_buffer = None;
        self.form.fill_from_fixture(&fixture);
        self.push_log(format!("[INFO] Selected {}", fixture.label()));

        // Every pick supersedes odds still in flight for an earlier one.
        self.seq.odds += 1;
        let cmd = match fixture.id.as_ref() {
            Some(id) => Some(ProviderCommand::FetchOdds {
                seq: self.seq.odds,
                fixture_id: id.clone(),
            }),
            None => {
                self.push_log("[INFO] Fixture has no id, odds lookup skipped");
                None
            }
        };
        self.chosen = Some(fixture);
        cmd
    }

    pub fn submit(&mut self) -> Option<ProviderCommand> {
        self.commit_edit();
        match self.form.to_request(self.date) {
            Ok(request) => {
                self.seq.predict += 1;
                self.result = ResultPanel::Loading;
                self.result_scroll = 0;
                Some(ProviderCommand::Predict {
                    seq: self.seq.predict,
                    request,
                })
            }
            Err(err) => {
                self.result = ResultPanel::Failed(format!("Prediction failed: {err}"));
                self.result_scroll = 0;
                None
            }
        }
    }

    /// Moves the results panel by `lines`. `max_scroll` comes from the last draw.
    pub fn scroll_result(&mut self, lines: i32, max_scroll: u16) {
        let next = i64::from(self.result_scroll) + i64::from(lines);
        self.result_scroll = next.clamp(0, i64::from(max_scroll)) as u16;
    }

    pub fn toggle_focus(&mut self) {
        self.commit_edit();
        self.focus = match self.focus {
            Focus::Fixtures => Focus::Form,
            Focus::Form => Focus::Fixtures,
        };
    }

    pub fn field_next(&mut self) {
        self.commit_edit();
        self.form_field = self.form_field.next();
    }

    pub fn field_prev(&mut self) {
        self.commit_edit();
        self.form_field = self.form_field.prev();
    }

    pub fn is_editing(&self) -> bool {
        self.edit_buffer.is_some()
    }

    pub fn begin_edit(&mut self) {
        self.edit_buffer = Some(self.form.value(self.form_field).to_string());
    }

    pub fn edit_push(&mut self, c: char) {
        if let Some(buf) = self.edit_buffer.as_mut() {
            if self.form_field.is_price() && !(c.is_ascii_digit() || c == '.' || c == ',') {
                return;
            }
            buf.push(c);
        }
    }

    pub fn edit_pop(&mut self) {
        if let Some(buf) = self.edit_buffer.as_mut() {
            buf.pop();
        }
    }

    pub fn commit_edit(&mut self) {
        if let Some(buf) = self.edit_buffer.take() {
            self.form.set(self.form_field, buf);
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit_buffer = None;
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    fn set_fixtures(&mut self, fixtures: Vec<Fixture>) {
        self.groups = group_by_league(&fixtures);
        self.fixtures = fixtures;
        self.selected = 0;
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Fixtures { seq, date, result } => {
            if seq != state.seq.fixtures {
                tracing::debug!(seq, latest = state.seq.fixtures, "dropping stale fixtures reply");
                return;
            }
            state.fixtures_cached_at = None;
            match result {
                Ok(fixtures) if fixtures.is_empty() => {
                    state.set_fixtures(Vec::new());
                    state.fixtures_status = FixturesStatus::Empty;
                    state.push_log(format!("[INFO] No supported matches on {date}"));
                }
                Ok(fixtures) => {
                    let count = fixtures.len();
                    state.set_fixtures(fixtures);
                    state.fixtures_status = FixturesStatus::Ready;
                    state.push_log(format!(
                        "[INFO] {count} fixtures in {} leagues on {date}",
                        state.groups.len()
                    ));
                }
                Err(err) => {
                    state.set_fixtures(Vec::new());
                    state.push_log(format!("[WARN] Fixtures error: {err}"));
                    state.fixtures_status = FixturesStatus::Failed(err);
                }
            }
        }
        Delta::Odds {
            seq,
            fixture_id,
            result,
        } => {
            if seq != state.seq.odds {
                tracing::debug!(seq, latest = state.seq.odds, "dropping stale odds reply");
                return;
            }
            match result {
                Ok(quote) if quote.is_empty() => {
                    state.push_log(format!("[WARN] No prices quoted for fixture {fixture_id}"));
                }
                Ok(quote) => {
                    state.commit_edit();
                    let applied = state.form.apply_odds(&quote);
                    state.push_log(format!(
                        "[INFO] Odds updated ({applied} markets) for fixture {fixture_id}"
                    ));
                }
                Err(err) => {
                    state.push_log(format!("[WARN] Odds unavailable: {err}"));
                }
            }
        }
        Delta::Prediction {
            seq,
            request,
            result,
        } => {
            if seq != state.seq.predict {
                tracing::debug!(seq, latest = state.seq.predict, "dropping stale prediction");
                return;
            }
            state.result_scroll = 0;
            match result {
                Ok(prediction) => {
                    state.push_log(format!(
                        "[INFO] Prediction ready: {} vs {}",
                        request.home_team, request.away_team
                    ));
                    state.result = ResultPanel::Ready(Box::new(PredictionView {
                        request,
                        prediction,
                    }));
                }
                Err(err) => {
                    state.push_log(format!("[WARN] Prediction error: {err}"));
                    state.result = ResultPanel::Failed(format!("Prediction failed: {err}"));
                }
            }
        }
    }
}

/// Groups fixtures by league, keeping first-seen league order and API order inside a group.
pub fn group_by_league(fixtures: &[Fixture]) -> Vec<LeagueGroup> {
    let mut groups: Vec<LeagueGroup> = Vec::new();
    for (idx, fixture) in fixtures.iter().enumerate() {
        let league = match fixture.league.trim() {
            "" => UNNAMED_LEAGUE,
            name => name,
        };
        match groups.iter_mut().find(|g| g.league == league) {
            Some(group) => group.fixtures.push(idx),
            None => groups.push(LeagueGroup {
                league: league.to_string(),
                fixtures: vec![idx],
            }),
        }
    }
    groups
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
