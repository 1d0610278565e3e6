use anyhow::{Result, anyhow};
use chrono::NaiveDate;

use crate::model::{Fixture, OddsQuote, PredictRequest, format_price};

/// Stand-in 1X2 prices for fixtures listed without an odds snapshot.
pub const FALLBACK_ODD_HOME: f64 = 1.90;
pub const FALLBACK_ODD_DRAW: f64 = 3.20;
pub const FALLBACK_ODD_AWAY: f64 = 2.80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    HomeTeam,
    AwayTeam,
    Division,
    OddHome,
    OddDraw,
    OddAway,
    OddHomeDraw,
    OddHomeAway,
    OddDrawAway,
}

impl FormField {
    pub const ALL: [FormField; 9] = [
        FormField::HomeTeam,
        FormField::AwayTeam,
        FormField::Division,
        FormField::OddHome,
        FormField::OddDraw,
        FormField::OddAway,
        FormField::OddHomeDraw,
        FormField::OddHomeAway,
        FormField::OddDrawAway,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::HomeTeam => "Home",
            FormField::AwayTeam => "Away",
            FormField::Division => "Division",
            FormField::OddHome => "Odd 1",
            FormField::OddDraw => "Odd X",
            FormField::OddAway => "Odd 2",
            FormField::OddHomeDraw => "Odd 1X",
            FormField::OddHomeAway => "Odd 12",
            FormField::OddDrawAway => "Odd X2",
        }
    }

    pub fn is_price(self) -> bool {
        !matches!(
            self,
            FormField::HomeTeam | FormField::AwayTeam | FormField::Division
        )
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Text-valued form, the way the user sees and edits it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionForm {
    pub home_team: String,
    pub away_team: String,
    pub division: String,
    pub odd_h: String,
    pub odd_d: String,
    pub odd_a: String,
    pub odd_1x: String,
    pub odd_12: String,
    pub odd_x2: String,
}

impl PredictionForm {
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::HomeTeam => &self.home_team,
            FormField::AwayTeam => &self.away_team,
            FormField::Division => &self.division,
            FormField::OddHome => &self.odd_h,
            FormField::OddDraw => &self.odd_d,
            FormField::OddAway => &self.odd_a,
            FormField::OddHomeDraw => &self.odd_1x,
            FormField::OddHomeAway => &self.odd_12,
            FormField::OddDrawAway => &self.odd_x2,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::HomeTeam => self.home_team = value,
            FormField::AwayTeam => self.away_team = value,
            FormField::Division => self.division = value,
            FormField::OddHome => self.odd_h = value,
            FormField::OddDraw => self.odd_d = value,
            FormField::OddAway => self.odd_a = value,
            FormField::OddHomeDraw => self.odd_1x = value,
            FormField::OddHomeAway => self.odd_12 = value,
            FormField::OddDrawAway => self.odd_x2 = value,
        }
    }

    pub fn fill_from_fixture(&mut self, fixture: &Fixture) {
        let snapshot = fixture.odds.clone().unwrap_or_default();
        self.home_team = fixture.home_team.clone();
        self.away_team = fixture.away_team.clone();
        self.division = fixture.division.clone();
        self.odd_h = format_price(snapshot.h.unwrap_or(FALLBACK_ODD_HOME));
        self.odd_d = format_price(snapshot.d.unwrap_or(FALLBACK_ODD_DRAW));
        self.odd_a = format_price(snapshot.a.unwrap_or(FALLBACK_ODD_AWAY));
        self.odd_1x.clear();
        self.odd_12.clear();
        self.odd_x2.clear();
    }

    /// Overwrites every price the quote carries; unquoted markets keep their value.
    pub fn apply_odds(&mut self, quote: &OddsQuote) -> usize {
        let pairs = [
            (FormField::OddHome, quote.odd_h),
            (FormField::OddDraw, quote.odd_d),
            (FormField::OddAway, quote.odd_a),
            (FormField::OddHomeDraw, quote.odd_1x),
            (FormField::OddHomeAway, quote.odd_12),
            (FormField::OddDrawAway, quote.odd_x2),
        ];
        let mut applied = 0;
        for (field, price) in pairs {
            if let Some(price) = price {
                self.set(field, format_price(price));
                applied += 1;
            }
        }
        applied
    }

    pub fn to_request(&self, date: NaiveDate) -> Result<PredictRequest> {
        let home_team = self.home_team.trim();
        let away_team = self.away_team.trim();
        if home_team.is_empty() || away_team.is_empty() {
            return Err(anyhow!("home and away teams are required"));
        }
        let division = self.division.trim();

        Ok(PredictRequest {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            division: (!division.is_empty()).then(|| division.to_string()),
            date: date.format("%Y-%m-%d").to_string(),
            odd_h: required_price(FormField::OddHome, &self.odd_h)?,
            odd_d: required_price(FormField::OddDraw, &self.odd_d)?,
            odd_a: required_price(FormField::OddAway, &self.odd_a)?,
            odd_1x: optional_price(FormField::OddHomeDraw, &self.odd_1x)?,
            odd_12: optional_price(FormField::OddHomeAway, &self.odd_12)?,
            odd_x2: optional_price(FormField::OddDrawAway, &self.odd_x2)?,
        })
    }
}

fn required_price(field: FormField, raw: &str) -> Result<f64> {
    optional_price(field, raw)?.ok_or_else(|| anyhow!("{} is required", field.label()))
}

fn optional_price(field: FormField, raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let price = trimmed
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| anyhow!("{} is not a decimal price: {trimmed}", field.label()))?;
    if !price.is_finite() || price <= 1.0 {
        return Err(anyhow!("{} must be above 1.00", field.label()));
    }
    Ok(Some(price))
}
