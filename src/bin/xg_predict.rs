use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};

use xg_terminal::config::{ClientConfig, parse_date};
use xg_terminal::form::{FormField, PredictionForm};
use xg_terminal::logging::init_stderr_logging;
use xg_terminal::model::{Fixture, format_price};
use xg_terminal::prediction_api::{HttpBackend, PredictionBackend};
use xg_terminal::render_html::{render_document, render_result_card};
use xg_terminal::report::prediction_lines;
use xg_terminal::state::{PredictionView, group_by_league, today_utc};

#[derive(Debug, clap::Parser, Clone)]
#[command(about = "Request a single match prediction from the xG API")]
struct Args {
    /// match date (YYYY-MM-DD), defaults to XG_DATE or today (UTC)
    #[clap(short, long, value_parser = parse_date_arg)]
    date: Option<NaiveDate>,

    /// list the supported fixtures for the date and exit
    #[clap(short, long)]
    list: bool,

    /// pick the first fixture whose "Home vs Away" label contains this text
    #[clap(short = 'm', long = "match")]
    match_text: Option<String>,

    /// pick the fixture with this id
    #[clap(long)]
    fixture_id: Option<String>,

    /// override the division code sent with the prediction
    #[clap(long)]
    division: Option<String>,

    /// override the home win price
    #[clap(long)]
    odd_h: Option<f64>,

    /// override the draw price
    #[clap(long)]
    odd_d: Option<f64>,

    /// override the away win price
    #[clap(long)]
    odd_a: Option<f64>,

    /// also write the result card as an HTML page
    #[clap(long)]
    html: Option<PathBuf>,
}

impl Args {
    fn validate(&self) -> Result<()> {
        if !self.list && self.match_text.is_none() && self.fixture_id.is_none() {
            return Err(anyhow!("one of --list, --match or --fixture-id is required"));
        }
        Ok(())
    }
}

fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    parse_date(s).ok_or_else(|| anyhow!("expected YYYY-MM-DD, got {s}"))
}

fn main() -> Result<()> {
    let cfg = ClientConfig::load();
    if let Err(err) = init_stderr_logging() {
        eprintln!("{err:#}");
    }

    let args = Args::parse();
    args.validate()?;
    let date = args.date.or(cfg.start_date).unwrap_or_else(today_utc);
    let backend = HttpBackend::new(cfg);

    let fixtures = backend
        .fixtures(date)
        .with_context(|| format!("fixtures for {date}"))?;
    if args.list {
        print_fixtures(&fixtures);
        return Ok(());
    }

    let fixture = pick_fixture(&fixtures, &args)?;
    info!(fixture = %fixture.label(), "fixture selected");

    let mut form = PredictionForm::default();
    form.fill_from_fixture(fixture);
    if let Some(id) = fixture.id.as_deref() {
        match backend.odds(id) {
            Ok(quote) => {
                form.apply_odds(&quote);
            }
            Err(err) => warn!("odds unavailable: {err:#}"),
        }
    }
    apply_overrides(&mut form, &args);

    let request = form.to_request(date)?;
    let prediction = backend
        .predict(&request)
        .map_err(|err| anyhow!("Prediction failed: {err:#}"))?;
    let view = PredictionView {
        request,
        prediction,
    };

    for line in prediction_lines(&view) {
        println!("{}", line.text);
    }

    if let Some(path) = args.html.as_ref() {
        let title = format!("{} vs {}", view.request.home_team, view.request.away_team);
        let html = render_document(&title, &render_result_card(&view));
        std::fs::write(path, html).with_context(|| format!("write {}", path.display()))?;
        println!("HTML: {}", path.display());
    }
    Ok(())
}

fn print_fixtures(fixtures: &[Fixture]) {
    if fixtures.is_empty() {
        println!("No supported matches on this date");
        return;
    }
    for group in group_by_league(fixtures) {
        println!("{}", group.league);
        for idx in group.fixtures {
            let Some(f) = fixtures.get(idx) else {
                continue;
            };
            println!(
                "  {:>5}  {:<40} {:<4} id={}",
                f.match_time,
                f.label(),
                f.division,
                f.id.as_deref().unwrap_or("-")
            );
        }
    }
}

fn pick_fixture<'a>(fixtures: &'a [Fixture], args: &Args) -> Result<&'a Fixture> {
    if let Some(id) = args.fixture_id.as_deref() {
        return fixtures
            .iter()
            .find(|f| f.id.as_deref() == Some(id.trim()))
            .ok_or_else(|| anyhow!("no fixture with id {id}"));
    }
    let needle = args
        .match_text
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();
    fixtures
        .iter()
        .find(|f| f.label().to_lowercase().contains(&needle))
        .ok_or_else(|| anyhow!("no fixture matching '{needle}'"))
}

fn apply_overrides(form: &mut PredictionForm, args: &Args) {
    if let Some(division) = args.division.as_deref() {
        form.set(FormField::Division, division);
    }
    let prices = [
        (FormField::OddHome, args.odd_h),
        (FormField::OddDraw, args.odd_d),
        (FormField::OddAway, args.odd_a),
    ];
    for (field, price) in prices {
        if let Some(price) = price {
            form.set(field, format_price(price));
        }
    }
}
