use std::io;
use std::sync::mpsc;
use std::time::{Duration, SystemTime};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use xg_terminal::config::ClientConfig;
use xg_terminal::form::FormField;
use xg_terminal::logging::init_file_logging;
use xg_terminal::persist::FixtureCache;
use xg_terminal::prediction_api::HttpBackend;
use xg_terminal::provider::spawn_provider;
use xg_terminal::render_html::export_panel;
use xg_terminal::report::{Tone, panel_lines};
use xg_terminal::state::{
    self, AppState, FixturesStatus, Focus, ProviderCommand, ResultPanel, apply_delta, today_utc,
};

const RESULT_PAGE: i32 = 5;

struct App {
    state: AppState,
    cfg: ClientConfig,
    cache: Option<FixtureCache>,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    /// Furthest the results panel can scroll at the last drawn size.
    result_max_scroll: u16,
}

impl App {
    fn new(
        cfg: ClientConfig,
        cache: Option<FixtureCache>,
        cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    ) -> Self {
        let date = cfg.start_date.unwrap_or_else(today_utc);
        Self {
            state: AppState::new(date),
            cfg,
            cache,
            should_quit: false,
            cmd_tx,
            result_max_scroll: 0,
        }
    }

    fn dispatch(&mut self, cmd: ProviderCommand) {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Network worker unavailable");
            return;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Request could not be queued");
        }
    }

    fn load_fixtures(&mut self) {
        let cmd = self.state.request_fixtures();
        self.show_cached();
        self.dispatch(cmd);
    }

    fn change_date(&mut self, cmd: ProviderCommand) {
        self.show_cached();
        self.dispatch(cmd);
    }

    fn show_cached(&mut self) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Some((fixtures, fetched_at)) = cache.load(self.state.date) {
            self.state.show_cached_fixtures(fixtures, fetched_at);
        }
    }

    fn export(&mut self) {
        let date = self.state.date.format("%Y-%m-%d").to_string();
        match export_panel(&self.state.result, &self.cfg.export_dir, &date) {
            Ok(path) => self
                .state
                .push_log(format!("[INFO] Exported {}", path.display())),
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.is_editing() {
            match key.code {
                KeyCode::Enter => self.state.commit_edit(),
                KeyCode::Esc => self.state.cancel_edit(),
                KeyCode::Backspace => self.state.edit_pop(),
                KeyCode::Tab => self.state.field_next(),
                KeyCode::Char(c) => self.state.edit_push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            KeyCode::Tab => self.state.toggle_focus(),
            KeyCode::Char('[') | KeyCode::Left => {
                let cmd = self.state.shift_date(-1);
                self.change_date(cmd);
            }
            KeyCode::Char(']') | KeyCode::Right => {
                let cmd = self.state.shift_date(1);
                self.change_date(cmd);
            }
            KeyCode::Char('t') => {
                let cmd = self.state.change_date(today_utc());
                self.change_date(cmd);
            }
            KeyCode::Char('r') => self.load_fixtures(),
            KeyCode::Char('p') => {
                if let Some(cmd) = self.state.submit() {
                    self.dispatch(cmd);
                }
            }
            KeyCode::Char('x') => self.export(),
            KeyCode::PageDown | KeyCode::Char('J') => {
                self.state.scroll_result(RESULT_PAGE, self.result_max_scroll)
            }
            KeyCode::PageUp | KeyCode::Char('K') => {
                self.state.scroll_result(-RESULT_PAGE, self.result_max_scroll)
            }
            KeyCode::Char('j') | KeyCode::Down => match self.state.focus {
                Focus::Fixtures => self.state.select_next(),
                Focus::Form => self.state.field_next(),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.state.focus {
                Focus::Fixtures => self.state.select_prev(),
                Focus::Form => self.state.field_prev(),
            },
            KeyCode::Enter => match self.state.focus {
                Focus::Fixtures => {
                    if let Some(cmd) = self.state.choose_selected() {
                        self.dispatch(cmd);
                    }
                }
                Focus::Form => self.state.begin_edit(),
            },
            _ => {}
        }
    }
}

fn main() -> io::Result<()> {
    let cfg = ClientConfig::load();
    let log_note = match cfg.log_file.as_deref() {
        Some(path) => match init_file_logging(path) {
            Ok(()) => format!("[INFO] Logging to {}", path.display()),
            Err(err) => format!("[WARN] {err:#}"),
        },
        None => "[INFO] No log file configured".to_string(),
    };
    let cache = if cfg.cache_enabled {
        FixtureCache::open_default()
    } else {
        None
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(HttpBackend::new(cfg.clone()), cache.clone(), tx, cmd_rx);

    let mut app = App::new(cfg, cache, Some(cmd_tx));
    app.state.push_log(log_note);
    app.state
        .push_log(format!("[INFO] API {}", app.cfg.api_base));
    app.load_fixtures();
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(200);

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, &mut *app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(8),
            Constraint::Length(6),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(40),
            Constraint::Length(32),
            Constraint::Min(40),
        ])
        .split(chunks[1]);

    render_fixtures(frame, columns[0], &app.state);
    render_form(frame, columns[1], &app.state);
    app.result_max_scroll = render_result(frame, columns[2], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let state = &app.state;
    format!(
        " XG TERMINAL | {} | {} | API {}",
        state.date.format("%a %Y-%m-%d"),
        fixtures_status_label(&state.fixtures_status),
        app.cfg.api_base
    )
}

fn footer_text(state: &AppState) -> String {
    if state.is_editing() {
        return " Enter Save | Esc Cancel | Tab Save+Next field".to_string();
    }
    match state.focus {
        Focus::Fixtures => {
            " [/] Day | t Today | r Reload | j/k Move | Enter Pick | Tab Form | p Predict | J/K Result | x Export | ? Help | q Quit"
                .to_string()
        }
        Focus::Form => {
            " j/k Field | Enter Edit | Tab Fixtures | p Predict | J/K Result | x Export | ? Help | q Quit"
                .to_string()
        }
    }
}

fn fixtures_status_label(status: &FixturesStatus) -> &'static str {
    match status {
        FixturesStatus::Idle => "IDLE",
        FixturesStatus::Loading => "LOADING",
        FixturesStatus::Ready => "READY",
        FixturesStatus::Empty => "NO MATCHES",
        FixturesStatus::Failed(_) => "ERROR",
    }
}

fn panel_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(style)
}

fn render_fixtures(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("Fixtures", state.focus == Focus::Fixtures);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    let dim = Style::default().fg(Color::DarkGray);
    match &state.fixtures_status {
        FixturesStatus::Loading => {
            let note = match state.fixtures_cached_at {
                Some(at) => format!("Loading fixtures... (showing cache, {})", cache_age(at)),
                None => "Loading fixtures...".to_string(),
            };
            lines.push(Line::from(Span::styled(note, dim)));
        }
        FixturesStatus::Empty => {
            lines.push(Line::from(Span::styled(
                "No supported matches on this date",
                Style::default().fg(Color::Yellow),
            )));
        }
        FixturesStatus::Failed(err) => {
            lines.push(Line::from(Span::styled(
                format!("Error: {err}"),
                Style::default().fg(Color::Red),
            )));
        }
        FixturesStatus::Idle | FixturesStatus::Ready => {}
    }

    let selectable = state.fixtures_selectable();
    let mut selected_line = 0usize;
    let mut position = 0usize;
    for group in &state.groups {
        lines.push(Line::from(Span::styled(
            group.league.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for idx in &group.fixtures {
            let Some(fixture) = state.fixtures.get(*idx) else {
                continue;
            };
            let is_selected = position == state.selected;
            let prefix = if is_selected { "> " } else { "  " };
            let time = if fixture.match_time.is_empty() {
                "--:--"
            } else {
                fixture.match_time.as_str()
            };
            let text = format!("{prefix}{time} {}", fixture.label());
            let style = if !selectable {
                dim
            } else if is_selected && state.focus == Focus::Fixtures {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            if is_selected {
                selected_line = lines.len();
            }
            lines.push(Line::from(Span::styled(text, style)));
            position += 1;
        }
    }

    let visible = inner.height as usize;
    let offset = selected_line.saturating_sub(visible / 2);
    let max_offset = lines.len().saturating_sub(visible);
    let offset = offset.min(max_offset) as u16;
    frame.render_widget(Paragraph::new(lines).scroll((offset, 0)), inner);
}

fn render_form(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("Prediction form", state.focus == Focus::Form);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    if let Some(fixture) = &state.chosen {
        let meta = [
            fixture.league.as_str(),
            fixture.match_time.as_str(),
            fixture.status.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" · ");
        lines.push(Line::from(Span::styled(
            meta,
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
    }

    for field in FormField::ALL {
        let current = field == state.form_field && state.focus == Focus::Form;
        let value = match (&state.edit_buffer, current) {
            (Some(buf), true) => format!("{buf}_"),
            _ => state.form.value(field).to_string(),
        };
        let style = if current {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{:<9}: {}", field.label(), value),
            style,
        )));
        if field == FormField::Division || field == FormField::OddAway {
            lines.push(Line::from(""));
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Draws the results panel and returns how far it can scroll at this size.
fn render_result(frame: &mut Frame, area: Rect, state: &AppState) -> u16 {
    let title = match &state.result {
        ResultPanel::Ready(_) => "Prediction (J/K scroll)",
        ResultPanel::Loading => "Prediction (loading)",
        ResultPanel::Failed(_) => "Prediction (error)",
        ResultPanel::Idle => "Prediction",
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    let lines = panel_lines(&state.result)
        .into_iter()
        .map(|line| Line::from(Span::styled(line.text, tone_style(line.tone))))
        .collect::<Vec<_>>();

    let width = usize::from(inner.width.max(1));
    let rows: usize = lines.iter().map(|l| l.width().max(1).div_ceil(width)).sum();
    let max_scroll = rows.saturating_sub(usize::from(inner.height));
    let max_scroll = u16::try_from(max_scroll).unwrap_or(u16::MAX);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.result_scroll.min(max_scroll), 0));
    frame.render_widget(paragraph, area);
    max_scroll
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Plain => Style::default(),
        Tone::Heading => Style::default().add_modifier(Modifier::BOLD),
        Tone::Highlight => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        Tone::Positive => Style::default().fg(Color::Green),
        Tone::Muted => Style::default().fg(Color::DarkGray),
        Tone::Error => Style::default().fg(Color::Red),
    }
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let start = state.logs.len().saturating_sub(4);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn cache_age(at: SystemTime) -> String {
    let secs = SystemTime::now()
        .duration_since(at)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if secs < 120 {
        format!("{secs}s old")
    } else if secs < 7200 {
        format!("{}m old", secs / 60)
    } else {
        format!("{}h old", secs / 3600)
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "XG Terminal - Help",
        "",
        "Date:",
        "  [ / ←        Previous day",
        "  ] / →        Next day",
        "  t            Today",
        "  r            Reload fixtures",
        "",
        "Fixtures:",
        "  j/k or ↑/↓   Move",
        "  Enter        Fill form and fetch odds",
        "",
        "Form:",
        "  j/k or ↑/↓   Move between fields",
        "  Enter        Edit field (Enter save, Esc cancel)",
        "",
        "Global:",
        "  Tab          Switch fixtures/form",
        "  p            Request prediction",
        "  J/K, PgDn/PgUp  Scroll the result",
        "  x            Export result as HTML",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
