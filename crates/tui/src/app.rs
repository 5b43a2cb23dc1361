use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{error, info};
use transport_inputs_core::{
    client::{BackendClient, RunResponse},
    error::TransportFailure,
    models::{CarbonBudget, FuelKind, Scenario, COUNTRIES, TOTAL_LABEL, YEARS},
    session::InputSession,
    tables::{ACTIVITY_BOUNDS, FUEL_SHARE_BOUNDS, TOTAL_TOLERANCE},
};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 12;
const MAX_RESPONSES: usize = 20;
const MAX_RESPONSE_LINES: usize = 40;
const ACTIVITY_LABEL: &str = "Transport km (% of 2020)";
/// Activity row followed by one row per fuel.
const GRID_ROWS: usize = 1 + FuelKind::ALL.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Main,
    Transport,
    Outputs,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Main, Tab::Transport, Tab::Outputs];

    fn title(self) -> &'static str {
        match self {
            Tab::Main => "Main input",
            Tab::Transport => "Transport input",
            Tab::Outputs => "Outputs",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    fn step(self, delta: isize) -> Tab {
        let len = Tab::ALL.len() as isize;
        let next = (self.index() as isize + delta).rem_euclid(len);
        Tab::ALL[next as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MainField {
    Country,
    Scenario,
    CarbonBudget,
    RunMode,
}

impl MainField {
    const ALL: [MainField; 4] = [
        MainField::Country,
        MainField::Scenario,
        MainField::CarbonBudget,
        MainField::RunMode,
    ];

    fn label(self) -> &'static str {
        match self {
            MainField::Country => "Country",
            MainField::Scenario => "Scenario",
            MainField::CarbonBudget => "Carbon budget",
            MainField::RunMode => "Run mode",
        }
    }
}

/// What `r` sends: the full model run, or the plain greeting endpoint of a
/// simplified backend that no longer serves `/v1/run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Model,
    Hello,
}

impl RunMode {
    const ALL: [RunMode; 2] = [RunMode::Model, RunMode::Hello];

    fn label(self) -> &'static str {
        match self {
            RunMode::Model => "POST /v1/run",
            RunMode::Hello => "GET /v1/hello",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Probe {
    Root,
    Ping,
    Hello,
}

impl Probe {
    fn label(self) -> &'static str {
        match self {
            Probe::Root => "GET /",
            Probe::Ping => "GET /v1/ping",
            Probe::Hello => "GET /v1/hello",
        }
    }
}

enum BackendEvent {
    Run(Result<RunResponse, TransportFailure>),
    Probe(Probe, Result<String, TransportFailure>),
}

enum AppEvent {
    Input(Event),
    Tick,
    Backend(BackendEvent),
}

struct ResponseEntry {
    at: DateTime<Local>,
    title: String,
    ok: bool,
    lines: Vec<String>,
}

/// Terminal front end dispatching edits into one [`InputSession`].
pub struct TransportInputsApp {
    session: InputSession,
    client: BackendClient,
    tab: Tab,
    main_field: usize,
    run_mode: RunMode,
    grid_row: usize,
    grid_col: usize,
    editor: Option<String>,
    pending_requests: usize,
    responses: Vec<ResponseEntry>,
    status: String,
    should_quit: bool,
    event_tx: Option<mpsc::Sender<AppEvent>>,
}

impl TransportInputsApp {
    pub fn new(session: InputSession, client: BackendClient) -> Self {
        Self {
            session,
            client,
            tab: Tab::Main,
            main_field: 0,
            run_mode: RunMode::Model,
            grid_row: 0,
            grid_col: 0,
            editor: None,
            pending_requests: 0,
            responses: Vec::new(),
            status: "Ready".to_string(),
            should_quit: false,
            event_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.set_status(format!("Backend: {}", self.client.base_url()));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        let result: Result<()> = loop {
            if let Err(err) = terminal.draw(|frame| self.draw(frame)) {
                break Err(err.into());
            }
            if self.should_quit {
                break Ok(());
            }
            match event_rx.recv().await {
                Some(event) => self.process_app_event(event),
                None => break Ok(()),
            }
        };

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        result
    }

    fn process_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                self.handle_key(key);
            }
            AppEvent::Input(_) | AppEvent::Tick => {}
            AppEvent::Backend(event) => self.handle_backend_event(event),
        }
    }

    fn handle_backend_event(&mut self, event: BackendEvent) {
        self.pending_requests = self.pending_requests.saturating_sub(1);
        match event {
            BackendEvent::Run(Ok(response)) => {
                info!("model run succeeded");
                let lines = match response.raw_text() {
                    Some(text) => text.lines().map(str::to_string).collect(),
                    None => serde_json::to_string_pretty(response.body())
                        .unwrap_or_else(|_| response.body().to_string())
                        .lines()
                        .map(str::to_string)
                        .collect(),
                };
                self.push_response("POST /v1/run".to_string(), true, lines);
                self.set_status("Backend call OK".to_string());
            }
            BackendEvent::Run(Err(err)) => {
                error!(error = %err, "model run failed");
                self.push_response("POST /v1/run".to_string(), false, vec![err.to_string()]);
                self.set_status(failure_status(&err));
            }
            BackendEvent::Probe(probe, Ok(text)) => {
                self.push_response(probe.label().to_string(), true, vec![text.clone()]);
                self.set_status(format!("{}: {text}", probe.label()));
            }
            BackendEvent::Probe(probe, Err(err)) => {
                error!(probe = probe.label(), error = %err, "probe failed");
                self.push_response(probe.label().to_string(), false, vec![err.to_string()]);
                self.set_status(failure_status(&err));
            }
        }
    }

    fn push_response(&mut self, title: String, ok: bool, mut lines: Vec<String>) {
        if lines.len() > MAX_RESPONSE_LINES {
            let hidden = lines.len() - MAX_RESPONSE_LINES;
            lines.truncate(MAX_RESPONSE_LINES);
            lines.push(format!("... {hidden} more lines"));
        }
        self.responses.insert(
            0,
            ResponseEntry {
                at: Local::now(),
                title,
                ok,
                lines,
            },
        );
        self.responses.truncate(MAX_RESPONSES);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.editor.is_some() {
            self.handle_editor_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Tab => {
                self.tab = self.tab.step(1);
                return;
            }
            KeyCode::BackTab => {
                self.tab = self.tab.step(-1);
                return;
            }
            KeyCode::Char('r') => {
                self.run_model();
                return;
            }
            _ => {}
        }
        match self.tab {
            Tab::Main => self.handle_main_key(key),
            Tab::Transport => self.handle_transport_key(key),
            Tab::Outputs => {
                if key.code == KeyCode::Char('c') {
                    self.responses.clear();
                    self.set_status("Response log cleared".to_string());
                }
            }
        }
    }

    fn handle_main_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.main_field = self.main_field.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.main_field = (self.main_field + 1).min(MainField::ALL.len() - 1);
            }
            KeyCode::Left | KeyCode::Char('h') => self.cycle_main_field(-1),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter => self.cycle_main_field(1),
            KeyCode::Char('1') => self.submit_probe(Probe::Root),
            KeyCode::Char('2') => self.submit_probe(Probe::Ping),
            KeyCode::Char('3') => self.submit_probe(Probe::Hello),
            _ => {}
        }
    }

    fn cycle_main_field(&mut self, delta: isize) {
        let field = MainField::ALL[self.main_field];
        if field == MainField::RunMode {
            let current = RunMode::ALL
                .iter()
                .position(|mode| *mode == self.run_mode)
                .unwrap_or(0);
            self.run_mode = RunMode::ALL[cycle(current, delta, RunMode::ALL.len())];
            self.set_status(format!("Run model sends {}", self.run_mode.label()));
            return;
        }
        let selection = &mut self.session.selection;
        match field {
            MainField::Country => {
                let current = COUNTRIES
                    .iter()
                    .position(|name| *name == selection.country)
                    .unwrap_or(0);
                selection.country = COUNTRIES[cycle(current, delta, COUNTRIES.len())].to_string();
            }
            MainField::Scenario => {
                let current = Scenario::ALL
                    .iter()
                    .position(|value| *value == selection.scenario)
                    .unwrap_or(0);
                selection.scenario = Scenario::ALL[cycle(current, delta, Scenario::ALL.len())];
            }
            MainField::CarbonBudget => {
                let current = CarbonBudget::ALL
                    .iter()
                    .position(|value| *value == selection.carbon_budget)
                    .unwrap_or(0);
                selection.carbon_budget =
                    CarbonBudget::ALL[cycle(current, delta, CarbonBudget::ALL.len())];
            }
            MainField::RunMode => {}
        }
    }

    fn handle_transport_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.grid_row = self.grid_row.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.grid_row = (self.grid_row + 1).min(GRID_ROWS - 1)
            }
            KeyCode::Left | KeyCode::Char('h') => self.grid_col = self.grid_col.saturating_sub(1),
            KeyCode::Right | KeyCode::Char('l') => {
                self.grid_col = (self.grid_col + 1).min(YEARS.len() - 1)
            }
            KeyCode::Enter => {
                let current = self.current_cell_value().map(format_number).unwrap_or_default();
                self.editor = Some(current);
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() || ch == '.' => {
                self.editor = Some(ch.to_string());
            }
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let Some(buffer) = self.editor.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.editor = None;
                self.set_status("Edit cancelled".to_string());
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(ch) if (ch.is_ascii_digit() || ch == '.') && buffer.len() < MAX_INPUT_LEN => {
                if ch != '.' || !buffer.contains('.') {
                    buffer.push(ch);
                }
            }
            KeyCode::Enter => {
                if let Some(buffer) = self.editor.take() {
                    self.commit_edit(&buffer);
                }
            }
            _ => {}
        }
    }

    fn current_cell_value(&self) -> Option<f64> {
        let year = YEARS[self.grid_col];
        let tables = self.session.tables();
        match self.grid_row {
            0 => tables.activity().value(year),
            row => tables.fuel().share(year, FuelKind::ALL[row - 1]),
        }
    }

    fn commit_edit(&mut self, buffer: &str) {
        let value = match buffer.trim().parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                self.set_status(format!("'{buffer}' is not a number"));
                return;
            }
        };
        let year = YEARS[self.grid_col];
        let bounds = if self.grid_row == 0 {
            ACTIVITY_BOUNDS
        } else {
            FUEL_SHARE_BOUNDS
        };
        // The editor enforces column bounds before dispatch; the core rejects anything outside.
        let clamped = value.clamp(bounds.0, bounds.1);

        let tables = self.session.tables_mut();
        let result = match self.grid_row {
            0 => tables.apply_activity_edit(year.value(), clamped),
            row => tables.apply_fuel_edit(year.value(), FuelKind::ALL[row - 1], clamped),
        };
        match result {
            Err(err) => self.set_status(format!("Edit rejected: {err}")),
            Ok(()) => {
                let mut message = if clamped != value {
                    format!("{year}: {} clamped to {}", format_number(value), format_number(clamped))
                } else {
                    format!("{year}: set to {}", format_number(clamped))
                };
                if let Some(warning) = self.session.validate().warning() {
                    message.push_str(" • ");
                    message.push_str(&warning);
                }
                self.set_status(message);
            }
        }
    }

    fn run_model(&mut self) {
        match self.run_mode {
            RunMode::Model => self.submit_run(),
            RunMode::Hello => self.submit_probe(Probe::Hello),
        }
    }

    fn submit_run(&mut self) {
        let payload = match self.session.build_payload() {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "payload build failed");
                self.set_status(format!("Cannot submit: {err}"));
                return;
            }
        };
        let warning = self.session.validate().warning();
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let client = self.client.clone();
        self.pending_requests += 1;
        spawn(async move {
            let result = client.run(&payload).await;
            let _ = tx.send(AppEvent::Backend(BackendEvent::Run(result))).await;
        });
        match warning {
            Some(warning) => self.set_status(format!("Submitting model run • {warning}")),
            None => self.set_status("Submitting model run".to_string()),
        }
    }

    fn submit_probe(&mut self, probe: Probe) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let client = self.client.clone();
        self.pending_requests += 1;
        spawn(async move {
            let result = match probe {
                Probe::Root => client.root().await,
                Probe::Ping => client.ping().await,
                Probe::Hello => client.hello().await,
            };
            let _ = tx
                .send(AppEvent::Backend(BackendEvent::Probe(probe, result)))
                .await;
        });
        self.set_status(format!("{} ...", probe.label()));
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(4),
            ])
            .split(frame.size());

        let tabs = Tabs::new(Tab::ALL.iter().map(|tab| tab.title()).collect::<Vec<_>>())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Country & Transport Inputs"),
            )
            .select(self.tab.index())
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, chunks[0]);

        match self.tab {
            Tab::Main => self.render_main(frame, chunks[1]),
            Tab::Transport => self.render_transport(frame, chunks[1]),
            Tab::Outputs => self.render_outputs(frame, chunks[1]),
        }
        self.render_status(frame, chunks[2]);
    }

    fn render_main(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(4)])
            .split(area);

        let selection = &self.session.selection;
        let lines: Vec<Line> = MainField::ALL
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let value = match field {
                    MainField::Country => selection.country.clone(),
                    MainField::Scenario => selection.scenario.to_string(),
                    MainField::CarbonBudget => selection.carbon_budget.to_string(),
                    MainField::RunMode => self.run_mode.label().to_string(),
                };
                let style = if idx == self.main_field {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::raw(format!("{:<15}", field.label())),
                    Span::styled(format!("◀ {value} ▶"), style),
                ])
            })
            .collect();
        let selectors = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Main input"));
        frame.render_widget(selectors, chunks[0]);

        let help = vec![
            Line::from("↑/↓ select field   ←/→ change value   r run model"),
            Line::from("1 GET /   2 GET /v1/ping   3 GET /v1/hello   Tab switch tabs   q quit"),
            Line::from(""),
            Line::from(format!("Backend: {}", self.client.base_url())),
        ];
        let help = Paragraph::new(help)
            .block(Block::default().borders(Borders::ALL).title("Backend"))
            .wrap(Wrap { trim: true });
        frame.render_widget(help, chunks[1]);
    }

    fn render_transport(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(9), Constraint::Length(4)])
            .split(area);

        let tables = self.session.tables();
        let mut grid: Vec<(String, Vec<Option<f64>>)> = vec![(
            ACTIVITY_LABEL.to_string(),
            tables
                .activity()
                .reindexed()
                .into_iter()
                .map(|(_, value)| value)
                .collect(),
        )];
        grid.extend(
            tables
                .fuel()
                .wide_rows()
                .into_iter()
                .map(|row| (row.label, row.values)),
        );

        let rows: Vec<Row> = grid
            .iter()
            .enumerate()
            .map(|(row_idx, (label, values))| {
                let is_total = label == TOTAL_LABEL;
                let mut cells = vec![Cell::from(label.clone())];
                for (col_idx, value) in values.iter().enumerate() {
                    let selected = row_idx == self.grid_row && col_idx == self.grid_col;
                    let text = match (&self.editor, selected) {
                        (Some(buffer), true) => format!("{buffer}_"),
                        _ => value.map(format_number).unwrap_or_else(|| "—".to_string()),
                    };
                    let mut style = Style::default();
                    if is_total {
                        let off = value
                            .map(|total| (total - 100.0).abs() > TOTAL_TOLERANCE)
                            .unwrap_or(true);
                        style = if off {
                            style.fg(Color::Yellow).add_modifier(Modifier::BOLD)
                        } else {
                            style.fg(Color::Green)
                        };
                    }
                    if selected {
                        style = style.bg(Color::Cyan).fg(Color::Black);
                    }
                    cells.push(Cell::from(text).style(style));
                }
                Row::new(cells)
            })
            .collect();

        let header = Row::new(
            std::iter::once("Year".to_string()).chain(YEARS.iter().map(|year| year.to_string())),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));
        let widths = std::iter::once(Constraint::Length(26))
            .chain(YEARS.iter().map(|_| Constraint::Length(9)));
        let table = Table::new(rows, widths).header(header).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Transport km and fuel mix by year"),
        );
        frame.render_widget(table, chunks[0]);

        let report = self.session.validate();
        let check = match report.warning() {
            Some(warning) => Line::from(Span::styled(warning, Style::default().fg(Color::Yellow))),
            None => Line::from(Span::styled(
                "Fuel shares sum to 100% in every year",
                Style::default().fg(Color::Green),
            )),
        };
        let help = Paragraph::new(vec![
            check,
            Line::from("arrows move   type or Enter to edit   Enter apply   Esc cancel"),
        ])
        .block(Block::default().borders(Borders::ALL).title("Check"))
        .wrap(Wrap { trim: true });
        frame.render_widget(help, chunks[1]);
    }

    fn render_outputs(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);

        let selection = &self.session.selection;
        let tables = self.session.tables();
        let mut lines = vec![
            Line::from(format!("Country:       {}", selection.country)),
            Line::from(format!("Scenario:      {}", selection.scenario)),
            Line::from(format!("Carbon budget: {}", selection.carbon_budget)),
            Line::from(""),
            Line::from(Span::styled(
                ACTIVITY_LABEL,
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        for (year, value) in tables.activity().reindexed() {
            lines.push(Line::from(format!(
                "  {year}: {}",
                value.map(format_number).unwrap_or_else(|| "—".to_string())
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Fuel mix with totals",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for row in tables.fuel().wide_rows() {
            let values = row
                .values
                .iter()
                .map(|value| value.map(format_number).unwrap_or_else(|| "—".to_string()))
                .collect::<Vec<_>>()
                .join(" / ");
            lines.push(Line::from(format!("  {:<13} {values}", row.label)));
        }
        let echo = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Results (echo of inputs)"))
            .wrap(Wrap { trim: false });
        frame.render_widget(echo, chunks[0]);

        let mut log: Vec<Line> = Vec::new();
        if self.responses.is_empty() {
            log.push(Line::from("No backend responses yet. Press r to run the model."));
        }
        for entry in &self.responses {
            let color = if entry.ok { Color::Green } else { Color::Red };
            log.push(Line::from(Span::styled(
                format!("{} {}", entry.at.format("%H:%M:%S"), entry.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            log.extend(entry.lines.iter().map(|line| Line::from(line.clone())));
            log.push(Line::from(""));
        }
        let log = Paragraph::new(log)
            .block(Block::default().borders(Borders::ALL).title("Backend responses (c clears)"))
            .wrap(Wrap { trim: false });
        frame.render_widget(log, chunks[1]);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let secondary = if self.pending_requests > 0 {
            format!("Requests in flight: {}", self.pending_requests)
        } else {
            "Tab switch tabs • r run model • q quit".to_string()
        };
        let paragraph = Paragraph::new(vec![Line::from(self.status.clone()), Line::from(secondary)])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn failure_status(err: &TransportFailure) -> String {
    if err.is_timeout() {
        format!("Request timed out: {err}")
    } else {
        format!("Request failed: {err}")
    }
}

fn cycle(current: usize, delta: isize, len: usize) -> usize {
    (current as isize + delta).rem_euclid(len as isize) as usize
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.3}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport_inputs_core::AppConfig;

    fn app() -> TransportInputsApp {
        let client = BackendClient::new(&AppConfig::default()).expect("client");
        TransportInputsApp::new(InputSession::new(), client)
    }

    /// App whose backend address refuses connections.
    fn offline_app() -> TransportInputsApp {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        let config = AppConfig {
            api_url: format!("http://{addr}"),
            ..AppConfig::default()
        };
        let client = BackendClient::new(&config).expect("client");
        TransportInputsApp::new(InputSession::new(), client)
    }

    fn press(app: &mut TransportInputsApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut TransportInputsApp, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(33.3333), "33.333");
    }

    #[test]
    fn editing_a_fuel_cell_dispatches_to_the_session() {
        let mut app = app();
        app.tab = Tab::Transport;
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        type_text(&mut app, "60");
        press(&mut app, KeyCode::Enter);

        let year = YEARS[2];
        assert_eq!(
            app.session.tables().fuel().share(year, FuelKind::Gasoline),
            Some(60.0)
        );
        assert!(app.status.contains("do not sum to 100%"));
    }

    #[test]
    fn out_of_range_input_is_clamped_before_dispatch() {
        let mut app = app();
        app.tab = Tab::Transport;
        press(&mut app, KeyCode::Down);
        type_text(&mut app, "150");
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.session.tables().fuel().share(YEARS[0], FuelKind::Gasoline),
            Some(100.0)
        );
        assert!(app.status.contains("clamped"));
    }

    #[test]
    fn escape_discards_pending_edit() {
        let mut app = app();
        app.tab = Tab::Transport;
        type_text(&mut app, "55");
        press(&mut app, KeyCode::Esc);
        assert!(app.editor.is_none());
        assert_eq!(app.session.tables().activity().value(YEARS[0]), Some(100.0));
    }

    #[test]
    fn main_tab_cycles_selection() {
        let mut app = app();
        press(&mut app, KeyCode::Right);
        assert_eq!(app.session.selection.country, "China");
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.session.selection.country, "South Africa");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.session.selection.scenario, Scenario::Iea);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.session.selection.carbon_budget, CarbonBudget::OnePointSix);
    }

    #[test]
    fn run_failures_are_logged_verbatim() {
        let mut app = app();
        app.pending_requests = 1;
        let err = TransportFailure::Status {
            url: "http://127.0.0.1:8000/v1/run".to_string(),
            status: 500,
            body: "boom".to_string(),
        };
        app.handle_backend_event(BackendEvent::Run(Err(err)));
        assert_eq!(app.pending_requests, 0);
        assert_eq!(app.responses.len(), 1);
        assert!(!app.responses[0].ok);
        assert!(app.responses[0].lines[0].contains("HTTP 500: boom"));
        assert!(app.status.starts_with("Request failed: "));
    }

    #[tokio::test]
    async fn hello_run_mode_sends_the_greeting_request() {
        let mut app = offline_app();
        let (tx, mut rx) = mpsc::channel(4);
        app.event_tx = Some(tx);

        for _ in 0..MainField::ALL.len() {
            press(&mut app, KeyCode::Down);
        }
        press(&mut app, KeyCode::Right);
        assert_eq!(app.run_mode, RunMode::Hello);
        assert_eq!(app.session.selection.carbon_budget, CarbonBudget::OnePointFive);

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.pending_requests, 1);
        assert_eq!(app.status, "GET /v1/hello ...");
        match rx.recv().await {
            Some(AppEvent::Backend(BackendEvent::Probe(probe, result))) => {
                assert!(matches!(probe, Probe::Hello));
                assert!(result.is_err());
            }
            _ => panic!("expected the hello probe to report back"),
        }

        press(&mut app, KeyCode::Left);
        assert_eq!(app.run_mode, RunMode::Model);
    }
}
