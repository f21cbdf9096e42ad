mod tui_app;

use std::io;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use handicapper_leaderboard::config::{Config, CHANNEL_CAPACITY};
use handicapper_leaderboard::fetcher::build_client;
use handicapper_leaderboard::types::{ContestConfig, TimeWindow};
use tui_app::{
    format_age, format_money, format_record, format_remaining, truncate, AppState, ConnectionStatus,
    FetchDone,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    let contest = select_contest(&cfg)?;

    let client = build_client(Duration::from_secs(cfg.feed_timeout_secs)).map_err(io::Error::other)?;
    let (tx, mut rx) = mpsc::channel::<FetchDone>(CHANNEL_CAPACITY);

    let mut app = AppState::new(contest, cfg.default_window, Utc::now());
    app.start_fetch(&client, &tx);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();
    table_state.select(None);

    let refetch_every = Duration::from_secs(cfg.feed_refresh_interval_secs);
    let result = run_loop(&mut terminal, &mut app, &client, &tx, &mut rx, &mut table_state, refetch_every).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

/// TUI_CONTEST picks one contest by id; otherwise the first configured one.
fn select_contest(cfg: &Config) -> io::Result<ContestConfig> {
    let wanted = std::env::var("TUI_CONTEST").ok();
    let found = match wanted.as_deref() {
        Some(id) => cfg.contests.iter().find(|c| c.id == id),
        None => cfg.contests.first(),
    };
    found.cloned().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no contest {:?} configured", wanted.unwrap_or_default()),
        )
    })
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    tx: &mpsc::Sender<FetchDone>,
    rx: &mut mpsc::Receiver<FetchDone>,
    table_state: &mut TableState,
    refetch_every: Duration,
) -> io::Result<()> {
    let tick_rate = Duration::from_secs(1);
    let mut last_tick = Instant::now();
    let mut last_fetch = Instant::now();

    loop {
        while let Ok(done) = rx.try_recv() {
            app.on_fetch_done(done, Utc::now());
        }

        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = tick_rate.checked_sub(last_tick.elapsed()).unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.start_fetch(client, tx);
                            last_fetch = Instant::now();
                        }
                        KeyCode::Char('a') => app.select_window(TimeWindow::All, Utc::now()),
                        KeyCode::Char('d') => app.select_window(TimeWindow::Day, Utc::now()),
                        KeyCode::Char('w') => app.select_window(TimeWindow::Week, Utc::now()),
                        KeyCode::Char('m') => app.select_window(TimeWindow::Month, Utc::now()),
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.engine.leaderboard().entries.len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            // Day/Week/Month cutoffs move with the clock.
            app.tick(Utc::now());
            last_tick = Instant::now();
        }

        if last_fetch.elapsed() >= refetch_every {
            app.start_fetch(client, tx);
            last_fetch = Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(1), // window selector
            Constraint::Min(0),    // leaderboard
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_window_bar(f, app, chunks[1]);
    render_leaderboard(f, app, table_state, chunks[2]);
    render_footer(f, chunks[3]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● feed ok".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ loading".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let now = Utc::now();
    let remaining = format_remaining(app.contest.time_remaining(now));
    let remaining_color = if app.contest.has_ended(now) { Color::Red } else { Color::White };

    let mut spans = vec![
        Span::styled(
            format!(" {}  ", app.contest.contest_name),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
    ];
    if app.contest.sponsored {
        spans.push(Span::styled("[sponsored]  ", Style::default().fg(Color::Magenta)));
    }
    if let Some(price) = &app.contest.price {
        spans.push(Span::styled(format!("prize {price}"), Style::default().fg(Color::White)));
        spans.push(Span::raw("  │  "));
    }
    spans.extend([
        Span::styled(remaining, Style::default().fg(remaining_color)),
        Span::raw("  │  "),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(app.feed_label(), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format_age(app.last_refresh.map(|t| t.elapsed())),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    if app.in_flight > 0 {
        spans.push(Span::styled("  (fetching…)", Style::default().fg(Color::DarkGray)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));

    f.render_widget(paragraph, area);
}

fn render_window_bar(f: &mut Frame, app: &AppState, area: Rect) {
    let selected = app.engine.window();
    let mut spans = vec![Span::raw(" ")];
    for w in TimeWindow::SELECTABLE {
        let style = if w == selected {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", w.label()), style));
        spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_leaderboard(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["#", "Handicapper", "Won Odds", "Record", "Potential Wins", "Research Tools"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let board = app.engine.leaderboard();
    let rows: Vec<Row> = board
        .entries
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let rank_color = match i {
                0 => Color::Yellow,
                1 => Color::White,
                2 => Color::LightRed,
                _ => Color::DarkGray,
            };
            let won_color = if h.total_won_odds > 0 { Color::Green } else { Color::White };
            let ratio_color = if h.win_ratio >= 50.0 { Color::Green } else { Color::Red };

            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(rank_color)),
                Cell::from(truncate(&h.username, 20)),
                Cell::from(h.total_won_odds.to_string()).style(Style::default().fg(won_color)),
                Cell::from(format_record(h.number_of_bets_won, h.number_of_bets, h.win_ratio))
                    .style(Style::default().fg(ratio_color)),
                Cell::from(format_money(h.potential_wins)).style(Style::default().fg(Color::Cyan)),
                Cell::from(truncate(&h.research_tools.join(", "), 30))
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let skipped = board.skipped.pending + board.skipped.malformed();
    let title = format!(" LEADERBOARD · {} handicappers · {} skipped ", board.entries.len(), skipped);

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(12),
            Constraint::Length(9),
            Constraint::Length(20),
            Constraint::Length(15),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
    )
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    f.render_stateful_widget(table, area, state);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refetch  "),
        Span::styled("[a d w m] ", Style::default().fg(Color::Yellow)),
        Span::raw("all / day / week / month  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("scroll"),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
