mod tui_app;

use std::io;
use std::time::Duration;

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
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tui_app::{
    format_brier, format_date, format_gap, format_generator, format_outcome, format_probability,
    truncate, AppState, ConnectionStatus,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url =
        std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:8000/api".to_string());

    // Summaries can take as long as the server's generator timeout.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut forecast_table_state = TableState::default();
    forecast_table_state.select(None);

    let result = run_loop(&mut terminal, &mut app, &client, &mut forecast_table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    table_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(2);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.forecasts.len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state
                                .selected()
                                .map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                        }
                        KeyCode::Char('y') | KeyCode::Char('n') => {
                            if let Some(i) = table_state.selected() {
                                let outcome = key.code == KeyCode::Char('y');
                                app.resolve(client, i, outcome).await;
                                last_tick = std::time::Instant::now();
                            }
                        }
                        KeyCode::Char('s') | KeyCode::Char('S') => {
                            app.message = Some("requesting summary…".to_string());
                            terminal.draw(|f| render(f, app, table_state))?;
                            app.fetch_summary(client).await;
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | body | summary | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(5), // summary / message
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, table_state, chunks[1]);
    render_summary(f, app, chunks[2]);
    render_footer(f, chunks[3]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let brier_color = app.stats.brier_score.map_or(Color::DarkGray, |b| {
        if b <= 0.1 {
            Color::Green
        } else if b <= 0.25 {
            Color::Yellow
        } else {
            Color::Red
        }
    });

    let h = &app.health;
    let generator_color = match (h.narrator_configured, h.summaries_failed, h.summaries_timed_out) {
        (Some(true), Some(0) | None, Some(0) | None) => Color::Green,
        (Some(true), _, _) => Color::Yellow,
        _ => Color::DarkGray,
    };

    let title_spans = vec![
        Span::styled(
            " calibr8  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} forecasts", app.stats.total_predictions),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{} resolved", app.stats.resolved_predictions),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  Brier "),
        Span::styled(format_brier(app.stats.brier_score), Style::default().fg(brier_color)),
        Span::raw("  │  summaries ok/failed/timeout "),
        Span::styled(format_generator(&app.health), Style::default().fg(generator_color)),
    ];

    let header_line = Line::from(title_spans);
    let paragraph = Paragraph::new(header_line)
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, table_state: &mut TableState, area: Rect) {
    // Horizontal split: forecasts (60%) | calibration (40%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_forecasts_table(f, app, table_state, halves[0]);
    render_bins_table(f, app, halves[1]);
}

fn render_forecasts_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["Created", "Forecast", "Conf", "Result"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .forecasts
        .iter()
        .map(|fc| {
            let outcome = format_outcome(fc);
            let outcome_color = match outcome {
                "yes" => Color::Green,
                "no" => Color::Red,
                _ => Color::DarkGray,
            };

            Row::new(vec![
                Cell::from(format_date(&fc.created_at)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&fc.description, 48)),
                Cell::from(format_probability(fc.probability)).style(Style::default().fg(Color::Cyan)),
                Cell::from(outcome).style(Style::default().fg(outcome_color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Min(10),
            Constraint::Length(5),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " FORECASTS ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_bins_table(f: &mut Frame, app: &AppState, area: Rect) {
    let header_cells = ["Range", "N", "Stated", "Actual", "Gap"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .stats
        .calibration_bins
        .iter()
        .map(|b| {
            let gap = b.actual_frequency - b.avg_predicted;
            let gap_color = if gap.abs() <= 10.0 {
                Color::Green
            } else if gap.abs() <= 25.0 {
                Color::Yellow
            } else {
                Color::Red
            };

            Row::new(vec![
                Cell::from(b.range.clone()),
                Cell::from(b.count.to_string()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(format!("{:.0}%", b.avg_predicted)),
                Cell::from(format!("{:.0}%", b.actual_frequency)).style(Style::default().fg(Color::Cyan)),
                Cell::from(format_gap(b)).style(Style::default().fg(gap_color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Length(4),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " CALIBRATION ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(table, area);
}

fn render_summary(f: &mut Frame, app: &AppState, area: Rect) {
    let (text, color) = match (&app.message, &app.summary) {
        (Some(msg), _) => (msg.clone(), Color::Yellow),
        (None, Some(summary)) => (summary.clone(), Color::White),
        (None, None) => ("press [s] for a written summary".to_string(), Color::DarkGray),
    };

    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" SUMMARY "),
        );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("select  "),
        Span::styled("[y/n] ", Style::default().fg(Color::Yellow)),
        Span::raw("resolve  "),
        Span::styled("[s] ", Style::default().fg(Color::Yellow)),
        Span::raw("summary  "),
        Span::styled("auto-refresh: 2s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
