use std::io;

use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset as ChartDataset, GraphType, Paragraph, Row,
        Table, TableState, Wrap,
    },
    Frame, Terminal,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bakery_forecast::config::Config;
use bakery_forecast::dashboard::{
    chart_data, error_label, format_date, format_units, truncate, AppState, DatasetStatus,
    InputMode, PredictionStatus,
};
use bakery_forecast::dataset::Dataset;
use bakery_forecast::error::AppError;
use bakery_forecast::pipeline::PredictionRun;
use bakery_forecast::types::PredictedValue;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    // stdout belongs to the terminal UI
    let log_file = std::fs::File::create(&cfg.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let dataset = match Dataset::load(&cfg.dataset_path) {
        Ok(ds) => DatasetStatus::Loaded(ds),
        Err(e) => {
            tracing::error!("Dataset load failed: {e}");
            DatasetStatus::Failed(e)
        }
    };
    let mut app = AppState::new(dataset, &cfg.api_url, Local::now().date_naive());
    info!(endpoint = %cfg.api_url, products = app.products.len(), "dashboard started");

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut product_table_state = TableState::default();
    product_table_state.select(app.selected);

    let result = run_loop(&mut terminal, &mut app, &mut product_table_state).await;

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
    product_state: &mut TableState,
) -> io::Result<()> {
    loop {
        product_state.select(app.selected);
        terminal.draw(|f| render(f, app, product_state))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.mode == InputMode::EditingEndpoint {
            match key.code {
                KeyCode::Enter => app.commit_endpoint(),
                KeyCode::Esc => app.cancel_edit(),
                KeyCode::Backspace => {
                    app.endpoint_input.pop();
                }
                KeyCode::Char(c) => app.endpoint_input.push(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
            KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
            KeyCode::Right | KeyCode::Char('l') => app.shift_date(1),
            KeyCode::Left | KeyCode::Char('h') => app.shift_date(-1),
            KeyCode::PageDown => app.shift_date(7),
            KeyCode::PageUp => app.shift_date(-7),
            KeyCode::Char('t') => app.reset_date(),
            KeyCode::Char('e') => app.begin_edit_endpoint(),
            KeyCode::Char('d') => app.toggle_details(),
            KeyCode::Enter | KeyCode::Char('p') => {
                if app.begin_predict() {
                    // Show the running state, then block on the request
                    terminal.draw(|f| render(f, app, product_state))?;
                    app.predict().await;
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, product_state: &mut TableState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    match &app.dataset {
        DatasetStatus::Loaded(_) => render_body(f, app, product_state, chunks[1]),
        DatasetStatus::Failed(e) => render_unavailable(f, e, chunks[1]),
    }
    render_footer(f, app, chunks[2]);
}

fn bordered(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.dataset {
        DatasetStatus::Loaded(ds) => (
            format!("● {} ({} rows)", truncate(ds.source(), 40), ds.len()),
            Color::Green,
        ),
        DatasetStatus::Failed(e) => (format!("✗ {}", error_label(e)), Color::Red),
    };

    let title_spans = vec![
        Span::styled(
            " 🥐 Bakery Forecast  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} products", app.products.len()),
            Style::default().fg(Color::White),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn render_unavailable(f: &mut Frame, e: &AppError, area: Rect) {
    let hint = match e {
        AppError::DatasetUnavailable { .. } => {
            "Place the historical CSV next to the binary or set DATASET_PATH."
        }
        AppError::SchemaResolution { .. } => {
            "The CSV needs date (FECHA/DATE), product (PRODUCTO/ITEM/NOMBRE) and quantity (UNIDADES/VENTA/CANTIDAD/QTY) columns."
        }
        _ => "Fix the CSV and restart the dashboard.",
    };
    let text = vec![
        Line::from(Span::styled(
            format!("{}: {e}", error_label(e)),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::Gray))),
    ];
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(bordered(" DATASET "));
    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, product_state: &mut TableState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(halves[0]);

    render_products(f, app, product_state, left[0]);
    render_date(f, app, left[1]);
    render_endpoint(f, app, left[2]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(halves[1]);

    render_result(f, app, right[0]);
    if app.show_details {
        render_details(f, app, right[1]);
    } else {
        render_chart(f, app, right[1]);
    }
}

fn render_products(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header = Row::new(["#", "Product"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .height(1);

    let rows: Vec<Row> = app
        .products
        .iter()
        .enumerate()
        .map(|(i, p)| {
            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(p, 32)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(4), Constraint::Min(10)])
        .header(header)
        .block(bordered(" PRODUCT "))
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    f.render_stateful_widget(table, area, state);
}

fn render_date(f: &mut Frame, app: &AppState, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            format_date(app.target_date),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", app.target_date.format("%A")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(line).block(bordered(" DATE TO PREDICT ")), area);
}

fn render_endpoint(f: &mut Frame, app: &AppState, area: Rect) {
    let editing = app.mode == InputMode::EditingEndpoint;
    let value = if editing {
        format!("{}▏", app.endpoint_input)
    } else {
        app.client.endpoint().to_string()
    };
    let mut lines = vec![Line::from(Span::styled(
        value,
        Style::default().fg(if editing { Color::Yellow } else { Color::White }),
    ))];
    if let Some(err) = &app.endpoint_error {
        lines.push(Line::from(Span::styled(
            err.as_str(),
            Style::default().fg(Color::Red),
        )));
    }
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(bordered(" ENDPOINT URL "));
    f.render_widget(paragraph, area);
}

fn render_result(f: &mut Frame, app: &AppState, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    match &app.prediction {
        PredictionStatus::Idle => lines.push(Line::from(Span::styled(
            "Select a product and a date, then press Enter.",
            Style::default().fg(Color::DarkGray),
        ))),
        PredictionStatus::Running => lines.push(Line::from(Span::styled(
            "Consulting the model…",
            Style::default().fg(Color::Yellow),
        ))),
        PredictionStatus::Done(run) => result_lines(run, &mut lines),
    }
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(bordered(" SUGGESTED PRODUCTION "));
    f.render_widget(paragraph, area);
}

fn result_lines(run: &PredictionRun, lines: &mut Vec<Line<'static>>) {
    if let Some(w) = &run.build.warning {
        lines.push(Line::from(Span::styled(
            format!("⚠ {w}"),
            Style::default().fg(Color::Yellow),
        )));
    }
    let target = format_date(run.build.window.target_date);
    match &run.result {
        Ok(r) => {
            lines.push(Line::from(vec![
                Span::styled(format!("For {target}: "), Style::default().fg(Color::Gray)),
                Span::styled(
                    format_units(r.predicted_value()),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
            ]));
            if r.predicted == PredictedValue::Missing {
                lines.push(Line::from(Span::styled(
                    "The response had no prediction field. Press [d] for the raw JSON.",
                    Style::default().fg(Color::Yellow),
                )));
            }
        }
        Err(AppError::ServiceError { status, body }) => {
            lines.push(Line::from(Span::styled(
                format!("API error ({status}): {body}"),
                Style::default().fg(Color::Red),
            )));
        }
        Err(e) => {
            lines.push(Line::from(Span::styled(
                format!("{}: {e}", error_label(e)),
                Style::default().fg(Color::Red),
            )));
        }
    }
}

fn render_details(f: &mut Frame, app: &AppState, area: Rect) {
    let text = app
        .details_json()
        .unwrap_or_else(|| "No response yet.".to_string());
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(bordered(" JSON DETAILS "));
    f.render_widget(paragraph, area);
}

fn render_chart(f: &mut Frame, app: &AppState, area: Rect) {
    let PredictionStatus::Done(run) = &app.prediction else {
        f.render_widget(Paragraph::new("").block(bordered(" FORECAST ")), area);
        return;
    };

    let predicted = run.result.as_ref().ok().and_then(|r| r.predicted_value());
    let target = run.build.window.target_date;
    let data = chart_data(&run.build.chart, target, predicted);

    let prediction_point: Vec<(f64, f64)> = data.prediction.into_iter().collect();
    let mut datasets = vec![
        ChartDataset::default()
            .name("History")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Blue))
            .data(&data.history),
        ChartDataset::default()
            .marker(Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&data.connector),
    ];
    if !prediction_point.is_empty() {
        datasets.push(
            ChartDataset::default()
                .name(format!("Prediction {}", format_units(predicted)))
                .marker(Marker::Block)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::LightRed))
                .data(&prediction_point),
        );
    }

    let first_date = run
        .build
        .chart
        .first()
        .map(|p| p.date)
        .unwrap_or(target);
    let y_max = data.y_bounds[1];

    let chart = Chart::new(datasets)
        .block(bordered(" FORECAST ").title(Span::styled(
            format!(" {} ", truncate(&run.build.window.product_id, 30)),
            Style::default().fg(Color::White),
        )))
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(Color::Gray))
                .bounds(data.x_bounds)
                .labels(date_labels(first_date, target)),
        )
        .y_axis(
            Axis::default()
                .title("Sales")
                .style(Style::default().fg(Color::Gray))
                .bounds(data.y_bounds)
                .labels(vec![
                    format!("{:.0}", data.y_bounds[0]),
                    format!("{:.0}", y_max / 2.0),
                    format!("{y_max:.0}"),
                ]),
        );
    f.render_widget(chart, area);
}

fn date_labels(first: NaiveDate, last: NaiveDate) -> Vec<String> {
    vec![first.format("%m-%d").to_string(), last.format("%m-%d").to_string()]
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let line = if app.mode == InputMode::EditingEndpoint {
        Line::from(vec![
            key(" [Enter] "),
            Span::raw("apply  "),
            key("[Esc] "),
            Span::raw("cancel"),
        ])
    } else {
        Line::from(vec![
            key(" [q] "),
            Span::raw("quit  "),
            key("[↑↓] "),
            Span::raw("product  "),
            key("[←→ / PgUp PgDn] "),
            Span::raw("date  "),
            key("[t] "),
            Span::raw("tomorrow  "),
            key("[Enter] "),
            Span::raw("predict  "),
            key("[e] "),
            Span::raw("endpoint  "),
            key("[d] "),
            Span::raw("details"),
        ])
    };
    f.render_widget(
        Paragraph::new(line).style(Style::default().fg(Color::White)),
        area,
    );
}
