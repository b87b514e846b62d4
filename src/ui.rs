use chrono::{DateTime, Local};
use tracing::error;
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Span, Spans};
use tui::widgets::{
    Axis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Tabs,
    Wrap,
};
use tui::{symbols, Frame};

use crate::aggregate::Percent;
use crate::cache::{Refresh, SnapshotCache};
use crate::charts::{CountSeries, Regression};
use crate::config::PanelConfig;
use crate::crosstab::CrossTab;
use crate::derive::derive;
use crate::report::{
    describe_rows, fmt_number, group_rows, DashboardReport, Panel, DESCRIBE_HEADERS,
    GROUP_HEADERS,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MenuItem {
    Overview,
    Segments,
    Charts,
    Charges,
    Heatmap,
}

impl MenuItem {
    pub const ALL: [MenuItem; 5] = [
        MenuItem::Overview,
        MenuItem::Segments,
        MenuItem::Charts,
        MenuItem::Charges,
        MenuItem::Heatmap,
    ];

    pub fn title(self) -> &'static str {
        match self {
            MenuItem::Overview => "Overview",
            MenuItem::Segments => "Segments",
            MenuItem::Charts => "Charts",
            MenuItem::Charges => "Monthly Charges",
            MenuItem::Heatmap => "Heatmap",
        }
    }

    /// Tab selected by a key press, if any.
    pub fn from_key(key: char) -> Option<MenuItem> {
        match key {
            '1' | 'o' => Some(MenuItem::Overview),
            '2' | 's' => Some(MenuItem::Segments),
            '3' | 'c' => Some(MenuItem::Charts),
            '4' | 'm' => Some(MenuItem::Charges),
            '5' | 'h' => Some(MenuItem::Heatmap),
            _ => None,
        }
    }
}

impl From<MenuItem> for usize {
    fn from(input: MenuItem) -> usize {
        match input {
            MenuItem::Overview => 0,
            MenuItem::Segments => 1,
            MenuItem::Charts => 2,
            MenuItem::Charges => 3,
            MenuItem::Heatmap => 4,
        }
    }
}

/// Dashboard state between frames.
#[derive(Debug)]
pub struct App {
    pub active: MenuItem,
    /// The latest render pass, or the load error that aborted it.
    pub view: Result<DashboardReport, String>,
    pub loaded_at: Option<DateTime<Local>>,
}

impl App {
    pub fn new() -> Self {
        App {
            active: MenuItem::Overview,
            view: Err("no data loaded yet".to_string()),
            loaded_at: None,
        }
    }

    /// Polls the cache and runs a new render pass when the source changed or
    /// the previous pass failed to load. Returns whether the view changed.
    pub fn refresh(&mut self, cache: &mut SnapshotCache, config: &PanelConfig) -> bool {
        match cache.snapshot() {
            Ok((_, Refresh::Unchanged)) if self.view.is_ok() => false,
            Ok((table, _)) => {
                self.view = Ok(DashboardReport::build(&derive(table), config));
                self.loaded_at = cache.loaded_at();
                true
            }
            Err(err) => {
                let message = err.to_string();
                let changed = self.view.as_ref().err() != Some(&message);
                if changed {
                    error!(%err, "render pass aborted");
                }
                self.view = Err(message);
                changed
            }
        }
    }
}

impl Default for App {
    fn default() -> Self {
        App::new()
    }
}

/// Runs `body` with the terminal in raw mode. `disable` runs on every exit
/// path once `enable` succeeded; the body's error wins over a restore error.
pub fn with_raw_mode<T>(
    enable: impl FnOnce() -> anyhow::Result<()>,
    disable: impl FnOnce() -> anyhow::Result<()>,
    body: impl FnOnce() -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    enable()?;
    let result = body();
    let restored = disable();
    let value = result?;
    restored?;
    Ok(value)
}

pub fn draw<B: Backend>(f: &mut Frame<B>, app: &App) {
    let size = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(5), Constraint::Min(0)].as_ref())
        .split(size);

    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[0]);

    let menu = MenuItem::ALL
        .iter()
        .enumerate()
        .map(|(i, item)| {
            Spans::from(vec![
                Span::styled(
                    format!("{}", i + 1),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                Span::styled(format!(" {}", item.title()), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    let tabs = Tabs::new(menu)
        .select(app.active.into())
        .block(
            Block::default()
                .title("Telco Customer Churn Dashboard  (r reload, q quit)")
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(Style::default().fg(Color::Yellow))
        .divider(Span::raw("|"));
    f.render_widget(tabs, header_chunks[0]);

    match &app.view {
        Ok(report) => {
            f.render_widget(metrics_block(report, app.loaded_at), header_chunks[1]);
            match app.active {
                MenuItem::Overview => draw_overview(f, chunks[1], report),
                MenuItem::Segments => draw_segments(f, chunks[1], report),
                MenuItem::Charts => draw_charts(f, chunks[1], report),
                MenuItem::Charges => draw_charges(f, chunks[1], report),
                MenuItem::Heatmap => draw_heatmap(f, chunks[1], &report.heatmap),
            }
        }
        Err(message) => {
            let error = Paragraph::new(vec![
                Spans::from(Span::styled(
                    "Cannot load the dataset",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Spans::from(message.as_str()),
            ])
            .block(Block::default().title("Error").borders(Borders::ALL))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            f.render_widget(error, chunks[1]);
        }
    }
}

fn metrics_block(report: &DashboardReport, loaded_at: Option<DateTime<Local>>) -> Paragraph<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let churn_rate = match &report.metrics.churn_rate {
        Panel::Ready(rate) => format!("{rate:.2}%"),
        Panel::Failed(_) => "unavailable".to_string(),
    };
    let avg = match &report.metrics.avg_monthly_charges {
        Panel::Ready(avg) => format!("${}", fmt_number(*avg, 2)),
        Panel::Failed(_) => "unavailable".to_string(),
    };
    let loaded = loaded_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();

    Paragraph::new(vec![
        Spans::from(Span::styled(
            format!("Total Customers: {}", report.metrics.total_customers),
            bold,
        )),
        Spans::from(Span::styled(format!("Churn Rate: {churn_rate}"), bold)),
        Spans::from(Span::styled(format!("Avg. Monthly Charges: {avg}"), bold)),
    ])
    .block(
        Block::default()
            .title(format!("{} @ {}", report.source, loaded))
            .borders(Borders::ALL),
    )
    .style(Style::default().fg(Color::Green))
    .alignment(Alignment::Center)
}

fn draw_overview<B: Backend>(f: &mut Frame<B>, area: Rect, report: &DashboardReport) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(columns[0]);

    match &report.churn_distribution {
        Panel::Ready(shares) => {
            let rows = shares
                .iter()
                .map(|s| vec![s.value.clone(), s.count.to_string(), format!("{:.2}", s.percentage)])
                .collect();
            render_table(f, left[0], "Churn Distribution", &["Churn", "Count", "Percentage"], rows);
        }
        Panel::Failed(message) => render_failed(f, left[0], "Churn Distribution", message),
    }

    match &report.total_charges {
        Panel::Ready(extremes) => render_table(
            f,
            left[1],
            "TotalCharges Summary",
            &["Statistic", "TotalCharges"],
            vec![
                vec!["Minimum".to_string(), fmt_number(extremes.min, 2)],
                vec!["Maximum".to_string(), fmt_number(extremes.max, 2)],
            ],
        ),
        Panel::Failed(message) => render_failed(f, left[1], "TotalCharges Summary", message),
    }

    match &report.descriptive {
        Panel::Ready(stats) => render_table(
            f,
            columns[1],
            "Descriptive Statistics",
            &DESCRIBE_HEADERS,
            describe_rows(stats),
        ),
        Panel::Failed(message) => render_failed(f, columns[1], "Descriptive Statistics", message),
    }
}

/// Splits `area` into a grid with `per_row` cells per row.
fn grid(area: Rect, cells: usize, per_row: usize) -> Vec<Rect> {
    let row_count = ((cells + per_row - 1) / per_row).max(1);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, row_count as u32); row_count])
        .split(area);
    rows.into_iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, per_row as u32); per_row])
                .split(row)
        })
        .take(cells)
        .collect()
}

fn draw_segments<B: Backend>(f: &mut Frame<B>, area: Rect, report: &DashboardReport) {
    let cells = grid(area, report.segments.len(), 3);
    for (segment, cell) in report.segments.iter().zip(cells) {
        match &segment.panel {
            Panel::Ready(summary) => {
                render_table(f, cell, &segment.title, &GROUP_HEADERS, group_rows(summary))
            }
            Panel::Failed(message) => render_failed(f, cell, &segment.title, message),
        }
    }
}

fn draw_charts<B: Backend>(f: &mut Frame<B>, area: Rect, report: &DashboardReport) {
    let cells = grid(area, report.key_factors.len() + 1, 3);
    for (factor, cell) in report.key_factors.iter().zip(cells.iter()) {
        match &factor.panel {
            Panel::Ready(series) => render_counts(f, *cell, &factor.title, series),
            Panel::Failed(message) => render_failed(f, *cell, &factor.title, message),
        }
    }
    if let Some(&cell) = cells.last() {
        match &report.monthly_by_churn {
            Panel::Ready(boxes) => {
                let rows = boxes
                    .iter()
                    .map(|b| {
                        vec![
                            b.group.clone(),
                            format!("{:.1}", b.lower_whisker),
                            format!("{:.1}", b.q1),
                            format!("{:.1}", b.median),
                            format!("{:.1}", b.q3),
                            format!("{:.1}", b.upper_whisker),
                        ]
                    })
                    .collect();
                render_table(
                    f,
                    cell,
                    "MonthlyCharges vs Churn",
                    &["Churn", "low", "25%", "50%", "75%", "high"],
                    rows,
                );
            }
            Panel::Failed(message) => render_failed(f, cell, "MonthlyCharges vs Churn", message),
        }
    }
}

fn draw_charges<B: Backend>(f: &mut Frame<B>, area: Rect, report: &DashboardReport) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(columns[0]);

    let title = "Churn by Monthly Charge Range";
    match &report.charge_range {
        Panel::Ready(summary) => {
            let mut rows = group_rows(summary);
            if summary.missing > 0 {
                rows.push(vec!["(no bucket)".to_string(), summary.missing.to_string()]);
            }
            render_table(f, left[0], title, &GROUP_HEADERS, rows);
        }
        Panel::Failed(message) => render_failed(f, left[0], title, message),
    }
    match &report.charge_range_counts {
        Panel::Ready(series) => render_counts(f, left[1], title, series),
        Panel::Failed(message) => render_failed(f, left[1], title, message),
    }

    let title = "Churn Probability vs. Monthly Charges";
    match &report.churn_vs_charges {
        Panel::Ready(fit) => render_regression(f, columns[1], title, fit),
        Panel::Failed(message) => render_failed(f, columns[1], title, message),
    }
}

fn draw_heatmap<B: Backend>(f: &mut Frame<B>, area: Rect, heatmap: &Panel<CrossTab>) {
    let grid = match heatmap {
        Panel::Ready(grid) => grid,
        Panel::Failed(message) => return render_failed(f, area, "Heatmap", message),
    };
    let title = format!(
        "Churn % by {} & {}  (rate / count)",
        grid.rows.label(),
        grid.columns.label()
    );

    let header = Row::new(
        std::iter::once(grid.rows.name().to_string()).chain(grid.column_labels.iter().cloned()),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = grid
        .observed_rows()
        .map(|r| {
            let cells = grid.counts[r].iter().zip(&grid.churn_rate[r]).map(|(count, rate)| {
                Cell::from(format!("{rate:.1} / {count}")).style(Style::default().fg(heat(*rate)))
            });
            Row::new(std::iter::once(Cell::from(grid.row_labels[r].clone())).chain(cells))
        })
        .collect();

    let mut widths = vec![Constraint::Length(18)];
    widths.extend(grid.column_labels.iter().map(|label| {
        Constraint::Length(label.chars().count().max(14) as u16)
    }));
    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .widths(&widths)
        .column_spacing(2);
    f.render_widget(table, area);
}

fn heat(rate: Percent) -> Color {
    match rate.value() {
        None => Color::DarkGray,
        Some(v) if v < 15.0 => Color::Blue,
        Some(v) if v < 30.0 => Color::Cyan,
        Some(v) if v < 45.0 => Color::Yellow,
        Some(v) if v < 60.0 => Color::LightRed,
        Some(_) => Color::Red,
    }
}

fn render_table<B: Backend>(
    f: &mut Frame<B>,
    area: Rect,
    title: &str,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) {
    let mut widths: Vec<u16> = headers.iter().map(|h| h.chars().count() as u16).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count() as u16);
        }
    }
    let constraints: Vec<Constraint> = widths.into_iter().map(Constraint::Length).collect();

    let header = Row::new(headers.iter().map(|h| h.to_string()))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    let table = Table::new(rows.into_iter().map(Row::new))
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .widths(&constraints)
        .column_spacing(2);
    f.render_widget(table, area);
}

fn render_failed<B: Backend>(f: &mut Frame<B>, area: Rect, title: &str, message: &str) {
    let paragraph = Paragraph::new(vec![Spans::from(Span::styled(
        format!("unavailable: {message}"),
        Style::default().fg(Color::Red),
    ))])
    .block(Block::default().title(title).borders(Borders::ALL))
    .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

/// Abbreviates a category so that `label/hue` fits under one bar.
fn bar_label(x: &str, hue: &str) -> String {
    let short: String = x.chars().take(6).collect();
    let initial = hue.chars().next().unwrap_or('?');
    format!("{short}/{initial}")
}

fn render_counts<B: Backend>(f: &mut Frame<B>, area: Rect, title: &str, series: &CountSeries) {
    let labels: Vec<String> = series
        .points
        .iter()
        .map(|p| bar_label(&p.x, &p.hue))
        .collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(&series.points)
        .map(|(label, p)| (label.as_str(), p.count as u64))
        .collect();
    let chart = BarChart::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .data(&data)
        .bar_width(8)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Yellow))
        .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));
    f.render_widget(chart, area);
}

fn render_regression<B: Backend>(f: &mut Frame<B>, area: Rect, title: &str, fit: &Regression) {
    let (lo, hi) = fit.x_bounds().unwrap_or((0.0, 1.0));
    let trend: Vec<(f64, f64)> = [lo, hi]
        .into_iter()
        .filter_map(|x| fit.predict(x).map(|y| (x, y)))
        .collect();
    let datasets = vec![
        Dataset::default()
            .name("customers")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&fit.points),
        Dataset::default()
            .name("trend")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&trend),
    ];
    let chart = Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .title("Monthly Charges")
                .style(Style::default().fg(Color::Gray))
                .bounds([lo, hi])
                .labels(vec![
                    Span::raw(format!("{lo:.0}")),
                    Span::raw(format!("{:.0}", (lo + hi) / 2.0)),
                    Span::raw(format!("{hi:.0}")),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Churn Probability")
                .style(Style::default().fg(Color::Gray))
                .bounds([-0.1, 1.1])
                .labels(vec![Span::raw("0"), Span::raw("0.5"), Span::raw("1")]),
        );
    f.render_widget(chart, area);
}
