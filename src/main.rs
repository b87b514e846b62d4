use std::fs::OpenOptions;
use std::io;
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;
use tui::{backend::CrosstermBackend, Terminal};

use churn_dash::ui::{self, App, MenuItem};
use churn_dash::{derive, Args, DashboardReport, PanelConfig, SnapshotCache};

enum Event<I> {
    Input(I),
    Tick,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = match &args.panels {
        Some(path) => PanelConfig::from_file(path)?,
        None => PanelConfig::default(),
    };
    let mut cache = SnapshotCache::new(&args.data);
    let (table, _) = cache
        .snapshot()
        .with_context(|| format!("loading {}", args.data.display()))?;

    if args.report {
        let report = DashboardReport::build(&derive(table), &config);
        if args.json {
            println!("{}", report.to_json()?);
        } else {
            print!("{report}");
        }
        return Ok(());
    }

    run_dashboard(&args, &config, cache)
}

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
        .with_context(|| format!("opening log file {}", args.log_file.display()))?;
    let filter = EnvFilter::try_new(&args.log_level)
        .with_context(|| format!("invalid log filter {:?}", args.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_dashboard(args: &Args, config: &PanelConfig, mut cache: SnapshotCache) -> anyhow::Result<()> {
    let mut app = App::new();
    app.refresh(&mut cache, config);

    ui::with_raw_mode(
        || enable_raw_mode().context("enabling raw mode"),
        || disable_raw_mode().context("restoring the terminal"),
        || session(args, config, &mut app, &mut cache),
    )
}

fn session(
    args: &Args,
    config: &PanelConfig,
    app: &mut App,
    cache: &mut SnapshotCache,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let (tx, rx) = mpsc::channel();
    let tick_rate = args.tick_rate();
    thread::spawn(move || {
        let mut last_tick = Instant::now();
        loop {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            if event::poll(timeout).unwrap_or(false) {
                if let Ok(CEvent::Key(key)) = event::read() {
                    if tx.send(Event::Input(key)).is_err() {
                        break;
                    }
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if tx.send(Event::Tick).is_err() {
                    break;
                }
                last_tick = Instant::now();
            }
        }
    });
    info!(path = %cache.path().display(), "dashboard started");

    let result = event_loop(&mut terminal, &rx, app, cache, config);

    terminal.clear()?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    rx: &mpsc::Receiver<Event<KeyEvent>>,
    app: &mut App,
    cache: &mut SnapshotCache,
    config: &PanelConfig,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|rect| ui::draw(rect, app))?;

        match rx.recv()? {
            Event::Input(event) => match event.code {
                KeyCode::Char('q') => break,
                KeyCode::Char('r') => {
                    cache.invalidate();
                    app.refresh(cache, config);
                }
                KeyCode::Char(key) => {
                    if let Some(item) = MenuItem::from_key(key) {
                        app.active = item;
                    }
                }
                _ => {}
            },
            Event::Tick => {
                app.refresh(cache, config);
            }
        }
    }
    Ok(())
}
