use std::io;
use std::time::Duration;

use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod app;
mod cache;
mod config;
mod db;
mod docs;
mod error;
mod models;
mod period;
mod services;
mod tui;

use app::App;
use config::ConfigSources;
use error::Result;
use period::Period;
use tui::{draw, handle_key_event};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration (secrets.toml, environment, .env)
    let sources = ConfigSources::load();

    // Check for --kpis flag (headless metric dump)
    if args.len() >= 2 && args[1] == "--kpis" {
        let period = match args.get(2).filter(|a| !a.starts_with("--")) {
            Some(label) => label.parse::<Period>()?,
            None => Period::default(),
        };
        let json = args.iter().any(|a| a == "--json");
        return print_kpis(&sources, period, json).await;
    }

    // Initialize app
    let mut app = App::new(&sources);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Pull in completed background fetches before drawing
        app.poll_results();

        terminal.draw(|frame| draw(frame, app))?;

        // Poll for events with timeout to allow async operations
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(key, app.show_help) {
                        if app.handle_action(action) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

async fn print_kpis(sources: &ConfigSources, period: Period, json: bool) -> Result<()> {
    let analytics = db::Analytics::new(db::Db::new(sources.db_config()));
    let window = period.window();
    let kpis = analytics.kpis(&window).await?;

    if json {
        let out = serde_json::json!({
            "period": period.label(),
            "start": window.start,
            "end": window.end,
            "kpis": kpis,
        });
        println!("{}", serde_json::to_string_pretty(&out).map_err(anyhow::Error::from)?);
        return Ok(());
    }

    println!("Period: {period} ({} to {})", window.start, window.end);
    println!("Generated:           {}", kpis.generated);
    println!("Uploaded:            {}", kpis.uploaded);
    println!("Pending review:      {}", kpis.pending_review);
    println!("Approval rate:       {:.1}%", kpis.approval_rate);
    println!("Pipeline conversion: {:.1}%", kpis.conversion_rate);
    Ok(())
}
