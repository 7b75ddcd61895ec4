#![forbid(unsafe_code)]
//! Kittyboard terminal front-end, running against an in-process devnet

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use kittyboard::addressbook::AddressBook;
use kittyboard::app::App;
use kittyboard::config::{load_config, Config, DEFAULT_CONFIG_FILE};
use kittyboard::devnet::DevNode;
use kittyboard::panel::PanelContext;
use kittyboard::persistence::{Database, InMemoryPersistence, Persistence};
use kittyboard::secretstore::SecretStore;
use kittyboard::tui::Ui;
use kittyboard::tx::{Pipeline, Submitter};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Directory for keys, the address book, the chain database and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Discard the stored chain and start from a new genesis
    #[arg(long)]
    fresh: bool,
}

/// Log to a file: stdout belongs to the terminal UI.
fn init_logging(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn open_chain(config: &Config, fresh: bool) -> Result<Box<dyn Persistence>, Box<dyn std::error::Error>> {
    if !config.storage.persist_chain {
        return Ok(Box::new(InMemoryPersistence::new()));
    }
    let path = config.chain_db_path();
    if fresh && path.exists() {
        info!("Discarding stored chain at {}", path.display());
        fs::remove_file(&path)?;
    }
    Ok(Box::new(Database::open(&path)?))
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &App,
    submitter: &dyn Submitter,
    tick: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ui = Ui::new();
    let mut ticker = tokio::time::interval(tick);
    loop {
        ticker.tick().await;
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    ui.handle_key(app, submitter, key);
                }
            }
        }
        if ui.should_quit() {
            return Ok(());
        }
        terminal.draw(|f| ui.draw(f, app))?;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    fs::create_dir_all(&config.storage.data_dir)?;
    init_logging(&config)?;
    info!("Starting kittyboard with data in {}", config.storage.data_dir.display());

    let secrets = SecretStore::open(&config.keys_path())?;
    if config.ui.import_dev_keys {
        let added = secrets.import_dev_keys()?;
        if added > 0 {
            info!("Imported {} development keys", added);
        }
    }

    let book_path = config.addressbook_path();
    let book = AddressBook::load(&book_path)?;
    let _autosave = book.autosave(book_path);

    let node = DevNode::start(&config.node, open_chain(&config, cli.fresh)?)?;
    let chain = node.chain();
    let pipeline = Pipeline::new(
        chain.clone(),
        secrets.clone(),
        node.clone(),
        config.node.mortal_period,
    );
    let app = App::new(PanelContext::new(chain, secrets, book));

    let (stop, shutdown) = watch::channel(false);
    let producer = tokio::spawn(
        node.clone()
            .run(Duration::from_millis(config.node.block_time_ms), shutdown),
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(
        &mut terminal,
        &app,
        &pipeline,
        Duration::from_millis(config.ui.tick_ms),
    )
    .await;

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let _ = stop.send(true);
    producer.await?;
    node.set_connected(false);
    info!("Stopped at block #{}", node.head().map_or(0, |h| h.number));

    result
}
