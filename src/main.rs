mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use cubik::{
    accounts::{self, AccountError},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    display::LatestFrame,
    export::write_csv,
    runtime::{
        Command, CrosstermEventSource, CubikEvent, FixedTickRate, KeyTranslator, ReleaseMode, Runner,
    },
    session::Session,
    stats::recent_entries,
    storage::{SqliteStore, Storage},
    timer::Transition,
    util::format_secs,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};

/// Tick cadence of the running clock
const TICK_RATE_MS: u64 = 10;

/// terminal speedcubing timer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal speedcubing timer: random scrambles, hold-space-to-start timing with optional WCA inspection, and rolling best/worst/ao5/ao12 statistics kept across runs."
)]
pub struct Cli {
    /// skip the 15 second inspection countdown
    #[clap(long)]
    no_inspection: bool,

    /// number of moves in each scramble
    #[clap(short = 'l', long)]
    scramble_length: Option<usize>,

    /// path of the solve store (defaults to ~/.local/state/cubik/store.db)
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    #[clap(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Action {
    /// create a local account and sign in
    Signup {
        #[clap(long)]
        username: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
        #[clap(long)]
        confirm: String,
    },
    /// sign in to an existing local account
    Login {
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
    /// sign out
    Logout,
    /// show the signed-in user's statistics
    Profile,
    /// write the session history to a CSV file
    Export { path: PathBuf },
}

impl Cli {
    /// Saved config with command line overrides applied
    fn config(&self, saved: Config) -> Config {
        Config {
            inspection: saved.inspection && !self.no_inspection,
            scramble_length: self.scramble_length.unwrap_or(saved.scramble_length),
            ..saved
        }
    }

    fn db_path(&self) -> PathBuf {
        self.db
            .clone()
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("cubik_store.db"))
    }
}

pub struct App {
    pub session: Session<SqliteStore, LatestFrame>,
    /// Config in effect for this run, command line overrides included
    pub config: Config,
    /// Config as loaded from disk; only in-app changes are written back
    saved: Config,
    config_store: Box<dyn ConfigStore>,
    pub keys: KeyTranslator,
}

impl App {
    pub fn new(
        config: Config,
        saved: Config,
        config_store: Box<dyn ConfigStore>,
        storage: Storage<SqliteStore>,
        release_mode: ReleaseMode,
    ) -> Self {
        let mut session = Session::new(&config, storage, LatestFrame::default());
        session.set_hints(release_mode.hints());
        Self {
            session,
            config,
            saved,
            config_store,
            keys: KeyTranslator::new(release_mode),
        }
    }

    /// Apply one command; returns false when the app should exit
    pub fn handle(&mut self, command: Command, at: Instant) -> bool {
        match command {
            Command::SpaceDown => {
                self.session.key_down(at);
            }
            Command::SpaceUp => {
                self.session.key_up(at);
            }
            Command::NewScramble => {
                self.session.new_scramble();
            }
            Command::ToggleInspection => {
                if self.session.toggle_inspection() {
                    let enabled = self.session.timer().inspection_enabled();
                    self.config.inspection = enabled;
                    self.saved.inspection = enabled;
                    if let Err(e) = self.config_store.save(&self.saved) {
                        log::warn!("could not save config: {}", e);
                    }
                }
            }
            Command::Quit => return false,
        }
        true
    }

    /// Advance the live tickers; returns whether the screen changed
    pub fn tick(&mut self, at: Instant) -> bool {
        self.session.tick(at) != Transition::Ignored
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .target(env_logger::Target::Pipe(Box::new(file)))
            .try_init();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let config_store = FileConfigStore::new();
    let saved = config_store.load();
    let config = cli.config(saved.clone());
    let storage = Storage::new(SqliteStore::open(cli.db_path())?);

    if let Some(action) = cli.action.clone() {
        if let Err(e) = run_action(action, storage) {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let release_mode = if matches!(supports_keyboard_enhancement(), Ok(true)) {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
        ReleaseMode::Native
    } else {
        log::info!("terminal does not report key releases, using toggle mode");
        ReleaseMode::Toggle
    };
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, saved, Box::new(config_store), storage, release_mode);
    let result = start_tui(&mut terminal, &mut app);

    if app.keys.mode() == ReleaseMode::Native {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTickRate::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        match runner.step() {
            CubikEvent::Tick => {
                if app.tick(Instant::now()) {
                    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
                }
            }
            CubikEvent::Closed => {
                log::warn!("terminal input closed, exiting");
                break;
            }
            CubikEvent::Resize => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            CubikEvent::Key(key) => {
                let at = Instant::now();
                let phase = app.session.timer().phase();
                if let Some(command) = app.keys.translate(&key, phase, at) {
                    if !app.handle(command, at) {
                        break;
                    }
                }
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
        }
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum ActionError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Export(#[from] cubik::export::ExportError),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("Not logged in")]
    NotLoggedIn,
}

fn run_action(action: Action, mut storage: Storage<SqliteStore>) -> Result<(), ActionError> {
    match action {
        Action::Signup {
            username,
            email,
            password,
            confirm,
        } => {
            let user = accounts::sign_up(&mut storage, &username, &email, &password, &confirm)?;
            println!("Signed up as {}", user.username);
        }
        Action::Login { email, password } => {
            let user = accounts::log_in(&mut storage, &email, &password)?;
            println!("Logged in as {}", user.username);
        }
        Action::Logout => {
            accounts::log_out(&mut storage)?;
            println!("Logged out");
        }
        Action::Profile => {
            let user = storage
                .load_current_user()
                .ok_or(ActionError::NotLoggedIn)?;
            let profile = accounts::profile(&storage, &user);
            let agg = &profile.aggregates;
            let show = |v: Option<f64>| v.map(format_secs).unwrap_or_else(|| "--".to_string());

            println!("{}", profile.username);
            println!("Total solves: {}", agg.count);
            println!("Best: {}", show(agg.best));
            println!("Ao5: {}", show(agg.average_of_5));
            println!("Ao12: {}", show(agg.average_of_12));
            for entry in recent_entries(&profile.times, 20) {
                println!(
                    "{:03}. {}{}",
                    entry.number,
                    format_secs(entry.time),
                    if entry.is_pb { " *" } else { "" }
                );
            }
        }
        Action::Export { path } => {
            let history = storage.load_session_history();
            let rows = write_csv(&history, File::create(&path)?)?;
            println!("Exported {} solves to {}", rows, path.display());
        }
    }
    Ok(())
}
