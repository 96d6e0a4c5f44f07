use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use swipetune::api::{ApiClient, EvaluationSink};
use swipetune::cache::LocalLibrary;
use swipetune::constants::{APP_NAME, PLAYER_POLL_INTERVAL_MILLIS};
use swipetune::models::{EvaluationStatus, Track, TrackId};
use swipetune::player::{AudioPlayer, PlaybackState, RodioBackend};
use swipetune::services::{report_played_in_background, SessionEvaluationSink};
use swipetune::state::{AuthStatus, DeckConfig, SessionStore, SwipeDeck, SwipeDirection};
use swipetune::storage::{EncryptedStore, KeyValueStore, SqliteStore};
use swipetune::utils::crypto::SecretBox;
use swipetune::utils::{now_secs, safe_lock};
use swipetune::{ClientConfig, ClientError, Result};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "swipetune", version, about = "Discover music one swipe at a time")]
struct Cli {
    /// Backend base URL (overrides SWIPETUNE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Backend health plus queue and worker diagnostics
    Health {
        /// Also ask the worker to refill the suggestion queue
        #[arg(long)]
        refill: bool,
    },
    /// Sign in and store the session on this device
    Login {
        email: String,
        #[arg(long, env = "SWIPETUNE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        email: String,
        #[arg(long, env = "SWIPETUNE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Fetch suggestions; with --interactive, swipe through them
    Deck {
        #[arg(long, short)]
        interactive: bool,
    },
    /// List or edit the on-device liked/disliked library
    Library {
        #[arg(long)]
        disliked: bool,
        /// Remove one track id from the listed collection
        #[arg(long)]
        remove: Option<String>,
        /// Remove everything, liked and disliked
        #[arg(long, conflicts_with = "remove")]
        clear: bool,
    },
    /// Drop dislikes whose exclusion window has passed
    Purge,
    /// List (or delete) evaluations stored on the server
    Evaluations {
        #[arg(long)]
        status: Option<EvaluationStatus>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        delete: Option<String>,
    },
    /// Play a preview URL on the default audio device
    Preview {
        url: String,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
}

/// Everything a command needs, wired once at startup
struct App {
    config: ClientConfig,
    runtime: tokio::runtime::Runtime,
    client: ApiClient,
    session: SessionStore,
    library: Arc<Mutex<LocalLibrary>>,
}

fn main() -> ExitCode {
    // Set RUST_LOG=debug for verbose output, RUST_LOG=info for normal logs
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("rustls", log::LevelFilter::Warn)
        .filter_module("symphonia", log::LevelFilter::Warn)
        .init();

    log::info!("[Main] Starting {} v{}", APP_NAME, APP_VERSION);

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("[Main] {}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    config.validate()?;

    let app = App::start(config)?;
    // Background refills and evaluation posts are spawned on this runtime
    let _guard = app.runtime.enter();

    match cli.command {
        Command::Health { refill } => app.health(refill),
        Command::Login { email, password } => app.login(&email, &password),
        Command::Register {
            email,
            password,
            display_name,
        } => app.register(&email, &password, display_name),
        Command::Logout => {
            app.session.logout();
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => app.whoami(),
        Command::Deck { interactive } => app.deck(interactive),
        Command::Library {
            disliked,
            remove,
            clear,
        } => app.library(disliked, remove, clear),
        Command::Purge => {
            let removed = safe_lock(&app.library, "Main").purge_expired(now_secs())?;
            println!("Purged {} expired dislikes.", removed);
            Ok(())
        }
        Command::Evaluations {
            status,
            limit,
            offset,
            delete,
        } => app.evaluations(status, limit, offset, delete),
        Command::Preview { url, seconds } => app.preview(&url, seconds),
    }
}

impl App {
    fn start(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create async runtime: {}", e)))?;

        let database: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&config.database_path())?);
        let secret = match config.storage_secret.as_deref() {
            Some(passphrase) => SecretBox::from_passphrase(passphrase),
            None => SecretBox::for_device(&config.data_dir),
        };
        let secure: Arc<dyn KeyValueStore> = Arc::new(EncryptedStore::new(Arc::clone(&database), secret));

        let client = ApiClient::new(&config)?;
        let session = SessionStore::new(Arc::new(client.clone()), secure);
        let library = Arc::new(Mutex::new(LocalLibrary::from_config(database, &config)));

        let status = runtime.block_on(session.initialize());
        log::info!("[Main] Session status: {:?}", status);

        Ok(Self {
            config,
            runtime,
            client,
            session,
            library,
        })
    }

    fn health(&self, refill: bool) -> Result<()> {
        let results = self.runtime.block_on(self.client.diagnostics());
        for (name, result) in results {
            match result {
                Ok(status) => println!("{:<14} {}", name, status.status_text()),
                Err(e) => println!("{:<14} unavailable ({})", name, e),
            }
        }
        if refill {
            let status = self.runtime.block_on(self.client.trigger_refill())?;
            println!("refill         {}", status.status_text());
        }
        Ok(())
    }

    fn login(&self, email: &str, password: &str) -> Result<()> {
        let user = self.runtime.block_on(self.session.login(email, password))?;
        match user {
            Some(user) => println!("Signed in as {}", user.display_name.unwrap_or(user.email)),
            None => println!("Signed in."),
        }
        Ok(())
    }

    fn register(&self, email: &str, password: &str, display_name: Option<String>) -> Result<()> {
        let user = self
            .runtime
            .block_on(self.session.register(email, password, display_name.as_deref()))?;
        match user {
            Some(user) => println!("Welcome, {}!", user.display_name.unwrap_or(user.email)),
            None => println!("Account created."),
        }
        Ok(())
    }

    fn whoami(&self) -> Result<()> {
        if self.session.status() != AuthStatus::Authenticated {
            println!("Not signed in.");
            return Ok(());
        }
        match self.session.user() {
            Some(user) => {
                println!("{} <{}>", user.display_name.as_deref().unwrap_or("-"), user.email);
                println!("id: {}", user.id);
            }
            None => println!("Signed in (no profile returned by the server)."),
        }
        if let Some(tokens) = self.session.tokens() {
            let remaining = tokens.access_expires_at.saturating_sub(now_secs());
            println!("access token expires in {}s", remaining);
        }
        Ok(())
    }

    fn deck(&self, interactive: bool) -> Result<()> {
        if self.session.is_authenticated() {
            if let Err(e) = self.runtime.block_on(self.session.ensure_fresh_token()) {
                log::warn!("[Main] Continuing without a fresh token: {}", e);
            }
        }

        let sink: Arc<dyn EvaluationSink> = Arc::new(SessionEvaluationSink::new(
            self.session.clone(),
            Arc::new(self.client.clone()),
        ));
        let mut deck_config = DeckConfig::from(&self.config);
        deck_config.show_instructions &= interactive;
        let deck = SwipeDeck::new(
            Arc::new(self.client.clone()),
            Some(sink),
            Arc::clone(&self.library),
            deck_config,
        );

        if let Err(e) = self.runtime.block_on(deck.fetch_initial()) {
            log::warn!("[Main] Initial fetch failed: {}", e);
        }
        if let Some(banner) = deck.error() {
            println!("! {}", banner);
        }

        if !interactive {
            for (i, track) in deck.queue().iter().enumerate() {
                println!("{:>3}. {}", i + 1, describe(track));
            }
            return Ok(());
        }
        self.swipe_loop(&deck)
    }

    fn swipe_loop(&self, deck: &SwipeDeck) -> Result<()> {
        let mut player = AudioPlayer::new(RodioBackend::new());
        let client = self.client.clone();
        player.on_track_end(move |track| {
            report_played_in_background(&client, track.id.clone(), track.duration_ms);
        });

        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            player.poll();
            let track = match deck.current() {
                Some(track) => track,
                None => {
                    let _ = self.runtime.block_on(deck.fetch_more());
                    match deck.current() {
                        Some(track) => track,
                        None => {
                            println!("No more suggestions right now.");
                            return Ok(());
                        }
                    }
                }
            };

            if let Some(banner) = deck.error() {
                println!("! {} (r to retry)", banner);
            }
            println!("\n{}", describe(&track));
            print!("[l]ike [d]islike [s]kip [p]lay [m]ute [r]etry [q]uit > ");
            io::stdout().flush()?;

            let Some(line) = lines.next() else {
                return Ok(());
            };
            let direction = match line?.trim() {
                "l" => SwipeDirection::Right,
                "d" => SwipeDirection::Left,
                "s" => SwipeDirection::Up,
                "p" => {
                    match player.state() {
                        PlaybackState::Playing => player.pause(),
                        PlaybackState::Paused => player.resume()?,
                        _ => {
                            if let Err(e) = player.play_track(&track) {
                                println!("! {}", e.user_message());
                            }
                        }
                    }
                    continue;
                }
                "m" => {
                    player.toggle_mute();
                    continue;
                }
                "r" => {
                    if let Err(e) = self.runtime.block_on(deck.retry()) {
                        println!("! {}", e.user_message());
                    }
                    continue;
                }
                "q" => return Ok(()),
                other => {
                    println!("Unknown choice '{}'", other);
                    continue;
                }
            };

            player.stop();
            let outcome = deck.record_swipe(direction, &track);
            log::debug!("[Main] Swipe outcome: {:?}", outcome);
        }
    }

    fn library(&self, disliked: bool, remove: Option<String>, clear: bool) -> Result<()> {
        let mut library = safe_lock(&self.library, "Main");
        if clear {
            library.clear()?;
            println!("Library cleared.");
            return Ok(());
        }
        if let Some(id) = remove {
            let id = TrackId::new(id);
            let removed = if disliked {
                library.remove_disliked(&id)?
            } else {
                library.remove_liked(&id)?
            };
            println!("{}", if removed { "Removed." } else { "Not in library." });
            return Ok(());
        }

        if disliked {
            for entry in library.disliked() {
                println!("{:>12}  {} - {}", entry.track_id, entry.artist_name, entry.track_name);
            }
            println!("{} disliked", library.disliked().len());
        } else {
            for entry in library.liked() {
                println!("{:>12}  {} - {}", entry.track_id, entry.artist_name, entry.track_name);
            }
            println!("{} liked", library.liked().len());
        }
        Ok(())
    }

    fn evaluations(
        &self,
        status: Option<EvaluationStatus>,
        limit: usize,
        offset: usize,
        delete: Option<String>,
    ) -> Result<()> {
        if !self.session.is_authenticated() {
            return Err(ClientError::Auth("Sign in to see your evaluations".to_string()));
        }
        self.runtime.block_on(self.session.ensure_fresh_token())?;

        if let Some(id) = delete {
            self.runtime.block_on(self.client.delete_evaluation(&id))?;
            println!("Deleted evaluation {}.", id);
            return Ok(());
        }

        let page = self
            .runtime
            .block_on(self.client.list_evaluations(status, limit, offset))?;
        for evaluation in &page.items {
            let title = evaluation
                .track
                .as_ref()
                .map(describe)
                .unwrap_or_else(|| evaluation.track_id.to_string());
            println!("{:>8}  {:<7}  {}", evaluation.id, evaluation.status.as_str(), title);
        }
        match page.meta.total {
            Some(total) => println!("{} of {}", page.items.len(), total),
            None => println!("{} shown", page.items.len()),
        }
        Ok(())
    }

    fn preview(&self, url: &str, seconds: u64) -> Result<()> {
        let track = Track::new("preview", "Preview", APP_NAME).with_preview_url(url);
        let mut player = AudioPlayer::new(RodioBackend::new());
        player.play_track(&track)?;

        let deadline = Instant::now() + Duration::from_secs(seconds);
        while Instant::now() < deadline {
            if player.poll().is_some() {
                println!("Preview finished.");
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(PLAYER_POLL_INTERVAL_MILLIS));
        }
        player.stop();
        println!("Stopped after {}s.", seconds);
        Ok(())
    }
}

fn describe(track: &Track) -> String {
    let mut line = format!("{} - {}", track.artist, track.title);
    if let Some(album) = &track.album {
        line.push_str(&format!(" [{}]", album));
    }
    if track.preview_url.is_none() && !track.is_instruction() {
        line.push_str(" (no preview)");
    }
    line
}
