//! Binary entrypoint for the civprogress CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the data directory
//! - `status` - identity, hearts, score, unlocks and open civilizations
//! - `unlock <target>` / `check <target>` - achievements and artifacts by id or name
//! - `migrate` - move pre-namespacing unlock flags into the current scope
//! - `civ-unlock <name>` / `civ-check <name>` - civilization gate
//! - `hearts <n>` / `score <n>` / `reset` - record updates
//!
//! Every command accepts `--identity <id>` (log in and load that identity's
//! progress first) and `--teacher` (use the teacher namespace). Without
//! `--identity` the last recorded login is used for key scoping and no record
//! is loaded.
//!
//! See the library crate docs for module-level details: `civprogress::`.
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use civprogress::config::Config;
use civprogress::progress::{
    CivilizationGate, FileProfileStore, Identity, IdentityResolver, KeyValueStore,
    OfflineProfileStore, ProgressSession, Registry, RemoteProfileStore, Role, ScopedStore,
    SledKvStore, StoredAuthSession, UnlockCoordinator,
};

#[derive(Parser)]
#[command(name = "civprogress")]
#[command(about = "Identity-scoped learner progress for civilization lessons")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log in as this identity before running the command
    #[arg(short, long, global = true)]
    identity: Option<String>,

    /// Act in the teacher namespace instead of the student one
    #[arg(long, global = true)]
    teacher: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Show progress for the current identity
    Status,
    /// Unlock an achievement or artifact by id or name
    Unlock { target: String },
    /// Check whether an achievement or artifact is unlocked
    Check { target: String },
    /// Migrate unscoped legacy unlock flags into the current identity
    Migrate,
    /// Unlock a civilization for everyone on this device
    CivUnlock { name: String },
    /// Check whether a civilization is open
    CivCheck { name: String },
    /// Set remaining hearts (clamped to 0..=3)
    Hearts { value: i64 },
    /// Set score (negative values become 0)
    Score { value: i64 },
    /// Start the current identity's progress over
    Reset,
}

struct Services {
    session: Arc<ProgressSession>,
    coordinator: UnlockCoordinator,
    civilizations: CivilizationGate,
    auth: StoredAuthSession,
    remote_enabled: bool,
}

impl Services {
    fn build(config: &Config, role: Role) -> Result<Self> {
        std::fs::create_dir_all(&config.storage.data_dir)?;
        let kv: Arc<dyn KeyValueStore> = Arc::new(SledKvStore::open(config.kv_path())?);

        let remote: Arc<dyn RemoteProfileStore> = if config.remote.enabled {
            Arc::new(FileProfileStore::with_limit(
                config.profile_dir(),
                config.remote.max_profile_bytes,
            )?)
        } else {
            Arc::new(OfflineProfileStore)
        };
        let session = Arc::new(ProgressSession::new(remote));

        let resolver = IdentityResolver::new(role)
            .with_session(session.clone())
            .with_auth(Arc::new(StoredAuthSession::new(kv.clone())), kv.clone());

        let registry = match &config.progress.registry_seed {
            Some(path) => Registry::from_json_file(path)?,
            None => Registry::builtin()?,
        };

        let coordinator = UnlockCoordinator::new(
            Arc::new(registry),
            session.clone(),
            ScopedStore::new(kv.clone(), resolver),
            kv.clone(),
        )
        .with_options(config.unlock_options());

        let civilizations =
            CivilizationGate::with_names(kv.clone(), config.progress.civilizations.clone())
                .with_session(session.clone());

        Ok(Self {
            session,
            coordinator,
            civilizations,
            auth: StoredAuthSession::new(kv),
            remote_enabled: config.remote.enabled,
        })
    }

    async fn login(&self, id: &str, role: Role) -> Result<()> {
        let identity = Identity::new(id, role);
        self.session.login(identity.clone()).await?;
        if let Err(e) = self.auth.record_login(&identity) {
            warn!("Could not remember login: {}", e);
        }
        self.coordinator.on_session_ready();
        Ok(())
    }

    async fn finish(&self) {
        self.coordinator.save();
        if self.remote_enabled && self.session.is_loaded() {
            if let Err(e) = self.session.flush_remote().await {
                warn!("Remote profile sync failed: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new civprogress configuration");
        Config::create_default(&cli.config).await?;
        let config = Config::load(&cli.config).await?;
        tokio::fs::create_dir_all(&config.storage.data_dir).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    config.validate()?;
    init_logging(&Some(config.clone()), cli.verbose);

    let role = if cli.teacher { Role::Teacher } else { Role::Student };
    let services = Services::build(&config, role)?;

    if let Some(id) = &cli.identity {
        services.login(id, role).await?;
    }

    let coordinator = &services.coordinator;
    match cli.command {
        Commands::Init => {}
        Commands::Status => {
            let identity = coordinator.scoped().identity();
            println!("Identity: {} ({})", identity.id, identity.role);
            match (coordinator.hearts(), coordinator.score()) {
                (Some(hearts), Some(score)) => println!("Hearts: {}  Score: {}", hearts, score),
                _ => println!("No progress loaded (use --identity to log in)"),
            }
            let unlocked = coordinator.unlocked_definitions();
            if unlocked.is_empty() {
                println!("Unlocked: none");
            }
            for definition in unlocked {
                println!("  [{}] {} - {}", definition.id, definition.title, definition.description);
            }
            println!(
                "Civilizations: {}",
                services.civilizations.available_civilizations().join(", ")
            );
        }
        Commands::Unlock { target } => {
            if coordinator.unlock(&target) {
                println!("Unlocked {}", target);
            } else {
                println!("Unknown achievement or artifact: {}", target);
            }
        }
        Commands::Check { target } => {
            let unlocked = coordinator.is_unlocked(&target);
            println!("{}: {}", target, if unlocked { "unlocked" } else { "locked" });
        }
        Commands::Migrate => {
            let migrated = coordinator.migrate_legacy();
            if coordinator.scoped().identity().is_sentinel() {
                println!("No identity to migrate into (use --identity to log in)");
            } else if migrated.is_empty() {
                println!("Nothing to migrate");
            } else {
                println!("Migrated: {}", migrated.join(", "));
            }
        }
        Commands::CivUnlock { name } => {
            if services.civilizations.unlock_civilization(&name) {
                println!("{} unlocked", name);
            } else {
                println!("Unknown civilization: {}", name);
            }
        }
        Commands::CivCheck { name } => {
            let open = services.civilizations.is_civilization_unlocked(&name);
            println!("{}: {}", name, if open { "unlocked" } else { "locked" });
        }
        Commands::Hearts { value } => {
            if coordinator.set_hearts(value) {
                println!("Hearts: {}", coordinator.hearts().unwrap_or_default());
            } else {
                println!("No progress loaded (use --identity to log in)");
            }
        }
        Commands::Score { value } => {
            if coordinator.set_score(value) {
                println!("Score: {}", coordinator.score().unwrap_or_default());
            } else {
                println!("No progress loaded (use --identity to log in)");
            }
        }
        Commands::Reset => {
            if coordinator.reset_progress() {
                println!("Progress reset");
            } else {
                println!("No progress loaded (use --identity to log in)");
            }
        }
    }

    services.finish().await;
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level_filter())
        .unwrap_or(log::LevelFilter::Info);
    let level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match log_file {
        Some(file) => {
            let file = std::sync::Mutex::new(file);
            // Echo to the console only when a human is watching
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let line = format!(
                    "{} [{}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.args()
                );
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                writeln!(
                    fmt,
                    "{} [{}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.args()
                )
            });
        }
    }
    let _ = builder.try_init();
}
