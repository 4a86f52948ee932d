//! Roadwatch daemon: command-line entry point to the verification engine.
//!
//! Every subcommand opens the configured record store, runs one engine
//! operation (or a replay script) and prints the result as JSON on stdout.
//! Logs go to stderr.

mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use roadwatch_engine::storage::{open_media_store, open_record_store};
use roadwatch_engine::{
    EngineConfig, EngineError, EngineSettings, NewReport, ReportQuery, StaticIdentityGateway,
    StorageBackend, VerificationEngine,
};
use roadwatch_geo::NearFilter;
use roadwatch_store::BlobStore;
use roadwatch_types::{
    Category, Coordinates, Location, MediaHandle, PrincipalId, ReportId, ReportStatus,
};
use roadwatch_utils::LogFormat;
use serde::Serialize;
use serde_json::json;

#[derive(Parser)]
#[command(name = "roadwatch-daemon", about = "Crowd-sourced road report verification")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "ROADWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for record storage.
    #[arg(long, env = "ROADWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Record store backend.
    #[arg(long, value_enum, env = "ROADWATCH_BACKEND")]
    backend: Option<BackendArg>,

    /// Fail instead of opening the fallback backend when the primary is unavailable.
    #[arg(long, env = "ROADWATCH_NO_FALLBACK")]
    no_fallback: bool,

    /// Distinct corroborators needed to verify a report.
    #[arg(long, env = "ROADWATCH_QUORUM")]
    quorum: Option<u32>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "ROADWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "ROADWATCH_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Lmdb,
    Json,
    ContentAddressed,
}

impl From<BackendArg> for StorageBackend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Lmdb => StorageBackend::Lmdb,
            BackendArg::Json => StorageBackend::Json,
            BackendArg::ContentAddressed => StorageBackend::ContentAddressed,
        }
    }
}

#[derive(clap::Subcommand)]
enum Command {
    /// Submit a new report.
    Submit {
        #[arg(long)]
        submitter: String,
        /// congestion, construction, accident or normal.
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Short place name.
        #[arg(long, default_value = "")]
        place: String,
        #[arg(long, default_value = "")]
        address: String,
        /// Image file to upload to the media store.
        #[arg(long, conflicts_with = "media")]
        image: Option<PathBuf>,
        /// Handle of an already uploaded image.
        #[arg(long)]
        media: Option<String>,
        /// Caller-chosen report id; makes the submission safe to retry.
        #[arg(long)]
        id: Option<String>,
    },
    /// Confirm (or, with --reject, dispute) a pending report.
    Corroborate {
        report_id: String,
        #[arg(long)]
        voter: String,
        /// Cast a negative vote.
        #[arg(long)]
        reject: bool,
    },
    /// Verify a pending report as an administrator.
    Override {
        report_id: String,
        #[arg(long)]
        admin: String,
    },
    /// Reject a pending report as an administrator.
    Reject {
        report_id: String,
        #[arg(long)]
        admin: String,
    },
    /// List reports, newest first.
    Query {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Center longitude of a radius filter.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
        /// Center latitude of a radius filter.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Radius in meters.
        #[arg(long, default_value_t = roadwatch_geo::DEFAULT_RADIUS_M)]
        radius: f64,
    },
    /// Show one report.
    Report { report_id: String },
    /// Show one account.
    Account { principal: String },
    /// List every account.
    Accounts,
    /// Move tokens between accounts.
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        amount: u64,
    },
    /// Reports a principal submitted (default) or corroborated.
    History {
        principal: String,
        #[arg(long)]
        corroborated: bool,
    },
    /// Run a JSON-lines operation script.
    Replay {
        script: PathBuf,
        /// Print Prometheus metrics after the run.
        #[arg(long)]
        metrics: bool,
    },
    /// List the exported Prometheus metrics. Counters live per process; use
    /// `replay --metrics` to see the values a run produced.
    Metrics,
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend.into();
        if config.storage.fallback == Some(config.storage.backend) {
            config.storage.fallback = None;
        }
    }
    if cli.no_fallback {
        config.storage.fallback = None;
    }
    if let Some(quorum) = cli.quorum {
        config.params.quorum = quorum;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.validate()?;
    Ok(config)
}

fn principal(raw: &str) -> Result<PrincipalId, EngineError> {
    Ok(PrincipalId::new(raw)?)
}

fn report_id(raw: &str) -> Result<ReportId, EngineError> {
    Ok(ReportId::new(raw)?)
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_command(
    command: Command,
    engine: Arc<VerificationEngine>,
    config: &EngineConfig,
) -> anyhow::Result<Result<(), EngineError>> {
    macro_rules! engine_try {
        ($e:expr) => {
            match $e {
                Ok(v) => v,
                Err(err) => return Ok(Err(EngineError::from(err))),
            }
        };
    }

    match command {
        Command::Submit {
            submitter,
            category,
            description,
            lon,
            lat,
            place,
            address,
            image,
            media,
            id,
        } => {
            let category = engine_try!(category.parse::<Category>());
            let coordinates = engine_try!(Coordinates::new(lon, lat));
            let media_handle = match (image, media) {
                (Some(path), _) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let store = open_media_store(&config.storage)?;
                    let handle = tokio::task::spawn_blocking(move || store.put(&bytes))
                        .await?
                        .context("storing image")?;
                    tracing::info!(handle = %handle, "image stored");
                    Some(handle)
                }
                (None, Some(raw)) => Some(engine_try!(MediaHandle::new(raw))),
                (None, None) => None,
            };
            let location = Location {
                name: place,
                address,
                coordinates,
            };
            let mut new = NewReport::new(engine_try!(principal(&submitter)), category, location)
                .with_description(description);
            new.media_handle = media_handle;
            if let Some(raw) = id {
                new = new.with_report_id(engine_try!(report_id(&raw)));
            }
            print(&engine_try!(engine.submit(new).await))?;
        }
        Command::Corroborate {
            report_id: id,
            voter,
            reject,
        } => {
            let id = engine_try!(report_id(&id));
            let voter = engine_try!(principal(&voter));
            print(&engine_try!(engine.corroborate(&id, &voter, !reject).await))?;
        }
        Command::Override { report_id: id, admin } => {
            let id = engine_try!(report_id(&id));
            let admin = engine_try!(principal(&admin));
            let is_admin = engine_try!(engine.is_admin(&admin).await);
            print(&engine_try!(engine.admin_override(&id, &admin, is_admin).await))?;
        }
        Command::Reject { report_id: id, admin } => {
            let id = engine_try!(report_id(&id));
            let admin = engine_try!(principal(&admin));
            let is_admin = engine_try!(engine.is_admin(&admin).await);
            print(&engine_try!(engine.admin_reject(&id, &admin, is_admin).await))?;
        }
        Command::Query {
            status,
            category,
            lon,
            lat,
            radius,
        } => {
            let mut query = ReportQuery::default();
            if let Some(raw) = status {
                query = query.with_status(engine_try!(raw.parse::<ReportStatus>()));
            }
            if let Some(raw) = category {
                query = query.with_category(engine_try!(raw.parse::<Category>()));
            }
            if let (Some(lon), Some(lat)) = (lon, lat) {
                let center = engine_try!(Coordinates::new(lon, lat));
                let filter = NearFilter::new(center, radius)
                    .map_err(|e| EngineError::InvalidInput(e.to_string()));
                query = query.near(engine_try!(filter));
            }
            let set = engine_try!(engine.query(query).await);
            print(&set.to_vec())?;
        }
        Command::Report { report_id: id } => {
            let id = engine_try!(report_id(&id));
            print(&engine_try!(engine.report(&id).await))?;
        }
        Command::Account { principal: p } => {
            let p = engine_try!(principal(&p));
            print(&engine_try!(engine.account(&p).await))?;
        }
        Command::Accounts => {
            print(&engine_try!(engine.accounts().await))?;
        }
        Command::Transfer { from, to, amount } => {
            let from = engine_try!(principal(&from));
            let to = engine_try!(principal(&to));
            print(&engine_try!(engine.transfer(&from, &to, amount).await))?;
        }
        Command::History {
            principal: p,
            corroborated,
        } => {
            let p = engine_try!(principal(&p));
            let reports = if corroborated {
                engine_try!(engine.reports_corroborated_by(&p).await)
            } else {
                engine_try!(engine.reports_submitted_by(&p).await)
            };
            print(&reports)?;
        }
        Command::Replay { script, metrics } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let waves = replay::parse_script(&text)?;
            let total: usize = waves.iter().map(|w| w.len()).sum();
            tracing::info!(waves = waves.len(), operations = total, "replaying script");

            let results = replay::run(Arc::clone(&engine), waves).await?;
            for result in &results {
                println!("{}", serde_json::to_string(result)?);
            }
            let failed = results.iter().filter(|r| !r.ok).count();
            tracing::info!(operations = results.len(), failed, "replay finished");
            if metrics {
                print!("{}", engine.metrics().encode()?);
            }
        }
        Command::Metrics => {
            for (name, help) in engine.metrics().describe() {
                println!("{name}\t{help}");
            }
        }
    }
    Ok(Ok(()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let format: LogFormat = config.log_format.parse()?;
    roadwatch_utils::init_logging(format, &config.log_level);

    let (store, degraded) = open_record_store(&config.storage)?;
    if degraded {
        tracing::warn!("running on the fallback record store");
    }
    let identity = Arc::new(StaticIdentityGateway::from_config(&config.identity));
    let engine = Arc::new(VerificationEngine::new(
        store,
        identity,
        EngineSettings::from_config(&config),
    ));
    tracing::debug!(backend = engine.backend_name(), quorum = engine.params().quorum, "engine ready");

    if let Err(e) = run_command(cli.command, engine, &config).await? {
        println!("{}", json!({ "error": replay::error_json(&e) }));
        return Err(anyhow::Error::new(e).context("command failed"));
    }
    Ok(())
}
