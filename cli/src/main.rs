mod config;
mod error_formatter;
mod formatter;
#[cfg(feature = "server")]
mod server;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use formatter::{Formatter, TestOutcome};
use rulemancer::{serializers, Environment, RulemancerError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "rulemancer")]
#[command(about = "Rules for rule-based games.")]
#[command(
    long_about = "Rulemancer runs CLIPS-style rule bases for turn-based games.\nThe CLI replays test moves against a rule pool, prints working memory, and serves game rooms over HTTP."
)]
#[command(version)]
struct Cli {
    /// JSON config file (default: rulemancer.json in the working directory, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log engine activity at debug level
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay test moves against the rule pool
    ///
    /// Loads every file of the rule pool in name order, resets and runs the
    /// engine, then asserts the content of each test pool file as one fact
    /// and runs again. Prints rule output, a pass/fail table and the final
    /// working memory.
    Test {
        /// Directory holding the rule files
        #[arg(short = 'r', long)]
        rulepool: Option<PathBuf>,
        /// Directory holding one fact per file
        #[arg(short = 't', long)]
        testpool: Option<PathBuf>,
    },
    /// Print working memory after reset and run
    ///
    /// Prints the pretty form of every fact, one per line, or the facts of
    /// a single relation.
    Facts {
        /// Directory holding the rule files
        #[arg(short = 'r', long)]
        rulepool: Option<PathBuf>,
        /// Only print facts of this relation
        #[arg(long)]
        relation: Option<String>,
        /// Print facts as JSON objects
        #[arg(long)]
        json: bool,
        /// Print facts as a table of ids and pretty forms
        #[arg(long, conflicts_with = "json")]
        table: bool,
    },
    /// Show templates, deffacts and rules of the rule pool
    Show {
        /// Directory holding the rule files
        #[arg(short = 'r', long)]
        rulepool: Option<PathBuf>,
    },
    /// Start the HTTP room server (default: 127.0.0.1:3000)
    ///
    /// Every room has its own working memory, built from the rule pool or
    /// from one of the configured games when the room is created. With
    /// --debug, raw fact assertion and fact dumps are served too.
    Serve {
        /// Directory holding the rule files
        #[arg(short = 'r', long)]
        rulepool: Option<PathBuf>,
        /// Host address to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// PEM certificate chain; serves HTTPS together with --tls-key
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// PEM private key of the certificate
        #[arg(long)]
        tls_key: Option<PathBuf>,
        /// Key API tokens are signed with (default: $RULEMANCER_JWT_SECRET)
        #[arg(long)]
        secret: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = Config::load(cli.config.as_deref()).and_then(|config| {
        init_tracing(cli.debug || config.debug);

        match &cli.command {
            Commands::Test { rulepool, testpool } => test_command(
                &config,
                rulepool.as_deref().unwrap_or(&config.rule_pool),
                testpool.as_deref().unwrap_or(&config.test_pool),
            ),
            Commands::Facts {
                rulepool,
                relation,
                json,
                table,
            } => {
                let style = if *json {
                    FactsStyle::Json
                } else if *table {
                    FactsStyle::Table
                } else {
                    FactsStyle::Text
                };
                facts_command(
                    &config,
                    rulepool.as_deref().unwrap_or(&config.rule_pool),
                    relation.as_deref(),
                    style,
                )
            }
            Commands::Show { rulepool } => {
                show_command(&config, rulepool.as_deref().unwrap_or(&config.rule_pool))
            }
            Commands::Serve {
                rulepool,
                host,
                port,
                tls_cert,
                tls_key,
                secret,
            } => server_command(
                &config,
                ServeOptions {
                    rulepool: rulepool.as_deref().unwrap_or(&config.rule_pool),
                    host: host.as_deref().unwrap_or(&config.host),
                    port: port.unwrap_or(config.port),
                    tls_cert: tls_cert.as_deref().or(config.tls_cert_file.as_deref()),
                    tls_key: tls_key.as_deref().or(config.tls_key_file.as_deref()),
                    secret: secret
                        .clone()
                        .or_else(|| config.jwt_secret.clone())
                        .or_else(|| std::env::var(SECRET_ENV).ok()),
                    debug: cli.debug || config.debug,
                },
            ),
        }
    });

    if let Err(e) = result {
        if let Some(rule_err) = e.downcast_ref::<RulemancerError>() {
            eprintln!("{}", error_formatter::format_error(rule_err));
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "rulemancer=debug,tower_http=debug"
    } else {
        "rulemancer=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn test_command(config: &Config, rulepool: &Path, testpool: &Path) -> Result<()> {
    let mut env = Environment::with_limits(config.limits.clone());
    load_rule_pool(&mut env, rulepool)?;
    env.reset()?;
    let fired = env.run(None)?;
    debug!(fired, "initial run");
    print!("{}", env.take_output());

    let mut outcomes = Vec::new();
    for path in pool_files(testpool, "Test pool")? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let result = run_test_file(&mut env, &path);
        match &result {
            Ok(fired) => info!(test = %name, fired, "test passed"),
            Err(message) => warn!(test = %name, error = %message, "test failed"),
        }
        print!("{}", env.take_output());
        outcomes.push(TestOutcome { name, result });
    }

    let formatter = Formatter::default();
    print!("{}", formatter.format_test_summary(&outcomes));
    println!();
    let dump = env.dump_facts().context("Cannot allocate fact dump")?;
    print!("{}", formatter.format_facts(&dump));

    Ok(())
}

/// Assert the whole file as one fact, then run. Errors come back rendered.
fn run_test_file(env: &mut Environment, path: &Path) -> Result<usize, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    env.assert_string(&text)
        .map_err(|e| error_formatter::format_error(&e))?;
    env.run(None).map_err(|e| error_formatter::format_error(&e))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FactsStyle {
    Text,
    Json,
    Table,
}

fn facts_command(
    config: &Config,
    rulepool: &Path,
    relation: Option<&str>,
    style: FactsStyle,
) -> Result<()> {
    let mut env = Environment::with_limits(config.limits.clone());
    load_rule_pool(&mut env, rulepool)?;
    env.reset()?;
    env.run(None)?;
    let output = env.take_output();
    let facts = env
        .facts()
        .filter(|fact| relation.map_or(true, |r| fact.relation == r));

    match style {
        FactsStyle::Json => {
            eprint!("{}", output);
            println!(
                "{}",
                serde_json::to_string_pretty(&serializers::facts_to_json(facts))?
            );
        }
        FactsStyle::Table => {
            print!("{}", output);
            let facts: Vec<_> = facts.collect();
            let formatter = Formatter::default();
            if facts.is_empty() {
                print!("{}", formatter.format_facts(""));
            } else {
                println!("{}", formatter.format_facts_table(facts));
            }
        }
        FactsStyle::Text => {
            print!("{}", output);
            let dump = match relation {
                Some(relation) => env.dump_facts_by_relation(relation),
                None => env.dump_facts(),
            }
            .context("Cannot allocate fact dump")?;
            print!("{}", Formatter::default().format_facts(&dump));
            if relation.is_some() && !dump.is_empty() {
                println!();
            }
        }
    }

    Ok(())
}

fn show_command(config: &Config, rulepool: &Path) -> Result<()> {
    let mut env = Environment::with_limits(config.limits.clone());
    load_rule_pool(&mut env, rulepool)?;
    print!("{}", Formatter::default().format_inventory(env.constructs()));
    Ok(())
}

/// Environment variable read when no token secret is given
const SECRET_ENV: &str = "RULEMANCER_JWT_SECRET";

struct ServeOptions<'a> {
    rulepool: &'a Path,
    host: &'a str,
    port: u16,
    tls_cert: Option<&'a Path>,
    tls_key: Option<&'a Path>,
    secret: Option<String>,
    debug: bool,
}

fn server_command(config: &Config, options: ServeOptions) -> Result<()> {
    #[cfg(feature = "server")]
    {
        use server::http::{start_server, AppState};
        use server::tls::TlsFiles;
        use server::Game;
        use tokio::runtime::Runtime;

        let tls_files = match (options.tls_cert, options.tls_key) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert: cert.to_path_buf(),
                key: key.to_path_buf(),
            }),
            (None, None) => None,
            _ => bail!("HTTPS needs both a TLS certificate and a TLS key"),
        };

        let pool = Game::pool(
            options.rulepool.display().to_string(),
            rule_sources(options.rulepool, "Rule pool")?,
            config.limits.clone(),
        )?;

        let mut games = Vec::new();
        for location in &config.games {
            let loaded = rule_sources(location, "Game").and_then(|sources| {
                Ok(Game::load(
                    location.display().to_string(),
                    sources,
                    config.limits.clone(),
                )?)
            });
            match loaded {
                Ok(game) => {
                    info!(game = %game.name, location = %location.display(), "loaded game");
                    games.push(game);
                }
                Err(e) => {
                    tracing::error!(location = %location.display(), "Cannot load game: {:#}", e)
                }
            }
        }

        let state = AppState::new(pool, games, options.secret, options.debug);
        let rt = Runtime::new()?;
        rt.block_on(start_server(state, options.host, options.port, tls_files))?;
    }

    #[cfg(not(feature = "server"))]
    {
        let _ = (config, options);
        eprintln!("Error: Server feature not enabled");
        eprintln!("Recompile with: cargo build --features server");
        std::process::exit(1);
    }

    Ok(())
}

/// Every file of a rule directory, read into memory in name order
#[cfg(feature = "server")]
fn rule_sources(dir: &Path, what: &str) -> Result<Vec<server::RuleSource>> {
    let mut sources = Vec::new();
    for path in pool_files(dir, what)? {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        sources.push(server::RuleSource {
            source_id: path.display().to_string(),
            text,
        });
    }
    Ok(sources)
}

/// Regular files directly inside `dir`, sorted by name
fn pool_files(dir: &Path, what: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} {} is not a directory", what, dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Load every file of the rule pool in name order
fn load_rule_pool(env: &mut Environment, rulepool: &Path) -> Result<()> {
    let files = pool_files(rulepool, "Rule pool")?;
    if files.is_empty() {
        warn!(pool = %rulepool.display(), "rule pool is empty");
    }
    for path in files {
        env.load(&path)?;
    }
    Ok(())
}
