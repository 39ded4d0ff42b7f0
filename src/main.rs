// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! qsubstrate command-line tool
//!
//! Runs substrate definitions through the simulator and inspects
//! configuration.
//!
//! # Usage
//!
//! ```bash
//! # Evolve a definition for 10 time units and print the final state
//! qsubstrate simulate forest.yaml --duration 10 --prepare sun
//!
//! # Run four seeded instances through the round-robin scheduler
//! qsubstrate simulate forest.yaml --instances 4 --seed 7 --measure
//!
//! # Print the operator cache key of a definition
//! qsubstrate cache-key forest.yaml
//!
//! # Validate configuration and a definition
//! qsubstrate validate forest.yaml
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quantum_substrate::{
    cache::CacheKey, computer::QuantumComputer, config::Config, declaration::SubstrateDefinition,
    scheduler::EvolutionScheduler, validation, Error, Result, VERSION,
};

/// Density-matrix substrate simulator
#[derive(Parser)]
#[command(name = "qsubstrate")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Simulate declaratively coupled qubit substrates")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve a substrate definition and print its final state as JSON
    Simulate(SimulateArgs),

    /// Print the operator cache key of a definition
    CacheKey {
        /// Substrate definition (YAML or JSON)
        definition: PathBuf,
    },

    /// Validate configuration and, optionally, a definition
    Validate {
        /// Substrate definition (YAML or JSON)
        definition: Option<PathBuf>,
    },

    /// Show effective configuration
    Config,
}

#[derive(Args)]
struct SimulateArgs {
    /// Substrate definition (YAML or JSON)
    definition: PathBuf,

    /// Simulated time to cover
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// Scheduler tick interval
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Independent copies evolved round-robin
    #[arg(long, default_value_t = 1)]
    instances: usize,

    /// Labels occupied at t = 0 (comma separated); default is ground
    #[arg(long, value_delimiter = ',')]
    prepare: Vec<String>,

    /// Measurement seed (instance i uses seed + i)
    #[arg(long, env = "QSUB_SEED")]
    seed: Option<u64>,

    /// Largest integration substep
    #[arg(long)]
    max_dt: Option<f64>,

    /// Slots evolved per scheduler tick
    #[arg(long)]
    batch_size: Option<usize>,

    /// Pre-evolve every instance before the first tick
    #[arg(long)]
    prime: bool,

    /// Measure all axes at the end
    #[arg(long)]
    measure: bool,

    /// Reject invalid declarations instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Build operators without the cache
    #[arg(long)]
    no_cache: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_logging(&config.logging.level, &config.logging.format);

    match cli.command {
        Commands::Simulate(args) => {
            // Override config with CLI args
            if let Some(seed) = args.seed {
                config.evolution.seed = Some(seed);
            }
            if let Some(max_dt) = args.max_dt {
                config.evolution.max_dt = max_dt;
            }
            if let Some(batch_size) = args.batch_size {
                config.scheduler.batch_size = batch_size;
            }
            if args.strict {
                config.validation.strict = true;
            }
            if args.no_cache {
                config.cache.enabled = false;
            }

            config.validate()?;
            simulate(&config, &args)?;
        }

        Commands::CacheKey { definition } => {
            let def = SubstrateDefinition::load(&definition)?;
            let key = CacheKey::compute(&def.name, &def.declarations)?;
            println!("{}", key);
        }

        Commands::Config => {
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate { definition } => {
            if let Err(e) = config.validate() {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
            println!("Configuration is valid");

            if let Some(path) = definition {
                let checked = SubstrateDefinition::load(&path).and_then(|def| {
                    validation::validate_definition(&def, &config.validation.limits)
                        .map(|register| (def, register))
                });
                match checked {
                    Ok((def, register)) => {
                        println!(
                            "Definition '{}' is valid ({} axes, {} declarations)",
                            def.name,
                            register.num_qubits(),
                            def.declarations.len()
                        );
                    }
                    Err(e) => {
                        eprintln!("Definition error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Initialize logging with tracing. Logs go to stderr so stdout stays
/// machine-readable.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn simulate(config: &Config, args: &SimulateArgs) -> Result<()> {
    if !(args.dt.is_finite() && args.dt > 0.0) {
        return Err(Error::Config(format!("--dt must be positive, got {}", args.dt)));
    }
    if !(args.duration.is_finite() && args.duration >= 0.0) {
        return Err(Error::Config(format!(
            "--duration must be non-negative, got {}",
            args.duration
        )));
    }

    let definition = SubstrateDefinition::load(&args.definition)?;
    validation::validate_qubit_count(definition.axes.len(), &config.validation.limits)?;
    let cache = config.cache.open();

    let mut scheduler = EvolutionScheduler::new(config.scheduler.clone());
    for i in 0..args.instances.max(1) {
        let mut settings = config.evolution.clone();
        settings.seed = settings.seed.map(|s| s.wrapping_add(i as u64));

        let mut qc = QuantumComputer::new(&definition.name, settings)?
            .with_strict_validation(config.validation.strict);
        for axis in &definition.axes {
            qc.allocate_axis(&axis.north, &axis.south)?;
        }
        qc.build_operators(&definition.declarations, cache.as_ref())?;
        if !args.prepare.is_empty() {
            qc.prepare_basis_state(&args.prepare)?;
        }
        scheduler.register(&format!("{}#{}", definition.name, i), qc, 0.0);
    }

    if args.prime {
        scheduler.prime_lookahead_buffers();
    }

    let ticks = (args.duration / args.dt).ceil() as usize;
    let mut failures = 0;
    for k in 1..=ticks {
        let now = (k as f64 * args.dt).min(args.duration);
        failures += scheduler.tick(now).failures().count();
    }
    // Let every slot catch up to the final time.
    for _ in 0..scheduler.len().div_ceil(scheduler.batch_size()) {
        failures += scheduler.tick(args.duration).failures().count();
    }

    if let Some(cache) = &cache {
        let stats = cache.stats();
        info!(hits = stats.hits, misses = stats.misses, "Operator cache");
    }

    let mut reports = Vec::with_capacity(scheduler.len());
    for index in 0..scheduler.len() {
        let Some(qc) = scheduler.get_mut(index) else {
            continue;
        };

        if let Err(e) =
            validation::validate_density_matrix(qc.density_matrix(), config.evolution.trace_tolerance)
        {
            warn!(system = %qc.name(), error = %e, "Final state failed validation");
        }

        let mut populations = BTreeMap::new();
        for label in qc.register().labels() {
            populations.insert(label.to_string(), qc.get_population(label)?);
        }
        let diagnostics = qc.diagnostics();
        let mutual_information = qc.all_mutual_information();
        let build = qc.build_summary().cloned();

        let measured = if args.measure {
            let basis = qc.measure_all_qubits()?;
            let labels: Vec<String> = qc
                .register()
                .basis_to_labels(basis)?
                .into_iter()
                .map(String::from)
                .collect();
            Some(json!({ "basis": basis, "labels": labels }))
        } else {
            None
        };

        reports.push(json!({
            "instance": index,
            "populations": populations,
            "diagnostics": diagnostics,
            "mutual_information": mutual_information,
            "build": build,
            "measured": measured,
        }));
    }

    info!(
        instances = scheduler.len(),
        duration = args.duration,
        failures,
        "Simulation finished"
    );
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
