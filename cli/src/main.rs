use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use encoding_rs::Encoding;
use serde::Serialize;
use simfell_engine::apl::parse_document;
use simfell_engine::{
    Character, DamageShare, DpsSummary, SimFellConfiguration, Simulation, SimulationConfig,
    TrialConfig, TrialRunner,
};
use tracing::Level;

const DEFAULT_DURATION: f64 = 120.0;
const STAT_WEIGHTS_ENEMIES: u32 = 4;

#[derive(Subcommand)]
enum Cmd {
    /// Parse an action-priority-list document and print it as JSON
    Parse {
        /// Path to the document
        #[arg(long)]
        file: PathBuf,
    },
    /// Mean, min and max DPS over many seeded runs
    AverageDps {
        #[command(flatten)]
        build: BuildArgs,
        #[command(flatten)]
        trials: TrialArgs,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Relative DPS gain from adding points to one stat at a time
    StatWeights {
        #[command(flatten)]
        build: BuildArgs,
        #[command(flatten)]
        trials: TrialArgs,
        /// Points added per stat
        #[arg(long, default_value_t = 20)]
        gain: u32,
        /// Print the weights as JSON
        #[arg(long)]
        json: bool,
    },
    /// A single deterministic run with a decision trace
    DebugSim {
        #[command(flatten)]
        build: BuildArgs,
        /// Print the run result (trace included) as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Action-priority-list document describing the character and rotation
    #[arg(long)]
    file: Option<PathBuf>,
    /// Hero archetype when no document is given
    #[arg(long, default_value = "rime")]
    hero: String,
    /// Built-in stat preset
    #[arg(long, conflicts_with_all = ["file", "custom_character"])]
    preset: Option<String>,
    /// Stat points as intellect-crit-expertise-haste-spirit, e.g. 100-120-80-90-40
    #[arg(long, conflicts_with = "file")]
    custom_character: Option<String>,
    /// Talent tree, one dash-separated group per row, e.g. 2-12-3
    #[arg(long, conflicts_with = "file")]
    talents: Option<String>,
    /// Fight length in seconds; overrides the document
    #[arg(long)]
    duration: Option<f64>,
    /// Enemy count; overrides the document
    #[arg(long)]
    enemies: Option<u32>,
}

#[derive(Args)]
struct TrialArgs {
    /// Number of runs
    #[arg(long, default_value_t = 2000)]
    runs: u32,
    /// Base seed; run i uses seed + i
    #[arg(long, default_value_t = 12345)]
    seed: u64,
    /// Run every trial on the current thread
    #[arg(long)]
    sequential: bool,
}

#[derive(Parser)]
#[command(name = "simfell")]
#[command(about = "SimFell DPS rotation simulator")]
struct Cli {
    /// Log engine decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

/// A character ready to simulate plus the fight it is simulated in.
struct Setup {
    character: Character,
    duration: f64,
    enemies: u32,
}

impl BuildArgs {
    fn setup(&self, default_enemies: u32) -> Result<Setup> {
        let (character, duration, enemies) = match &self.file {
            Some(path) => {
                let config = read_document(path)?;
                let character = Character::from_config(&config)
                    .with_context(|| format!("failed to build character from {}", path.display()))?;
                (character, config.duration as f64, config.enemies)
            }
            None => {
                let mut character = match (&self.preset, &self.custom_character) {
                    (_, Some(stats)) => Character::from_stat_string(&self.hero, stats)?,
                    (Some(preset), None) => Character::from_preset(&self.hero, preset)?,
                    (None, None) => Character::from_preset(&self.hero, "default")?,
                };
                if let Some(tree) = &self.talents {
                    character.add_talents_from_string(tree)?;
                }
                character.use_default_rotation()?;
                (character, DEFAULT_DURATION, default_enemies)
            }
        };
        Ok(Setup {
            character,
            duration: self.duration.unwrap_or(duration),
            enemies: self.enemies.unwrap_or(enemies),
        })
    }
}

impl TrialArgs {
    fn config(&self, stat_gain: u32) -> TrialConfig {
        TrialConfig {
            runs: self.runs,
            seed: self.seed,
            parallel: !self.sequential,
            stat_gain,
        }
    }
}

#[derive(Serialize)]
struct AverageReport<'a> {
    name: &'a str,
    duration: f64,
    enemies: u32,
    summary: &'a DpsSummary,
    breakdown: Vec<DamageShare>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Parse { file } => {
            let config = read_document(&file)?;
            println!("{}", config.parsed_json()?);
        }
        Cmd::AverageDps {
            build,
            trials,
            json,
        } => {
            let setup = build.setup(1)?;
            let sim = SimulationConfig::new(setup.duration, setup.enemies);
            let runner = TrialRunner::new(sim, trials.config(TrialConfig::default().stat_gain));
            let summary = runner.run(&setup.character)?;
            let report = AverageReport {
                name: &setup.character.name,
                duration: setup.duration,
                enemies: setup.enemies,
                summary: &summary,
                breakdown: summary.damage_breakdown(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_average(&report, &setup.character);
            }
        }
        Cmd::StatWeights {
            build,
            trials,
            gain,
            json,
        } => {
            let setup = build.setup(STAT_WEIGHTS_ENEMIES)?;
            let sim = SimulationConfig::new(setup.duration, setup.enemies);
            let weights = TrialRunner::new(sim, trials.config(gain)).stat_weights(&setup.character)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&weights)?);
            } else {
                print_header("Stat Weights", &setup);
                println!(
                    "baseline {:.2} DPS, +{} points per stat",
                    weights.baseline, weights.gain
                );
                for w in &weights.weights {
                    println!("  {:<10} {:>8.4}  {:>10.2} DPS", w.stat.name(), w.weight, w.dps);
                }
            }
        }
        Cmd::DebugSim { build, json } => {
            let setup = build.setup(1)?;
            let config = SimulationConfig::debug(setup.duration, setup.enemies);
            let result = Simulation::new(setup.character.clone(), config)?.run()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_header("Debug Simulation", &setup);
                for line in &result.trace {
                    println!("{}", line);
                }
                println!("DPS: {:.2}", result.dps);
                print_breakdown(&result.damage_breakdown(), setup.duration);
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_text_auto(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", path.display()))
    }
}

fn read_document(path: &Path) -> Result<SimFellConfiguration> {
    let text = read_text_auto(path)?;
    let config =
        parse_document(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}

fn print_header(title: &str, setup: &Setup) {
    let c = &setup.character;
    let p = c.points();
    println!("{} - {} ({})", title, c.name, c.hero().name());
    println!("  duration  {}s", setup.duration);
    println!("  enemies   {}", setup.enemies);
    println!(
        "  stats     int {} / crit {} / exp {} / haste {} / spirit {}",
        p.intellect, p.crit, p.expertise, p.haste, p.spirit
    );
    let talents: Vec<&str> = c.talents().collect();
    if !talents.is_empty() {
        println!("  talents   {}", talents.join(", "));
    }
}

fn print_average(report: &AverageReport<'_>, character: &Character) {
    println!(
        "Average DPS - {} ({}, {} runs)",
        report.name,
        character.hero().name(),
        report.summary.runs
    );
    println!("  duration  {}s", report.duration);
    println!("  enemies   {}", report.enemies);
    println!("Average DPS: {:.2}", report.summary.mean);
    println!("Min DPS:     {:.2}", report.summary.min);
    println!("Max DPS:     {:.2}", report.summary.max);
    print_breakdown(&report.breakdown, report.duration);
}

fn print_breakdown(rows: &[DamageShare], duration: f64) {
    if rows.is_empty() {
        return;
    }
    println!("{:<20} {:>12} {:>10} {:>7}", "Spell", "Damage", "DPS", "Share");
    for row in rows {
        println!(
            "{:<20} {:>12.2} {:>10.2} {:>6.2}%",
            row.spell,
            row.damage,
            row.damage / duration,
            row.share * 100.0
        );
    }
}
