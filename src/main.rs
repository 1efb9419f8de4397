use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;

use parlsent::config::{AnalysisConfig, Config};
use parlsent::models::{FactionId, GroupingKeys};
use parlsent::output::{export, terminal};
use parlsent::pipeline::run::{self, AnalysisInputs, RunRequest};
use parlsent::sentiment::scores::JsonlSentimentScores;
use parlsent::speeches::store::JsonlSpeechStore;
use parlsent::stats::correction::Correction;
use parlsent::stats::significance::TestKind;
use parlsent::topics::assignments::JsonlTopicAssignments;
use parlsent::{db, stats, status};

/// Parlsent: topic–sentiment comparison for parliamentary speeches.
///
/// Joins speeches with topic assignments and sentiment scores, consolidates
/// raw topics into a curated taxonomy, and tests whether two factions speak
/// about each topic with different sentiment.
#[derive(Parser)]
#[command(name = "parlsent", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the results database
    Init,

    /// Show and validate the active topic mapping
    Mapping,

    /// Merge the inputs and show the sample accounting
    Merge {
        /// Write the merged records to this JSON file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Descriptive sentiment statistics per group
    Aggregate {
        /// Grouping keys, comma-separated (faction, topic, year)
        #[arg(long, default_value = "faction,topic,year")]
        keys: GroupingKeys,

        /// Write the group statistics to this JSON file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Compare two factions topic by topic
    Compare {
        #[command(flatten)]
        comparison: ComparisonArgs,

        /// Write the comparisons to this JSON file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Full analysis: merge, aggregate, compare, and store the run
    Run {
        #[command(flatten)]
        comparison: ComparisonArgs,

        /// Grouping keys for the descriptive table
        #[arg(long, default_value = "faction,topic,year")]
        keys: GroupingKeys,

        /// Write the complete run output to this JSON file
        #[arg(long)]
        json: Option<PathBuf>,

        /// Free-text label stored with the run
        #[arg(long)]
        note: Option<String>,

        /// Don't store the run in the results database
        #[arg(long)]
        no_save: bool,
    },

    /// List stored runs, or show the comparisons of one run
    History {
        /// Max runs to list (default: 10)
        #[arg(long, default_value = "10")]
        limit: u32,

        /// Show the stored comparisons of this run id
        #[arg(long)]
        show: Option<i64>,
    },

    /// Show system status (inputs, DB stats, latest run)
    Status,
}

#[derive(Args)]
struct ComparisonArgs {
    /// First faction's party code (default: 4, CDU/CSU)
    #[arg(long, default_value = "4")]
    faction_a: i32,

    /// Second faction's party code (default: 23, SPD)
    #[arg(long, default_value = "23")]
    faction_b: i32,

    /// Compare per (topic, year) instead of per topic
    #[arg(long)]
    by_year: bool,

    /// Override PARLSENT_TEST (mann-whitney, welch, chi-square)
    #[arg(long)]
    test: Option<TestKind>,

    /// Override PARLSENT_CORRECTION (holm, bonferroni, benjamini-hochberg)
    #[arg(long)]
    correction: Option<Correction>,

    /// Override PARLSENT_ALPHA
    #[arg(long)]
    alpha: Option<f64>,
}

impl ComparisonArgs {
    fn apply(&self, analysis: &mut AnalysisConfig) {
        if let Some(test) = self.test {
            analysis.test = test;
        }
        if let Some(correction) = self.correction {
            analysis.correction = correction;
        }
        if let Some(alpha) = self.alpha {
            analysis.alpha = alpha;
        }
    }

    fn request(&self, grouping: GroupingKeys) -> RunRequest {
        RunRequest {
            faction_a: FactionId(self.faction_a),
            faction_b: FactionId(self.faction_b),
            by_year: self.by_year,
            grouping,
        }
    }
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("parlsent=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing parlsent database...");
            let config = Config::load()?;
            let conn = db::initialize(&config.db_path)?;
            let table_count = db::schema::table_count(&conn)?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nParlsent is ready. Next step: set up your .env file");
            println!("  (see .env.example for required variables)");
            println!("\nThen run: {NEXT_STEP_HINT}");
        }

        Commands::Mapping => {
            let config = Config::load()?;
            terminal::display_mapping(&config.analysis.mapping);
            config.require_valid_analysis()?;
            println!("\n{}", "Mapping is valid for the configured analysis.".green());
        }

        Commands::Merge { json } => {
            let config = Config::load()?;
            config.require_valid_analysis()?;
            let inputs = load_inputs(&config)?;
            let prepared = run::prepare(&inputs, &config.analysis)?;

            terminal::display_merge_report(&prepared.merge_report);
            terminal::display_consolidation_report(&prepared.consolidation_report);
            println!("\nRecords ready for analysis: {}", prepared.records.len());

            if let Some(path) = json {
                export::write_json(&path, &prepared.records)?;
                println!("Merged records written to {}", path.display());
            }
        }

        Commands::Aggregate { keys, json } => {
            let config = Config::load()?;
            config.require_valid_analysis()?;
            let inputs = load_inputs(&config)?;
            let prepared = run::prepare(&inputs, &config.analysis)?;
            let group_stats = stats::aggregate::aggregate(&prepared.records, keys, &config.analysis);

            terminal::display_group_stats(&group_stats);

            if let Some(path) = json {
                export::write_json(&path, &group_stats)?;
                println!("Group statistics written to {}", path.display());
            }
        }

        Commands::Compare { comparison, json } => {
            let mut config = Config::load()?;
            comparison.apply(&mut config.analysis);
            config.require_valid_analysis()?;
            let request = comparison.request(GroupingKeys::FACTION_TOPIC);

            let inputs = load_inputs(&config)?;
            let prepared = run::prepare(&inputs, &config.analysis)?;
            let results = stats::compare::compare(
                &prepared.records,
                request.faction_a,
                request.faction_b,
                request.by_year,
                &config.analysis,
            )?;

            terminal::display_comparisons(&results);
            println!(
                "  Correction: {}  |  alpha: {}",
                config.analysis.correction, config.analysis.alpha
            );

            if let Some(path) = json {
                export::write_json(&path, &results)?;
                println!("Comparisons written to {}", path.display());
            }
        }

        Commands::Run {
            comparison,
            keys,
            json,
            note,
            no_save,
        } => {
            let mut config = Config::load()?;
            comparison.apply(&mut config.analysis);
            config.require_valid_analysis()?;
            let request = comparison.request(keys);

            let inputs = load_inputs(&config)?;
            let output = run::run(&inputs, &config.analysis, &request)?;

            terminal::display_merge_report(&output.merge_report);
            terminal::display_consolidation_report(&output.consolidation_report);
            terminal::display_comparisons(&output.comparisons);

            if let Some(path) = json {
                export::write_json(&path, &output)?;
                println!("Run output written to {}", path.display());
            }

            if no_save {
                println!("{}", "Run not stored (--no-save).".dimmed());
            } else {
                let conn = db::initialize(&config.db_path)?;
                let run_id = db::queries::save_run(&conn, &output, note.as_deref())?;
                info!(run_id, "Stored analysis run");
                println!(
                    "Stored as run #{run_id}. View it again with: {}",
                    history_hint(run_id)
                );
            }
        }

        Commands::History { limit, show } => {
            let config = Config::load()?;
            let conn = db::open(&config.db_path)?;

            match show {
                Some(run_id) => {
                    let Some(run) = db::queries::get_run(&conn, run_id)? else {
                        anyhow::bail!("No stored run with id {run_id}");
                    };
                    terminal::display_run_history(std::slice::from_ref(&run));
                    terminal::display_merge_report(&run.merge_report);
                    terminal::display_consolidation_report(&run.consolidation_report);
                    let comparisons = db::queries::get_comparisons(&conn, run_id)?;
                    terminal::display_comparisons(&comparisons);
                }
                None => {
                    let runs = db::queries::list_runs(&conn, limit)?;
                    terminal::display_run_history(&runs);
                }
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            status::show(&config)?;
        }
    }

    Ok(())
}

/// Printed after `init`.
const NEXT_STEP_HINT: &str = "parlsent merge";

fn history_hint(run_id: i64) -> String {
    format!("parlsent history --show {run_id}")
}

/// Load the three JSON Lines inputs, with a small progress bar.
fn load_inputs(config: &Config) -> Result<AnalysisInputs> {
    let (speeches_path, topics_path, sentiment_path) = config.require_inputs()?;

    let speeches = JsonlSpeechStore::new(speeches_path);
    let topics = JsonlTopicAssignments::new(topics_path);
    let sentiments = JsonlSentimentScores::new(sentiment_path);

    let pb = ProgressBar::new(3);
    pb.set_style(ProgressStyle::default_bar().template("  Loading [{bar:30}] {pos}/{len} {msg}")?);

    pb.set_message("speeches");
    let speeches = AnalysisInputs::collect_speeches(&speeches)?;
    pb.inc(1);
    pb.set_message("topics");
    let topics = AnalysisInputs::collect_topics(&topics)?;
    pb.inc(1);
    pb.set_message("sentiment");
    let sentiments = AnalysisInputs::collect_sentiments(&sentiments)?;
    pb.inc(1);
    pb.finish_and_clear();

    Ok(AnalysisInputs {
        speeches,
        topics,
        sentiments,
    })
}
