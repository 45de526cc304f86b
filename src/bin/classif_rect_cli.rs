use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use classif_rect::config::{TabulateConfig, DEFAULT_WANT_RANK};
use classif_rect::{tabulate, ValueMode};

/// Produce rectangular matrices representing various counts in a
/// classifications database.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// sqlite database (output of `rppr prep_db` after `guppy classify`)
    database: PathBuf,

    /// output CSV file which counts results by taxon
    by_taxon: PathBuf,

    /// optional output CSV file which counts results by specimen (requires specimen map)
    by_specimen: Option<PathBuf>,

    /// optional output CSV file which groups results by specimen (requires specimen map)
    group_by_specimen: Option<PathBuf>,

    /// want_rank at which results are to be tabulated
    #[arg(short = 'r', long, value_name = "RANK", default_value = DEFAULT_WANT_RANK)]
    want_rank: String,

    /// input CSV map from sequences to specimens
    #[arg(short = 'm', long, value_name = "CSV")]
    specimen_map: Option<PathBuf>,

    /// input CSV map including a specimen column and other metadata; if
    /// specified gets merged in with by specimen output
    #[arg(short = 'M', long, value_name = "CSV")]
    metadata_map: Option<PathBuf>,

    /// by_taxon output has an average_frequency column instead of tally and
    /// placements columns, and by_specimen output uses frequency instead of tally
    #[arg(short = 'f', long)]
    frequencies: bool,
}

impl From<Args> for TabulateConfig {
    fn from(args: Args) -> Self {
        TabulateConfig {
            database: args.database,
            by_taxon: args.by_taxon,
            by_specimen: args.by_specimen,
            group_by_specimen: args.group_by_specimen,
            want_rank: args.want_rank,
            specimen_map: args.specimen_map,
            metadata_map: args.metadata_map,
            mode: if args.frequencies {
                ValueMode::Frequency
            } else {
                ValueMode::Tally
            },
        }
    }
}

fn spinner(msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ])
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(msg);
    spinner
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = TabulateConfig::from(Args::parse());

    // argument combinations are rejected before the database is opened;
    // clap prints the message with usage and exits 2
    if let Err(e) = config.validate() {
        Args::command().error(ErrorKind::ArgumentConflict, e).exit();
    }

    let spinner = spinner("Tabulating classifications...");
    match tabulate(&config) {
        Ok(summary) => {
            spinner.finish_with_message("Tabulation finished.");
            log::info!(
                "{} taxa, {} specimens, {} specimen/taxon pairs",
                summary.taxa,
                summary.specimens,
                summary.by_specimen_rows
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            spinner.abandon_with_message("Tabulation failed.");
            // not through the logger: RUST_LOG=off must still say what went wrong
            eprintln!("error: {}", e);
            if e.is_config() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(argv: &[&str]) -> TabulateConfig {
        TabulateConfig::from(Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn positionals_and_defaults() {
        let config = config_from(&["classif-rect", "placements.db", "by_taxon.csv"]);
        assert_eq!(config.database, PathBuf::from("placements.db"));
        assert_eq!(config.by_taxon, PathBuf::from("by_taxon.csv"));
        assert_eq!(config.by_specimen, None);
        assert_eq!(config.group_by_specimen, None);
        assert_eq!(config.want_rank, "species");
        assert_eq!(config.mode, ValueMode::Tally);
    }

    #[test]
    fn frequencies_flag_selects_frequency_mode() {
        let config = config_from(&[
            "classif-rect",
            "placements.db",
            "by_taxon.csv",
            "by_specimen.csv",
            "group.csv",
            "-f",
            "-r",
            "genus",
            "-m",
            "map.csv",
            "-M",
            "meta.csv",
        ]);
        assert_eq!(config.mode, ValueMode::Frequency);
        assert_eq!(config.want_rank, "genus");
        assert_eq!(config.by_specimen, Some(PathBuf::from("by_specimen.csv")));
        assert_eq!(config.group_by_specimen, Some(PathBuf::from("group.csv")));
        assert_eq!(config.specimen_map, Some(PathBuf::from("map.csv")));
        assert_eq!(config.metadata_map, Some(PathBuf::from("meta.csv")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn frequencies_without_by_specimen_fail_validation() {
        let config = config_from(&["classif-rect", "placements.db", "by_taxon.csv", "--frequencies"]);
        assert!(config.validate().unwrap_err().is_config());
    }
}
