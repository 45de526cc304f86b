//src/config.rs

use std::path::PathBuf;

use crate::error::{Result, TabulateError};

pub const DEFAULT_WANT_RANK: &str = "species";

/// Which per-specimen value the wide by-specimen table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueMode {
    /// Summed mass.
    #[default]
    Tally,
    /// Summed mass divided by the specimen's total mass.
    Frequency,
}

/// Everything one tabulation run needs, passed explicitly to `tabulate`.
#[derive(Debug, Clone)]
pub struct TabulateConfig {
    /// SQLite database written by `rppr prep_db` after `guppy classify`.
    pub database: PathBuf,
    pub by_taxon: PathBuf,
    pub by_specimen: Option<PathBuf>,
    pub group_by_specimen: Option<PathBuf>,
    pub want_rank: String,
    /// Headerless two-column CSV: sequence name, specimen.
    pub specimen_map: Option<PathBuf>,
    /// CSV with a `specimen` column; every other column is a metadata field.
    pub metadata_map: Option<PathBuf>,
    pub mode: ValueMode,
}

impl TabulateConfig {
    pub fn new(database: impl Into<PathBuf>, by_taxon: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            by_taxon: by_taxon.into(),
            by_specimen: None,
            group_by_specimen: None,
            want_rank: DEFAULT_WANT_RANK.to_string(),
            specimen_map: None,
            metadata_map: None,
            mode: ValueMode::Tally,
        }
    }

    pub fn frequencies(&self) -> bool {
        self.mode == ValueMode::Frequency
    }

    /// True when the per-specimen query has to run at all.
    pub fn wants_specimen_query(&self) -> bool {
        self.by_specimen.is_some() || self.group_by_specimen.is_some()
    }

    /// Pre-flight checks, run before the database is touched.
    pub fn validate(&self) -> Result<()> {
        if self.by_specimen.is_some() && self.specimen_map.is_none() {
            return Err(TabulateError::Config(
                "specimen map is required for by-specimen output".into(),
            ));
        }
        if self.group_by_specimen.is_some() && self.specimen_map.is_none() {
            return Err(TabulateError::Config(
                "specimen map is required for group-by-specimen output".into(),
            ));
        }
        if self.frequencies() && self.by_specimen.is_none() {
            return Err(TabulateError::Config(
                "must compute by-specimen in order to compute frequencies".into(),
            ));
        }
        if self.want_rank.trim().is_empty() {
            return Err(TabulateError::Config("want rank must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> TabulateConfig {
        TabulateConfig::new("classifications.db", "by_taxon.csv")
    }

    #[test]
    fn defaults_are_valid() {
        let config = base();
        assert_eq!(config.want_rank, "species");
        assert_eq!(config.mode, ValueMode::Tally);
        assert!(config.validate().is_ok());
        assert!(!config.wants_specimen_query());
    }

    #[test]
    fn by_specimen_requires_specimen_map() {
        let mut config = base();
        config.by_specimen = Some("by_specimen.csv".into());
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("specimen map is required"));

        config.specimen_map = Some("map.csv".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn group_by_specimen_requires_specimen_map() {
        let mut config = base();
        config.group_by_specimen = Some("group.csv".into());
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn frequencies_require_by_specimen() {
        let mut config = base();
        config.mode = ValueMode::Frequency;
        config.specimen_map = Some("map.csv".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("frequencies"));

        config.by_specimen = Some("by_specimen.csv".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_rank_rejected() {
        let mut config = base();
        config.want_rank = "  ".into();
        assert!(config.validate().unwrap_err().is_config());
    }
}
