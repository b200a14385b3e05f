use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::collect::{DEFAULT_BASE_URL, DEFAULT_PAGE_LIMIT, SOURCE};
use crate::entity::EntityKind;
use crate::formula::Variables;
use crate::logging::LogFormat;
use crate::pipeline::ImportOptions;
use crate::store::StoreOptions;

#[derive(Parser, Debug)]
#[command(name = "krosmoz-import")]
#[command(version, about = "Import DofusDB game entities into the Krosmoz JDR data model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    /// Mapping rules directory (contains one folder per source)
    #[arg(long, global = true)]
    pub rules_dir: Option<PathBuf>,

    /// Characteristic catalogue (JSON)
    #[arg(long, global = true)]
    pub characteristics: Option<PathBuf>,

    /// SQLite database receiving imported records
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import one record and everything it references
    Import {
        kind: EntityKind,

        /// Source identifier of the record
        id: String,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Import one page of records
    ImportMany {
        kind: EntityKind,

        /// Source query filter (repeatable)
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Suggest a conversion formula from a characteristic's stored samples
    Fit {
        /// Characteristic key (e.g. life_creature)
        characteristic: String,

        kind: EntityKind,
    },

    /// Evaluate a formula
    Formula {
        expression: String,

        /// Variable binding (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },

    /// List entity kinds and their tables
    ListKinds,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Source database
    #[arg(long, default_value = SOURCE)]
    pub source: String,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Preferred language of localized fields
    #[arg(long, default_value = "fr")]
    pub lang: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Collect only, print the raw record
    #[arg(long)]
    pub raw_only: bool,

    #[arg(long)]
    pub no_validate: bool,

    /// Convert and validate without writing
    #[arg(long)]
    pub no_integrate: bool,

    /// Do not import referenced records
    #[arg(long)]
    pub no_relations: bool,

    /// Resolve the writes without performing them
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite records that already exist
    #[arg(long)]
    pub force_update: bool,

    /// Integrate even when validation fails
    #[arg(long)]
    pub ignore_unvalidated: bool,

    /// Field never written, as `field` or `table.field` (repeatable)
    #[arg(long = "exclude-field", value_name = "FIELD")]
    pub exclude_fields: Vec<String>,
}

impl RunArgs {
    pub fn import_options(&self, lang: &str) -> ImportOptions {
        if self.raw_only {
            return ImportOptions {
                lang: lang.to_string(),
                ..ImportOptions::raw_only()
            };
        }
        ImportOptions {
            convert: true,
            validate: !self.no_validate,
            integrate: !self.no_integrate,
            include_relations: !self.no_relations,
            lang: lang.to_string(),
            store: StoreOptions {
                dry_run: self.dry_run,
                force_update: self.force_update,
                ignore_unvalidated: self.ignore_unvalidated,
                exclude_fields: self.exclude_fields.clone(),
            },
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Parse `--var name=value` bindings
pub fn parse_variables(args: &[String]) -> Result<Variables> {
    let mut variables = Variables::new();
    for arg in args {
        let Some((name, value)) = arg.split_once('=') else {
            bail!("Invalid variable {:?}, expected name=value", arg);
        };
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("Variable {:?} is not a number", name.trim()))?;
        variables.insert(name.trim().to_string(), value);
    }
    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_flags() {
        let cli = Cli::try_parse_from([
            "krosmoz-import",
            "import",
            "monster",
            "31",
            "--dry-run",
            "--no-relations",
            "--exclude-field",
            "image",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Import { kind, id, source, run } = cli.command else {
            panic!("expected import");
        };
        assert_eq!(kind, EntityKind::Monster);
        assert_eq!(id, "31");
        assert_eq!(source.base_url, DEFAULT_BASE_URL);

        let options = run.import_options(&source.lang);
        assert!(options.store.dry_run);
        assert!(!options.include_relations);
        assert!(options.validate);
        assert_eq!(options.store.exclude_fields, vec!["image".to_string()]);
    }

    #[test]
    fn test_raw_only_disables_processing() {
        let cli = Cli::try_parse_from(["krosmoz-import", "import", "spell", "201", "--raw-only"]).unwrap();
        let Commands::Import { run, source, .. } = cli.command else {
            panic!("expected import");
        };
        assert!(!run.import_options(&source.lang).wants_processing());
    }

    #[test]
    fn test_parse_variables() {
        let vars = parse_variables(&["x=150".to_string(), " level = 3.5".to_string()]).unwrap();
        assert_eq!(vars["x"], 150.0);
        assert_eq!(vars["level"], 3.5);
        assert!(parse_variables(&["x".to_string()]).is_err());
        assert!(parse_variables(&["x=abc".to_string()]).is_err());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["krosmoz-import", "import", "dragon", "1"]).is_err());
    }

    #[test]
    fn test_import_many_flags() {
        let cli = Cli::try_parse_from([
            "krosmoz-import",
            "import-many",
            "resource",
            "--filter",
            "typeId=15",
            "--limit",
            "10",
        ])
        .unwrap();
        let Commands::ImportMany { kind, filters, limit, offset, .. } = cli.command else {
            panic!("expected import-many");
        };
        assert_eq!(kind, EntityKind::Resource);
        assert_eq!(filters, vec!["typeId=15".to_string()]);
        assert_eq!((limit, offset), (10, 0));
    }
}
