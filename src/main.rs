use anyhow::{bail, Context, Result};
use krosmoz_import::{
    characteristic::CharacteristicResolver,
    cli::{parse_variables, Cli, Commands, SourceArgs},
    collect::{parse_filters, DofusDbClient, Page},
    config::Paths,
    entity::ALL_KINDS,
    formula,
    logging::{init_logging, LogConfig},
    pipeline::{ImportOptions, Orchestrator, OrchestratorResult},
    rules::JsonRuleLoader,
    store::{schema::default_table, SqliteStore},
};
use serde::Serialize;
use std::time::Instant;

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Everything a run needs, built from the global flags
struct Runtime {
    paths: Paths,
    resolver: CharacteristicResolver,
}

impl Runtime {
    fn load(cli: &Cli) -> Result<Self> {
        let paths = Paths::resolve(
            cli.rules_dir.clone(),
            cli.characteristics.clone(),
            cli.database.clone(),
        )?;
        let resolver = CharacteristicResolver::load(&paths.catalog)
            .with_context(|| format!("Failed to load characteristics: {:?}", paths.catalog))?;
        tracing::debug!(characteristics = resolver.len(), rules = ?paths.rules_dir, "configuration loaded");
        Ok(Self { paths, resolver })
    }

    fn run(
        &self,
        source: &SourceArgs,
        options: &ImportOptions,
        run: impl FnOnce(&mut Orchestrator<'_>, &ImportOptions) -> OrchestratorResult,
    ) -> Result<OrchestratorResult> {
        let collector = DofusDbClient::new(source.base_url.as_str())?;
        let rules = JsonRuleLoader::new(self.paths.rules_dir.clone());
        let mut store = SqliteStore::open(&self.paths.database)?;
        let mut orchestrator = Orchestrator::new(&collector, &rules, &mut store, &self.resolver);
        Ok(run(&mut orchestrator, options))
    }
}

fn finish(result: &OrchestratorResult, started: Instant) -> Result<()> {
    print_json(result)?;
    tracing::info!(elapsed = %format!("{:.1}s", started.elapsed().as_secs_f64()), "done");
    if !result.success {
        bail!("{}", result.message);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(&LogConfig::from_verbosity(cli.verbose, cli.quiet).with_format(cli.log_format))?;

    match &cli.command {
        Commands::Import { kind, id, source, run } => {
            let started = Instant::now();
            let runtime = Runtime::load(&cli)?;
            let options = run.import_options(&source.lang);
            let result = runtime.run(source, &options, |orchestrator, options| {
                orchestrator.run_one(&source.source, *kind, id, options)
            })?;
            finish(&result, started)?;
        }

        Commands::ImportMany {
            kind,
            filters,
            limit,
            offset,
            source,
            run,
        } => {
            let started = Instant::now();
            let runtime = Runtime::load(&cli)?;
            let filters = parse_filters(filters)?;
            let page = Page {
                limit: *limit,
                offset: *offset,
            };
            let options = run.import_options(&source.lang);
            let result = runtime.run(source, &options, |orchestrator, options| {
                orchestrator.run_many(&source.source, *kind, &filters, page, options)
            })?;
            finish(&result, started)?;
        }

        Commands::Fit { characteristic, kind } => {
            let runtime = Runtime::load(&cli)?;
            let Some(suggestion) = runtime.resolver.suggest_conversion(characteristic, *kind) else {
                bail!("No conversion samples for {} ({})", characteristic, kind);
            };
            print_json(&suggestion)?;
        }

        Commands::Formula { expression, vars } => {
            let variables = parse_variables(vars)?;
            if formula::FormulaTable::parse(expression).is_none() {
                formula::parse(expression).with_context(|| format!("Invalid formula {:?}", expression))?;
            }
            match formula::evaluate(expression, &variables) {
                Some(value) => println!("{}", value),
                None => bail!("Formula {:?} did not evaluate (missing variable or division by zero)", expression),
            }
        }

        Commands::ListKinds => {
            println!("Entity kinds:\n");
            for kind in ALL_KINDS {
                println!("  {:<12} {:<10} {}", kind.as_str(), kind.group().as_str(), default_table(*kind));
            }
        }
    }

    Ok(())
}
