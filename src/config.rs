use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const CATALOG_FILE: &str = "characteristics.json";
const RULES_DIR: &str = "rules";
const DATABASE_FILE: &str = "krosmoz.sqlite";

/// Locations of the rule files, the characteristic catalogue and the
/// database. Flags override the per-user defaults.
#[derive(Debug, Clone)]
pub struct Paths {
    pub rules_dir: PathBuf,
    pub catalog: PathBuf,
    pub database: PathBuf,
}

impl Paths {
    pub fn resolve(
        rules_dir: Option<PathBuf>,
        catalog: Option<PathBuf>,
        database: Option<PathBuf>,
    ) -> Result<Self> {
        if let (Some(rules_dir), Some(catalog), Some(database)) = (&rules_dir, &catalog, &database) {
            return Ok(Self {
                rules_dir: rules_dir.clone(),
                catalog: catalog.clone(),
                database: database.clone(),
            });
        }

        let proj_dirs = ProjectDirs::from("", "", "krosmoz-import")
            .context("Could not determine configuration directory")?;
        Ok(Self::with_defaults(
            proj_dirs.config_dir(),
            proj_dirs.data_dir(),
            rules_dir,
            catalog,
            database,
        ))
    }

    fn with_defaults(
        config_dir: &Path,
        data_dir: &Path,
        rules_dir: Option<PathBuf>,
        catalog: Option<PathBuf>,
        database: Option<PathBuf>,
    ) -> Self {
        Self {
            rules_dir: rules_dir.unwrap_or_else(|| config_dir.join(RULES_DIR)),
            catalog: catalog.unwrap_or_else(|| config_dir.join(CATALOG_FILE)),
            database: database.unwrap_or_else(|| data_dir.join(DATABASE_FILE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let paths = Paths::with_defaults(
            Path::new("/etc/krosmoz"),
            Path::new("/var/krosmoz"),
            Some(PathBuf::from("config/rules")),
            None,
            None,
        );
        assert_eq!(paths.rules_dir, PathBuf::from("config/rules"));
        assert_eq!(paths.catalog, PathBuf::from("/etc/krosmoz/characteristics.json"));
        assert_eq!(paths.database, PathBuf::from("/var/krosmoz/krosmoz.sqlite"));
    }
}
