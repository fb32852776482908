//! Init command implementation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use archgate::config::{CONFIG_FILE_NAME, DEFAULT_CONFIG};

const DEFAULT_RULES_FILE: &str = "archgate.rules";

const DEFAULT_RULES: &str = r#"# archgate rules
#
# rule <id> ["display name"]: deny|warn|allow node|dependency
#   [within <condition>] when <condition>
#   [severity info|warning|error] [message "..."] [description "..."]
#
# Node fields: id fqname name kind language layer container context file attr.<key>
# Dependency fields: dep_type src.<node field> dst.<node field>

# rule no-domain-to-infra "Domain must not depend on infrastructure": deny dependency
#   when src.layer = "domain" and dst.layer = "infrastructure"
"#;

/// Runs the init command in `dir`. Returns the files written.
pub fn run(dir: &Path, force: bool) -> Result<Vec<PathBuf>> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    let rules_path = dir.join(DEFAULT_RULES_FILE);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    let mut written = vec![config_path];

    if force || !rules_path.exists() {
        std::fs::write(&rules_path, DEFAULT_RULES)
            .with_context(|| format!("Failed to write {}", rules_path.display()))?;
        written.push(rules_path);
    }

    for path in &written {
        println!("Created {}", path.display());
    }
    println!("\nNext steps:");
    println!("  1. Point `fragments` in {CONFIG_FILE_NAME} at your extractor output");
    println!("  2. Add rules to {DEFAULT_RULES_FILE}");
    println!("  3. Run: archgate check");

    Ok(written)
}
