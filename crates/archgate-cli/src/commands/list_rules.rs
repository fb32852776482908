//! List rules command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use archgate::rules::explain_rule;
use archgate::Engine;

/// Prints every rule that `check` would evaluate, in evaluation order.
pub fn run(path: &Path, explicit: Option<&Path>) -> Result<()> {
    let config = super::load_config(path, explicit)?;
    let rules = Engine::new(config)
        .load_rules()
        .context("Failed to load rules")?;

    if rules.is_empty() {
        println!("No rules configured.");
        return Ok(());
    }

    println!("{} rule(s):\n", rules.len());
    for rule in &rules {
        println!("{}", explain_rule(rule));
        if let Some(location) = &rule.location {
            println!("  defined at {location}");
        }
        println!();
    }
    Ok(())
}
