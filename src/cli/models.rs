use anyhow::Result;

use super::open_context;
use crate::data::Model;
use crate::sources::{SourceRegistry, TagSource};

pub fn run(config_path: Option<String>, source: Option<String>) -> Result<()> {
    let ctx = open_context(config_path)?;
    for line in describe(ctx.registry(), source.as_deref())? {
        println!("{}", line);
    }
    Ok(())
}

/// Model ids, then each source's formatters and request parameters.
pub fn describe(registry: &SourceRegistry, source: Option<&str>) -> Result<Vec<String>> {
    let sources: Vec<&dyn TagSource> = match source {
        Some(name) => vec![registry.get(name)?],
        None => registry.iter().collect(),
    };

    let mut lines = vec!["Models:".to_string()];
    lines.extend(
        Model::ALL
            .iter()
            .map(|m| format!("  {:<10} {}", m.id(), m.display_name())),
    );

    for source in sources {
        lines.push(String::new());
        lines.push(format!("{} ({})", source.name(), source.syntax_help_url()));
        for formatter in source.formatters() {
            let marker = if formatter.is_default { " [default]" } else { "" };
            lines.push(format!("  {}{}", formatter.name, marker));
        }
        for param in source.query_params() {
            lines.push(format!(
                "  --param {}=<{}>: {}",
                param.name,
                param.display_name,
                param.options.join(" | ")
            ));
        }
    }
    Ok(lines)
}
