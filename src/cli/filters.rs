use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::collections::BTreeMap;
use std::fs;

use super::open_context;
use crate::context::PrompterContext;
use crate::filter::Filter;

#[derive(Debug, Clone, Subcommand)]
pub enum FiltersAction {
    /// List saved filters
    List,
    /// Save a filter from text or a file (one "pattern" or "pattern||replacement" per line)
    Save {
        name: String,

        /// Filter text; use --separator to put several entries on one line
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// Read filter text from a file
        #[arg(short, long)]
        file: Option<String>,

        /// Entry separator for --text (default: newline)
        #[arg(long)]
        separator: Option<String>,
    },
    /// Print a filter in its editable text form
    Show { name: String },
    /// Delete a filter
    Delete { name: String },
    /// Import filters from a JSON object of name -> filter text; existing names are kept
    Import { file: String },
}

pub fn run(config_path: Option<String>, action: FiltersAction) -> Result<()> {
    let mut ctx = open_context(config_path)?;
    for line in execute(&mut ctx, action)? {
        println!("{}", line);
    }
    Ok(())
}

pub fn execute(ctx: &mut PrompterContext, action: FiltersAction) -> Result<Vec<String>> {
    match action {
        FiltersAction::List => Ok(ctx.filters().list_names()),
        FiltersAction::Save {
            name,
            text,
            file,
            separator,
        } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read filter file {}", path))?,
                (None, None) => bail!("Pass the filter as --text or --file"),
            };
            let filter = Filter::parse(&text, separator.as_deref());
            let entries = filter.substitutions().len() + filter.patterns().len();
            ctx.filters_mut().save(&name, filter)?;
            Ok(vec![format!("Saved filter '{}' ({} entries)", name, entries)])
        }
        FiltersAction::Show { name } => {
            let filter = ctx.filters().load(&name)?;
            Ok(filter.to_string().lines().map(str::to_string).collect())
        }
        FiltersAction::Delete { name } => {
            ctx.filters_mut().delete(&name)?;
            Ok(vec![format!("Deleted filter '{}'", name)])
        }
        FiltersAction::Import { file } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file))?;
            let texts: BTreeMap<String, String> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a JSON object of filter texts", file))?;
            let filters = texts
                .into_iter()
                .map(|(name, text)| (name, Filter::parse(&text, None)))
                .collect();
            let added = ctx.filters_mut().import_filters(filters)?;
            Ok(vec![format!("Imported {} new filter(s)", added)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> PrompterContext {
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());
        PrompterContext::from_config(config)
    }

    #[test]
    fn test_save_show_round_trips_text() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        execute(
            &mut ctx,
            FiltersAction::Save {
                name: "mine".into(),
                text: Some("solo||alone; *background".into()),
                file: None,
                separator: Some(";".into()),
            },
        )
        .unwrap();
        let shown = execute(&mut ctx, FiltersAction::Show { name: "mine".into() }).unwrap();
        assert_eq!(shown, vec!["solo||alone", "*background"]);
    }

    #[test]
    fn test_import_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        execute(
            &mut ctx,
            FiltersAction::Save {
                name: "a".into(),
                text: Some("x".into()),
                file: None,
                separator: None,
            },
        )
        .unwrap();
        let path = dir.path().join("import.json");
        fs::write(&path, r#"{"a": "y", "b": "z||w"}"#).unwrap();
        let out = execute(
            &mut ctx,
            FiltersAction::Import {
                file: path.to_string_lossy().into_owned(),
            },
        )
        .unwrap();
        assert_eq!(out, vec!["Imported 1 new filter(s)"]);
        assert_eq!(
            execute(&mut ctx, FiltersAction::List).unwrap(),
            vec!["a", "b"]
        );
        assert_eq!(
            execute(&mut ctx, FiltersAction::Show { name: "a".into() }).unwrap(),
            vec!["x"]
        );
    }

    #[test]
    fn test_save_requires_text_or_file() {
        let dir = TempDir::new().unwrap();
        let err = execute(
            &mut context(&dir),
            FiltersAction::Save {
                name: "a".into(),
                text: None,
                file: None,
                separator: None,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("--text or --file"));
    }
}
