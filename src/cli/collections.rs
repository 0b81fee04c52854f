use anyhow::{Context, Result};
use clap::Subcommand;

use super::{open_context, parse_params};
use crate::context::PrompterContext;
use crate::fetch::FileFetcher;

#[derive(Debug, Clone, Subcommand)]
pub enum CollectionsAction {
    /// List saved collections
    List {
        /// Only collections from this source
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Save a JSON dump of raw items as a named collection
    Import {
        name: String,

        /// JSON file holding an array of raw items
        #[arg(short, long)]
        input: String,

        /// Source the items came from
        #[arg(short, long)]
        source: String,

        /// Query the items were fetched with
        #[arg(long, default_value = "")]
        query: String,

        /// Source request parameter as key=value (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,

        /// Filter names to record with the collection (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },
    /// Show a collection's source, query and size
    Show { name: String },
    /// Delete a collection
    Delete { name: String },
}

pub fn run(config_path: Option<String>, action: CollectionsAction) -> Result<()> {
    let mut ctx = open_context(config_path)?;
    for line in execute(&mut ctx, action)? {
        println!("{}", line);
    }
    Ok(())
}

pub fn execute(ctx: &mut PrompterContext, action: CollectionsAction) -> Result<Vec<String>> {
    match action {
        CollectionsAction::List { source } => {
            let names = match &source {
                Some(wanted) => ctx
                    .collections()
                    .list_names_by(|data| data.source.eq_ignore_ascii_case(wanted)),
                None => ctx.collections().list_names(),
            };
            Ok(names)
        }
        CollectionsAction::Import {
            name,
            input,
            source,
            query,
            params,
            filters,
        } => {
            let options = parse_params(&params)?;
            let count = ctx
                .request(&FileFetcher::new(&input), &source, &query, usize::MAX, &options)
                .with_context(|| format!("Failed to import {}", input))?;
            ctx.save_active(&name, &filters)?;
            Ok(vec![format!("Saved {} item(s) as '{}'", count, name)])
        }
        CollectionsAction::Show { name } => {
            let data = ctx.collections().load(&name)?;
            let filters = data.filter_names();
            Ok(vec![
                format!("source:  {}", data.source),
                format!("query:   {}", data.query),
                format!("items:   {}", data.len()),
                format!(
                    "filters: {}",
                    if filters.is_empty() {
                        "-".to_string()
                    } else {
                        filters.join(", ")
                    }
                ),
            ])
        }
        CollectionsAction::Delete { name } => {
            ctx.collections_mut().delete(&name)?;
            Ok(vec![format!("Deleted collection '{}'", name)])
        }
    }
}
