use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use super::{open_context, parse_params, parse_ratings};
use crate::context::{PrompterContext, RenderRequest};
use crate::fetch::FileFetcher;
use crate::filter::Filter;

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Render from a saved collection
    #[arg(short, long, conflicts_with = "input")]
    pub collection: Option<String>,

    /// Render from a JSON dump of raw items (requires --source)
    #[arg(short, long, requires = "source")]
    pub input: Option<String>,

    /// Source the --input items came from (Derpibooru, E621, Danbooru)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Query recorded with --input items
    #[arg(long, default_value = "")]
    pub query: String,

    /// Source request parameter as key=value (repeatable)
    #[arg(long = "param")]
    pub params: Vec<String>,

    /// Formatter name or model id (e.g. "pdv56", "EasyFluff (no artist names)")
    #[arg(short, long)]
    pub model: Option<String>,

    /// Prompt template; "{prompt}" expands to the model's default template
    #[arg(short, long)]
    pub template: Option<String>,

    /// Number of prompts (default: from config)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Allowed rating (repeatable): safe, questionable, explicit
    #[arg(short, long = "rating")]
    pub ratings: Vec<String>,

    /// Saved filter to apply (repeatable)
    #[arg(short, long = "filter")]
    pub filters: Vec<String>,

    /// Ad-hoc filter, comma separated (e.g. "solo||alone, *background")
    #[arg(long)]
    pub filter_text: Option<String>,

    /// Save the loaded items as a collection before rendering
    #[arg(long)]
    pub save: Option<String>,
}

pub fn run(config_path: Option<String>, args: RenderArgs) -> Result<()> {
    let mut ctx = open_context(config_path)?;
    for prompt in render(&mut ctx, args)? {
        println!("{}", prompt);
    }
    Ok(())
}

/// Load the requested items into `ctx` and render prompts from them.
pub fn render(ctx: &mut PrompterContext, args: RenderArgs) -> Result<Vec<String>> {
    match (&args.collection, &args.input) {
        (Some(name), None) => {
            ctx.load_collection(name)
                .with_context(|| format!("Failed to load collection '{}'", name))?;
        }
        (None, Some(path)) => {
            let source = args
                .source
                .as_deref()
                .context("--source is required with --input")?;
            let options = parse_params(&args.params)?;
            let loaded = ctx.request(
                &FileFetcher::new(path),
                source,
                &args.query,
                usize::MAX,
                &options,
            )?;
            info!("Loaded {} item(s) from {}", loaded, path);
        }
        (Some(_), Some(_)) => bail!("Use either --collection or --input, not both"),
        (None, None) => bail!("Nothing to render: pass --collection or --input"),
    }

    if let Some(name) = &args.save {
        ctx.save_active(name, &args.filters)?;
    }

    let request = RenderRequest {
        model: args.model,
        template: args.template,
        count: args.count.unwrap_or(ctx.config().render.default_count),
        ratings: parse_ratings(&args.ratings)?,
        filters: args.filters,
        extra_filter: args.filter_text.map(|text| Filter::parse(&text, Some(","))),
    };
    Ok(ctx.render_prompts(&request)?)
}
