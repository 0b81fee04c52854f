pub mod collections;
pub mod filters;
pub mod models;
pub mod render;

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::Config;
use crate::context::PrompterContext;
use crate::data::Rating;

pub(crate) fn open_context(config_path: Option<String>) -> Result<PrompterContext> {
    let config = Config::load_with_path(config_path)?;
    Ok(PrompterContext::from_config(config))
}

pub(crate) fn parse_ratings(ratings: &[String]) -> Result<Vec<Rating>> {
    let mut parsed = Vec::new();
    for rating in ratings {
        match Rating::from_str(rating)? {
            Rating::Unknown => bail!("'{}' cannot be used as a rating filter", rating),
            r if !parsed.contains(&r) => parsed.push(r),
            _ => {}
        }
    }
    Ok(parsed)
}

/// Parse repeated `key=value` request parameters.
pub(crate) fn parse_params(params: &[String]) -> Result<BTreeMap<String, String>> {
    let mut parsed = BTreeMap::new();
    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            bail!("Invalid parameter '{}', expected key=value", param);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid parameter '{}', key is empty", param);
        }
        parsed.insert(key.to_string(), value.trim().to_string());
    }
    Ok(parsed)
}
