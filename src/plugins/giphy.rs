use async_trait::async_trait;
use serde::Deserialize;
use twilight_model::id::{marker::UserMarker, Id};

use crate::discord::context::CommandContext;
use crate::discord::interaction::{Reply, ResponseData};
use crate::error::{Error, Result};
use crate::http::CallOptions;
use crate::plugins::{CommandSpec, OptionSpec, Plugin};
use crate::AppState;

const SEARCH_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    data: Vec<Gif>,
}

#[derive(Debug, Deserialize)]
struct Gif {
    images: Option<Images>,
}

#[derive(Debug, Deserialize)]
struct Images {
    original: Option<Rendition>,
}

#[derive(Debug, Deserialize)]
struct Rendition {
    url: Option<String>,
}

pub struct Giphy;

#[async_trait]
impl Plugin for Giphy {
    fn name(&self) -> &'static str {
        "giphy"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("giphy", "Grabs a random Giphy image based on your search")
            .brief("Grabs a random Giphy image")
            .usage("[search-terms]")
            .option(OptionSpec::string("query", "What to search for", true))]
    }

    async fn handle(&self, state: &AppState, ctx: CommandContext) -> Result<Reply> {
        let query = ctx.string("query").unwrap_or_default();
        do_giphy(state, query, ctx.invoker.id).await.map(Reply::Message)
    }
}

/// Search Giphy and open a paginator over the results that only `owner` can turn.
pub async fn do_giphy(state: &AppState, query: &str, owner: Id<UserMarker>) -> Result<ResponseData> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::Validation("I can't search for nothing!".into()));
    }
    let api_key = state
        .config
        .giphy_api_key
        .as_deref()
        .ok_or_else(|| Error::Validation("Giphy is not configured for this bot".into()))?;

    let results: SearchResults = state
        .http
        .get(
            &state.config.giphy_api_url,
            CallOptions::new()
                .use_cache()
                .param("q", query)
                .param("api_key", api_key)
                .param("limit", SEARCH_LIMIT.to_string()),
        )
        .await?
        .into_json()?
        .parse()?;

    let urls: Vec<String> = results
        .data
        .into_iter()
        .filter_map(|gif| gif.images?.original?.url)
        .map(|url| parse_url(&url))
        .collect();

    if urls.is_empty() {
        return Err(Error::Validation(format!(
            "No search results found for: *{query}*"
        )));
    }

    Ok(state.paginator.open(urls, Some(owner)).await)
}

/// Strip Giphy's tracking query from an image URL.
pub fn parse_url(url: &str) -> String {
    match url.find("?cid=") {
        Some(index) => url[..index].to_string(),
        None => url.to_string(),
    }
}
