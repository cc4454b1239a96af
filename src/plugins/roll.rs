use async_trait::async_trait;
use rand::Rng;

use crate::discord::context::CommandContext;
use crate::discord::embeds::{basic_embed, with_thumbnail, COLOR_GOLD};
use crate::discord::interaction::{Reply, ResponseData};
use crate::error::{Error, Result};
use crate::plugins::{CommandSpec, OptionSpec, Plugin};
use crate::AppState;

pub const ICON_URL: &str = "https://cdn.icon-icons.com/icons2/1465/PNG/512/678gamedice_100992.png";

const DEFAULT_MIN: i64 = 1;
const DEFAULT_MAX: i64 = 100;

pub struct Roller;

#[async_trait]
impl Plugin for Roller {
    fn name(&self) -> &'static str {
        "roll"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("roll", "Rolls a random number in a given range")
            .brief("Rolls a number")
            .usage("[minimum] [maximum] (defaults to 1-100)")
            .option(OptionSpec::integer("minimum", "Lowest possible roll", false))
            .option(OptionSpec::integer("maximum", "Highest possible roll", false))]
    }

    async fn handle(&self, _state: &AppState, ctx: CommandContext) -> Result<Reply> {
        let min = ctx.integer("minimum").unwrap_or(DEFAULT_MIN);
        let max = ctx.integer("maximum").unwrap_or(DEFAULT_MAX);
        do_roll(min, max).map(Reply::Message)
    }
}

pub fn do_roll(min: i64, max: i64) -> Result<ResponseData> {
    let number = roll_number(min, max)?;
    let embed = with_thumbnail(
        basic_embed("RNG Roller", &format!("You rolled a {number}"), COLOR_GOLD),
        ICON_URL,
    );
    Ok(ResponseData::embed(embed))
}

/// Uniform over `[min, max]`, both ends included
pub fn roll_number(min: i64, max: i64) -> Result<i64> {
    if min > max {
        return Err(Error::Validation(format!(
            "The minimum ({min}) can't be larger than the maximum ({max})"
        )));
    }
    Ok(rand::rng().random_range(min..=max))
}
