use twilight_model::channel::message::embed::{Embed, EmbedField, EmbedFooter, EmbedThumbnail};

pub const COLOR_CONFIRM: u32 = 0x2ECC71; // Green
pub const COLOR_DENY: u32 = 0xE74C3C; // Red
pub const COLOR_GOLD: u32 = 0xF1C40F;
pub const COLOR_DARK_BLUE: u32 = 0x206694;

pub fn basic_embed(title: &str, description: &str, color: u32) -> Embed {
    Embed {
        author: None,
        color: Some(color),
        description: (!description.is_empty()).then(|| description.to_string()),
        fields: vec![],
        footer: None,
        image: None,
        kind: "rich".to_string(),
        provider: None,
        thumbnail: None,
        timestamp: None,
        title: Some(title.to_string()),
        url: None,
        video: None,
    }
}

/// Red embed for refused requests
pub fn deny_embed(message: &str) -> Embed {
    basic_embed("😕 👎", message, COLOR_DENY)
}

pub fn confirm_embed(message: &str) -> Embed {
    basic_embed("😄 👍", message, COLOR_CONFIRM)
}

pub fn with_thumbnail(mut embed: Embed, url: &str) -> Embed {
    embed.thumbnail = Some(EmbedThumbnail {
        height: None,
        proxy_url: None,
        url: url.to_string(),
        width: None,
    });
    embed
}

pub fn with_footer(mut embed: Embed, text: &str) -> Embed {
    embed.footer = Some(EmbedFooter {
        icon_url: None,
        proxy_icon_url: None,
        text: text.to_string(),
    });
    embed
}

pub fn add_field(embed: &mut Embed, name: impl Into<String>, value: impl Into<String>, inline: bool) {
    embed.fields.push(EmbedField {
        inline,
        name: name.into(),
        value: value.into(),
    });
}
