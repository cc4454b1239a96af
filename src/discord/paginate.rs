//! Multi-page replies turned with previous/next buttons.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::json;
use twilight_model::id::{marker::UserMarker, Id};

use crate::discord::interaction::ResponseData;

const PREFIX: &str = "page";
const MAX_OPEN: u64 = 1_000;

#[derive(Debug)]
struct PageSet {
    /// Only this user may turn pages when set
    owner: Option<Id<UserMarker>>,
    pages: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub enum PageTurn {
    Page(ResponseData),
    NotOwner,
    Expired,
}

pub struct Paginator {
    sets: Cache<String, Arc<PageSet>>,
}

impl Paginator {
    /// Page sets stop responding `ttl` after they were opened.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sets: Cache::builder()
                .max_capacity(MAX_OPEN)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn is_page_id(custom_id: &str) -> bool {
        custom_id.starts_with(PREFIX) && custom_id[PREFIX.len()..].starts_with(':')
    }

    /// Store `pages` and render the first one. A single page gets no buttons.
    pub async fn open(&self, pages: Vec<String>, owner: Option<Id<UserMarker>>) -> ResponseData {
        if pages.len() <= 1 {
            return ResponseData::content(pages.into_iter().next().unwrap_or_default());
        }

        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let set = Arc::new(PageSet { owner, pages });
        let first = render(&nonce, &set, 0);
        self.sets.insert(nonce, set).await;
        first
    }

    pub async fn turn(&self, custom_id: &str, user: Id<UserMarker>) -> PageTurn {
        let mut parts = custom_id.split(':');
        let (Some(PREFIX), Some(nonce), Some(index)) = (parts.next(), parts.next(), parts.next())
        else {
            return PageTurn::Expired;
        };
        let Ok(index) = index.parse::<usize>() else {
            return PageTurn::Expired;
        };
        let Some(set) = self.sets.get(nonce).await else {
            return PageTurn::Expired;
        };

        if set.owner.is_some_and(|owner| owner != user) {
            return PageTurn::NotOwner;
        }

        let index = index.min(set.pages.len().saturating_sub(1));
        PageTurn::Page(render(nonce, &set, index))
    }
}

fn render(nonce: &str, set: &PageSet, index: usize) -> ResponseData {
    let last = set.pages.len() - 1;
    let row = json!({
        "type": 1,
        "components": [
            {
                "type": 2, "style": 2, "label": "◀",
                "custom_id": format!("{PREFIX}:{nonce}:{}:prev", index.saturating_sub(1)),
                "disabled": index == 0
            },
            {
                "type": 2, "style": 2, "label": format!("{}/{}", index + 1, set.pages.len()),
                "custom_id": format!("{PREFIX}:{nonce}:{index}:count"),
                "disabled": true
            },
            {
                "type": 2, "style": 2, "label": "▶",
                "custom_id": format!("{PREFIX}:{nonce}:{}:next", (index + 1).min(last)),
                "disabled": index == last
            },
        ]
    });
    ResponseData::content(set.pages[index].clone()).with_components(vec![row])
}
