//! Scripted page source for exercising the walker and poller without HTTP

use std::{collections::HashMap, sync::Mutex};

use super::{
    api::{Page, PageSource},
    error::{ClientError, Result},
    links::LinkSet,
};
use crate::domain::{Event, RateLimit};

pub(crate) const FEED_ROOT: &str = "https://feed.test/events";

pub(crate) fn page_url(page: u64) -> String {
    if page == 1 {
        FEED_ROOT.to_string()
    } else {
        format!("{FEED_ROOT}?page={page}")
    }
}

pub(crate) fn numbered(ids: impl IntoIterator<Item = u64>) -> Vec<Event> {
    ids.into_iter().map(Event::new).collect()
}

#[derive(Debug, Clone)]
enum Scripted {
    Page(Page),
    RateLimited,
    MalformedLink,
}

/// Serves canned pages by URL and records every request
#[derive(Debug, Default)]
pub(crate) struct ScriptedFeed {
    pages: Mutex<HashMap<String, Scripted>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFeed {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_page(&self, url: &str, events: Vec<Event>, next: Option<&str>) {
        let links = next.map(LinkSet::starting_at).unwrap_or_default();
        let rate_limit = RateLimit { limit: Some(5000), remaining: Some(4999), reset_at: None };
        self.script(url, Scripted::Page(Page { links, rate_limit, events }));
    }

    pub(crate) fn set_rate_limited(&self, url: &str) {
        self.script(url, Scripted::RateLimited);
    }

    pub(crate) fn set_malformed_link(&self, url: &str) {
        self.script(url, Scripted::MalformedLink);
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn script(&self, url: &str, scripted: Scripted) {
        self.pages.lock().unwrap().insert(url.to_string(), scripted);
    }
}

impl PageSource for ScriptedFeed {
    async fn fetch_page(&self, url: &str) -> Result<Page> {
        self.requests.lock().unwrap().push(url.to_string());
        let scripted = self.pages.lock().unwrap().get(url).cloned();

        match scripted {
            Some(Scripted::Page(page)) => Ok(page),
            Some(Scripted::RateLimited) => Err(ClientError::RateLimited(RateLimit {
                limit: Some(60),
                remaining: Some(0),
                reset_at: None,
            })),
            Some(Scripted::MalformedLink) => {
                Err(ClientError::malformed_link("<broken", "URL is not enclosed in angle brackets"))
            },
            None => Err(ClientError::unexpected_status(404, url, "Not Found")),
        }
    }
}
