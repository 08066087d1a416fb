//! Navigable application states and their URL / JSON forms.
//!
//! Every variant knows its path pattern, how to build itself from URL
//! parameters, how it survives a reload (JSON), its page title, whether a
//! transition into it replaces the current history entry, and whether the
//! current state may be left.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RouteDecodeError;
use crate::post::{Post, PostId};
use crate::query::{query_param, split_url, to_query_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    NotFound,
    Login,
    Search,
    NewPost,
    Post,
}

impl RouteName {
    pub const ALL: [RouteName; 5] = [
        RouteName::NotFound,
        RouteName::Login,
        RouteName::Search,
        RouteName::NewPost,
        RouteName::Post,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RouteName::NotFound => "notfound",
            RouteName::Login => "login",
            RouteName::Search => "search",
            RouteName::NewPost => "new-post",
            RouteName::Post => "post",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }

    /// Pattern used for URL matching. `NotFound` has none.
    pub fn pattern(self) -> Option<&'static str> {
        match self {
            RouteName::NotFound => None,
            RouteName::Login => Some("/login"),
            RouteName::Search => Some("/"),
            RouteName::NewPost => Some("/new"),
            RouteName::Post => Some("/posts/:id"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRoute {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRoute {
    pub id: PostId,
    /// Title known at navigation time; may be stale until the post loads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip)]
    pub cache_hit: bool,
    #[serde(default)]
    pub editing: bool,
    #[serde(skip)]
    pub not_found: bool,
    #[serde(skip)]
    pub error: bool,
}

impl PostRoute {
    pub fn new(id: PostId, title: Option<String>, cache_hit: bool) -> Self {
        Self {
            id,
            title,
            cache_hit,
            editing: false,
            not_found: false,
            error: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Route {
    #[serde(rename = "notfound")]
    NotFound,
    #[serde(rename = "login")]
    Login,
    #[serde(rename = "search")]
    Search(SearchRoute),
    #[serde(rename = "new-post")]
    NewPost,
    #[serde(rename = "post")]
    Post(PostRoute),
}

impl Default for Route {
    fn default() -> Self {
        Route::Search(SearchRoute::default())
    }
}

/// Outcome of asking whether the current route may be left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCheck {
    Allow,
    /// Leaving discards something; the user has to confirm `message`.
    Confirm(&'static str),
}

impl Route {
    pub fn search(text: impl Into<String>) -> Self {
        Route::Search(SearchRoute {
            search: text.into(),
        })
    }

    pub fn post(id: PostId, title: Option<String>, cache_hit: bool) -> Self {
        Route::Post(PostRoute::new(id, title, cache_hit))
    }

    pub fn name(&self) -> RouteName {
        match self {
            Route::NotFound => RouteName::NotFound,
            Route::Login => RouteName::Login,
            Route::Search(_) => RouteName::Search,
            Route::NewPost => RouteName::NewPost,
            Route::Post(_) => RouteName::Post,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::NotFound => String::new(),
            Route::Post(p) => format!("/posts/{}", p.id),
            other => other.name().pattern().unwrap_or_default().to_string(),
        }
    }

    fn params(&self) -> Vec<(&'static str, &str)> {
        match self {
            Route::Search(s) => vec![("search", s.search.as_str())],
            _ => Vec::new(),
        }
    }

    pub fn path_with_params(&self) -> String {
        let path = self.path();
        let query = to_query_string(self.params());
        if query.is_empty() {
            path
        } else {
            format!("{path}?{query}")
        }
    }

    /// Title for the document. Post titles come from the loaded post when
    /// there is one, so callers must recompute this whenever the post changes.
    pub fn page_title(&self, post: Option<&Post>) -> String {
        match self {
            Route::NotFound => "Not Found".into(),
            Route::Login => "Login".into(),
            Route::Search(s) if s.search.is_empty() => "Search".into(),
            Route::Search(s) => format!("Search: {}", s.search),
            Route::NewPost => "New Post".into(),
            Route::Post(p) => post
                .map(|post| post.title.clone())
                .or_else(|| p.title.clone())
                .unwrap_or_else(|| "Post error".into()),
        }
    }

    /// Whether moving from `previous` to `self` should overwrite the current
    /// history entry instead of adding one.
    pub fn should_replace(&self, previous: &Route) -> bool {
        match self {
            Route::Search(_) => matches!(previous, Route::Search(_)),
            Route::Post(_) => matches!(previous, Route::NewPost),
            Route::NotFound | Route::Login | Route::NewPost => false,
        }
    }

    /// Exit guard. Only routes that edit a post can hold unsaved work.
    pub fn can_exit(&self, post: Option<&Post>, unauthorized: bool) -> ExitCheck {
        match self {
            Route::Post(_) | Route::NewPost => {
                if unauthorized || !post.is_some_and(Post::is_dirty) {
                    ExitCheck::Allow
                } else {
                    ExitCheck::Confirm(quill_config::UNSAVED_POST_MESSAGE)
                }
            }
            Route::NotFound | Route::Login | Route::Search(_) => ExitCheck::Allow,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(value: &Value) -> Result<Route, RouteDecodeError> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .ok_or(RouteDecodeError::MissingName)?;
        if RouteName::parse(name).is_none() {
            return Err(RouteDecodeError::UnknownName(name.to_string()));
        }
        Ok(Route::deserialize(value)?)
    }

    /// Decodes `path?query`. Paths matching no pattern are an error; callers
    /// fall back to [`Route::NotFound`].
    pub fn from_url(url: &str) -> Result<Route, RouteDecodeError> {
        let (path, query) = split_url(url);
        let path = normalize_path(path);
        for name in RouteName::ALL {
            let Some(pattern) = name.pattern() else {
                continue;
            };
            if let Some(captures) = match_pattern(pattern, &path) {
                if let Some(route) = Self::from_params(name, &captures, query) {
                    return Ok(route);
                }
            }
        }
        Err(RouteDecodeError::UnknownPath(path))
    }

    fn from_params(name: RouteName, captures: &[&str], query: &str) -> Option<Route> {
        match name {
            RouteName::NotFound => Some(Route::NotFound),
            RouteName::Login => Some(Route::Login),
            RouteName::Search => Some(Route::search(
                query_param(query, "search").unwrap_or_default(),
            )),
            RouteName::NewPost => Some(Route::NewPost),
            RouteName::Post => {
                let id = captures.first()?.parse().ok()?;
                Some(Route::post(id, None, false))
            }
        }
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".into()
    } else {
        trimmed.to_string()
    }
}

fn match_pattern<'a>(pattern: &str, path: &'a str) -> Option<Vec<&'a str>> {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let path_segments: Vec<&str> = path.split('/').collect();
    if pattern_segments.len() != path_segments.len() {
        return None;
    }
    let mut captures = Vec::new();
    for (p, s) in pattern_segments.iter().zip(path_segments) {
        if p.starts_with(':') {
            if s.is_empty() {
                return None;
            }
            captures.push(s);
        } else if *p != s {
            return None;
        }
    }
    Some(captures)
}
