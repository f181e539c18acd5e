use std::fmt;

use url::form_urlencoded;

pub const FIELD_CLIENT_ID: &str = "client_id";
pub const FIELD_CLIENT_SECRET: &str = "client_secret";
pub const FIELD_USERNAME: &str = "username";
pub const FIELD_PASSWORD: &str = "password";
pub const FIELD_SUBREDDIT: &str = "subreddit";
pub const FIELD_MAX_POSTS: &str = "max_posts";
pub const FIELD_INCLUDE_SENTIMENT: &str = "include_sentiment";
pub const FIELD_INCLUDE_SENTIMENT_SCORE: &str = "include_sentiment_score";

/// Value submitted for a checked checkbox. Unchecked boxes are omitted entirely.
pub const CHECKBOX_ON_VALUE: &str = "true";

pub const DEFAULT_MAX_POSTS: u32 = 100;

/// Ordered name/value pairs captured from a form, in field order.
///
/// Duplicate names are allowed and kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `application/x-www-form-urlencoded` serialization, spaces as `+`.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.entries {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// The scrape configuration form: Reddit credentials plus scraping options.
#[derive(Clone, PartialEq, Eq)]
pub struct ScrapeForm {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub subreddit: String,
    pub max_posts: u32,
    pub include_sentiment: bool,
    pub include_sentiment_score: bool,
}

impl Default for ScrapeForm {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            subreddit: String::new(),
            max_posts: DEFAULT_MAX_POSTS,
            include_sentiment: false,
            include_sentiment_score: false,
        }
    }
}

impl ScrapeForm {
    /// Sets the sentiment checkbox. Clearing it also clears the dependent
    /// score checkbox; setting it leaves the score checkbox untouched.
    pub fn apply_sentiment_toggle(&mut self, checked: bool) {
        self.include_sentiment = checked;
        if !checked {
            self.include_sentiment_score = false;
        }
    }

    pub fn to_form_data(&self) -> FormData {
        let mut data = FormData::new();
        data.append(FIELD_CLIENT_ID, self.client_id.as_str());
        data.append(FIELD_CLIENT_SECRET, self.client_secret.as_str());
        data.append(FIELD_USERNAME, self.username.as_str());
        data.append(FIELD_PASSWORD, self.password.as_str());
        data.append(FIELD_SUBREDDIT, self.subreddit.as_str());
        data.append(FIELD_MAX_POSTS, self.max_posts.to_string());
        if self.include_sentiment {
            data.append(FIELD_INCLUDE_SENTIMENT, CHECKBOX_ON_VALUE);
        }
        if self.include_sentiment_score {
            data.append(FIELD_INCLUDE_SENTIMENT_SCORE, CHECKBOX_ON_VALUE);
        }
        data
    }
}

impl fmt::Debug for ScrapeForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeForm")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("subreddit", &self.subreddit)
            .field("max_posts", &self.max_posts)
            .field("include_sentiment", &self.include_sentiment)
            .field("include_sentiment_score", &self.include_sentiment_score)
            .finish()
    }
}
