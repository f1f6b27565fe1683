//! Recommended movies and their display cards

use serde_json::Value;

use crate::api::display_value;

pub const NO_RECOMMENDATIONS_YET: &str = "No recommendations yet";
pub const DESCRIPTION_LIMIT: usize = 320;
const MISSING: &str = "-";

/// One card of the recommendation list, ready to draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieCard {
    pub title: String,
    pub year: String,
    /// At most [`DESCRIPTION_LIMIT`] characters
    pub description: String,
    pub genres: Vec<String>,
}

impl MovieCard {
    /// Build a card from one element of the prediction response.
    /// Every field is optional; title and year show `-` when absent.
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(display_value);

        let genres = match value.get("genres") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|g| display_value(g).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        };

        Self {
            title: text("title").unwrap_or_else(|| MISSING.to_string()),
            year: text("year").unwrap_or_else(|| MISSING.to_string()),
            description: truncate_chars(&text("description").unwrap_or_default(), DESCRIPTION_LIMIT),
            genres,
        }
    }

    /// "Title (Year)"
    pub fn heading(&self) -> String {
        format!("{} ({})", self.title, self.year)
    }
}

/// What the recommendation area shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MovieList {
    /// Nothing rendered (cleared)
    #[default]
    Empty,
    /// The "No recommendations yet" note
    Placeholder,
    Cards(Vec<MovieCard>),
}

impl MovieList {
    pub fn cards(&self) -> &[MovieCard] {
        match self {
            MovieList::Cards(cards) => cards,
            _ => &[],
        }
    }
}

/// Anything that isn't a non-empty array renders the placeholder
pub fn render_movies(list: &Value) -> MovieList {
    match list {
        Value::Array(items) if !items.is_empty() => {
            MovieList::Cards(items.iter().map(MovieCard::from_value).collect())
        }
        _ => MovieList::Placeholder,
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
