// src/filters.rs
//! Filter criteria and the pure derived views over the loaded news.

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::model::{ImpactLevel, NewsItem, Provider};

/// Either the `all` sentinel or one concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Choice<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Choice<T> {
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(wanted) => wanted == value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Choice::All)
    }
}

impl<T: FromStr> Choice<T> {
    /// Parses a UI select value; `all` (any case) or an empty string map to `All`.
    pub fn parse(raw: &str) -> Result<Self, T::Err> {
        let s = raw.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Choice::All);
        }
        s.parse().map(Choice::Only)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub search: String,
    pub provider: Choice<Provider>,
    pub impact: Choice<ImpactLevel>,
    pub category: Choice<String>,
}

impl FilterCriteria {
    pub fn is_default(&self) -> bool {
        *self == FilterCriteria::default()
    }

    pub fn matches(&self, item: &NewsItem) -> bool {
        if !self.provider.accepts(&item.provider)
            || !self.impact.accepts(&item.impact_level)
            || !self.category.accepts(&item.category)
        {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        item.title.to_lowercase().contains(&needle) || item.summary.to_lowercase().contains(&needle)
    }
}

pub fn filter_news<'a>(news: &'a [NewsItem], criteria: &FilterCriteria) -> Vec<&'a NewsItem> {
    news.iter().filter(|item| criteria.matches(item)).collect()
}

pub fn saved_news(news: &[NewsItem]) -> Vec<&NewsItem> {
    news.iter().filter(|item| item.is_saved).collect()
}

/// Distinct non-empty categories. Sorted only to keep output stable.
pub fn unique_categories(news: &[NewsItem]) -> BTreeSet<String> {
    news.iter()
        .filter(|item| !item.category.trim().is_empty())
        .map(|item| item.category.clone())
        .collect()
}
