use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

/// Validated, ordered list of links submitted as one job.
///
/// Duplicates are kept and order is preserved, so result `i` always
/// belongs to link `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSet {
    links: Vec<String>,
}

impl LinkSet {
    /// Validate raw submitted strings.
    ///
    /// Fails when the list is empty, longer than `max_links`, or contains
    /// a string that does not parse as an absolute URL.
    pub fn parse(links: Vec<String>, max_links: usize) -> Result<Self, AppError> {
        if links.is_empty() {
            return Err(AppError::NoLinks);
        }

        if links.len() > max_links {
            return Err(AppError::TooManyLinks {
                count: links.len(),
                max: max_links,
            });
        }

        for link in &links {
            Url::parse(link).map_err(|e| AppError::InvalidLink {
                url: link.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(Self { links })
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(String::as_str)
    }
}

/// Outcome of fetching a single link.
///
/// The status code is data: a 404 or 500 upstream is a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub status_code: u16,
    pub body: String,
}

/// Results of one job, index-aligned with its [`LinkSet`].
pub type ResultSet = Vec<FetchResult>;
