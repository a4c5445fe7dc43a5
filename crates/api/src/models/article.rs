//! Article domain types.

use chrono::{DateTime, Utc};

use conduit_core::{ArticleId, Slug, UserId};

use super::Profile;

/// A published article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: ArticleId,
    pub slug: Slug,
    pub title: String,
    pub description: String,
    pub body: String,
    /// Sorted, de-duplicated tag list.
    pub tags: Vec<String>,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert an article.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub slug: Slug,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tags: Vec<String>,
    pub author_id: UserId,
}

/// Partial update of an article. A new title always comes with a new slug.
#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub title: Option<(String, Slug)>,
    pub description: Option<String>,
    pub body: Option<String>,
}

impl ArticleChanges {
    /// Whether applying these changes would modify anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.body.is_none()
    }

    /// Apply these changes to an in-memory article.
    pub fn apply(self, article: &mut Article, now: DateTime<Utc>) {
        if let Some((title, slug)) = self.title {
            article.title = title;
            article.slug = slug;
        }
        if let Some(description) = self.description {
            article.description = description;
        }
        if let Some(body) = self.body {
            article.body = body;
        }
        article.updated_at = now;
    }
}

/// Listing filter. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Only articles carrying this tag.
    pub tag: Option<String>,
    /// Only articles by this author.
    pub author: Option<UserId>,
    /// Only articles favourited by this user.
    pub favourited_by: Option<UserId>,
    /// Only articles by one of these authors (the feed).
    pub authors: Option<Vec<UserId>>,
}

/// An article as presented to a particular viewer.
#[derive(Debug, Clone)]
pub struct ArticleView {
    pub article: Article,
    pub author: Profile,
    pub favourited: bool,
    pub favourites_count: u64,
}

/// Normalize a client-supplied tag list: trim, drop blanks, sort, de-duplicate.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}
