//! Article slugs.

use core::fmt;

use serde::{Deserialize, Serialize};

/// URL-safe article identifier derived from its title.
///
/// The title is lowercased, every run of characters that are not letters or
/// digits becomes a single `-`, leading and trailing dashes are dropped, and a
/// numeric suffix keeps two articles with the same title apart.
///
/// ```
/// use conduit_core::Slug;
///
/// let slug = Slug::from_title("How to Train Your Dragon?", 7);
/// assert_eq!(slug.as_str(), "how-to-train-your-dragon-7");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Build a slug from a title and a disambiguating suffix.
    #[must_use]
    pub fn from_title(title: &str, suffix: u32) -> Self {
        let mut slug = String::with_capacity(title.len() + 11);
        let mut pending_dash = false;

        for c in title.chars().flat_map(char::to_lowercase) {
            if c.is_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c);
            } else {
                pending_dash = true;
            }
        }

        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(&suffix.to_string());

        Self(slug)
    }

    /// Wrap a slug taken from a URL or from storage.
    #[must_use]
    pub fn from_trusted(s: String) -> Self {
        Self(s)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_punctuation_runs() {
        let slug = Slug::from_title("Rust, Tokio & You... (part 2)", 1);
        assert_eq!(slug.as_str(), "rust-tokio-you-part-2-1");
    }

    #[test]
    fn test_trims_leading_and_trailing_separators() {
        let slug = Slug::from_title("  --Hello--  ", 99);
        assert_eq!(slug.as_str(), "hello-99");
    }

    #[test]
    fn test_keeps_unicode_letters() {
        let slug = Slug::from_title("Crème Brûlée", 3);
        assert_eq!(slug.as_str(), "crème-brûlée-3");
    }

    #[test]
    fn test_title_without_letters_is_suffix_only() {
        let slug = Slug::from_title("?!", 42);
        assert_eq!(slug.as_str(), "42");
    }

    #[test]
    fn test_suffix_distinguishes_same_title() {
        assert_ne!(Slug::from_title("Same", 1), Slug::from_title("Same", 2));
    }
}
