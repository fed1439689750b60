//! Git repository references.

use crate::error::{Error, Result};

/// A git repository to build, together with the branch to check out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRepo {
    /// Clone URL.
    pub url: String,
    /// Branch to check out after cloning.
    pub branch: String,
    /// Repository name, used as the checkout directory name.
    pub name: String,
}

impl GitRepo {
    /// Create a repository reference from its parts.
    #[must_use]
    pub fn new(url: impl Into<String>, branch: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            branch: branch.into(),
            name: name.into(),
        }
    }

    /// Derive a repository reference from a hosted clone URL.
    ///
    /// The name is the second path segment (`<org>/<name>`) with any `.git`
    /// suffix removed. Both `https://host/org/name.git` and scp-style
    /// `git@host:org/name.git` URLs are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL has fewer than two path segments.
    pub fn from_url(url: &str, branch: impl Into<String>) -> Result<Self> {
        let path = url_path(url).ok_or_else(|| Error::repo_url(url))?;
        let name = path
            .trim_matches('/')
            .split('/')
            .nth(1)
            .map(|segment| segment.strip_suffix(".git").unwrap_or(segment))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::repo_url(url))?;

        Ok(Self::new(url, branch, name))
    }
}

/// The path component of a URL, ignoring query and fragment.
fn url_path(url: &str) -> Option<&str> {
    let path = if let Some((_, rest)) = url.split_once("://") {
        // Drop the authority
        rest.find('/').map_or("", |idx| &rest[idx..])
    } else {
        // scp-like syntax: [user@]host:path
        url.split_once(':').map(|(_, path)| path)?
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    Some(&path[..end])
}
