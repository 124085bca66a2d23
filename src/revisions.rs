// src/revisions.rs

use crate::error::{Error, Result};
use crate::model::RevisionSequence;
use chrono::{TimeZone, Utc};
use git2::Repository;
use std::path::Path;

/// Opens the checkout, cloning it first when it is absent and a URL is known.
pub fn open_or_clone(path: &Path, url: Option<&str>) -> Result<Repository> {
    if path.exists() {
        tracing::info!(repo = %path.display(), "using existing checkout");
        return Ok(Repository::open(path)?);
    }
    match url {
        Some(url) => {
            tracing::info!(url, repo = %path.display(), "cloning repository");
            Ok(Repository::clone(url, path)?)
        }
        None => Err(Error::missing(path)),
    }
}

/// The newest `limit` tags, oldest first, ordered by the committer date of their commit.
///
/// Tags that do not resolve to a commit are ignored.
pub fn enumerate_revisions(repo: &Repository, limit: usize) -> Result<RevisionSequence> {
    let names = repo.tag_names(None)?;
    let mut dated = Vec::new();

    for name in names.iter().flatten() {
        let commit = match repo
            .revparse_single(&format!("refs/tags/{name}"))
            .and_then(|obj| obj.peel_to_commit())
        {
            Ok(commit) => commit,
            Err(e) => {
                tracing::debug!(tag = name, error = %e, "tag has no commit, ignoring");
                continue;
            }
        };
        let Some(when) = Utc.timestamp_opt(commit.time().seconds(), 0).single() else {
            tracing::debug!(tag = name, "tag commit has an invalid timestamp, ignoring");
            continue;
        };
        dated.push((name.to_string(), when));
    }

    let revisions = RevisionSequence::from_dated_tags(dated, limit);
    tracing::info!(
        selected = revisions.len(),
        tags = ?revisions.iter().map(|r| r.tag.as_str()).collect::<Vec<_>>(),
        "selected revisions"
    );
    Ok(revisions)
}
