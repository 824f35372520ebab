//! Contributor ranking for non-compliant findings.

use std::collections::HashMap;

use log::warn;

use crate::domain::{EnrichedNonCompliantImage, NonCompliantImage};
use crate::host::RepositoryHost;

/// Number of contributors attached to each finding.
pub const TOP_CONTRIBUTORS: usize = 5;

/// Rank authors by commit count, ties broken alphabetically.
pub fn rank_contributors<S: AsRef<str>>(authors: &[S], limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for author in authors {
        let author = author.as_ref().trim();
        if author.is_empty() {
            continue;
        }
        *counts.entry(author).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(author, _)| author.to_string())
        .collect()
}

/// Attach top contributors to each finding.
///
/// Commit history is fetched once per repository and branch. A failed lookup
/// leaves the contributor list empty.
pub async fn enrich_non_compliant<H>(
    host: &H,
    records: &[NonCompliantImage],
) -> Vec<EnrichedNonCompliantImage>
where
    H: RepositoryHost + ?Sized,
{
    let mut cache: HashMap<(String, String), Vec<String>> = HashMap::new();
    let mut enriched = Vec::with_capacity(records.len());

    for record in records {
        let key = (record.repo.clone(), record.branch.clone());
        if !cache.contains_key(&key) {
            let contributors = match host
                .recent_commit_authors(&record.repo, &record.branch)
                .await
            {
                Ok(authors) => rank_contributors(authors.as_slice(), TOP_CONTRIBUTORS),
                Err(err) => {
                    warn!(
                        "Error fetching top contributors for repo: {}, branch: {} - {err}",
                        record.repo, record.branch
                    );
                    Vec::new()
                }
            };
            cache.insert(key.clone(), contributors);
        }
        enriched.push(EnrichedNonCompliantImage {
            image: record.clone(),
            top_contributors: cache.get(&key).cloned().unwrap_or_default(),
        });
    }

    enriched
}

/// Wrap findings without contacting the host.
pub fn without_contributors(records: &[NonCompliantImage]) -> Vec<EnrichedNonCompliantImage> {
    records
        .iter()
        .map(|record| EnrichedNonCompliantImage {
            image: record.clone(),
            top_contributors: Vec::new(),
        })
        .collect()
}
