use std::collections::BTreeMap;

use crate::models::{OptionResult, Poll, PollWithResults, Vote};

/// Share of `total` held by `votes`, as a whole percent rounded half up.
/// Zero when nobody has voted yet.
pub fn percentage(votes: i64, total: i64) -> u32 {
    if total <= 0 || votes <= 0 {
        return 0;
    }
    // floor(votes * 100 / total + 1/2) without going through floats
    let rounded = (votes * 200 + total) / (2 * total);
    rounded.clamp(0, 100) as u32
}

/// Counts keyed by option index, with a zero entry for every option.
pub fn tally<'a>(option_count: usize, votes: impl IntoIterator<Item = &'a Vote>) -> BTreeMap<String, i64> {
    let mut counts = vec![0i64; option_count];
    for vote in votes {
        if let Some(slot) = usize::try_from(vote.option_index).ok().and_then(|i| counts.get_mut(i)) {
            *slot += 1;
        }
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, n)| (i.to_string(), n))
        .collect()
}

impl PollWithResults {
    pub fn from_votes<'a>(poll: Poll, votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        let vote_counts = tally(poll.options.len(), votes);
        let total_votes = vote_counts.values().sum();
        Self { poll, vote_counts, total_votes }
    }

    pub fn votes_for(&self, index: usize) -> i64 {
        self.vote_counts.get(&index.to_string()).copied().unwrap_or(0)
    }

    pub fn option_results(&self) -> Vec<OptionResult> {
        self.poll
            .options
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let votes = self.votes_for(index);
                OptionResult {
                    index,
                    label: label.clone(),
                    votes,
                    percentage: percentage(votes, self.total_votes),
                }
            })
            .collect()
    }
}
