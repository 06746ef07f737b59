//! Release ranking

use haruki_api::{Release, SelectOption, MAX_LABEL_LEN};
use haruki_util::truncate;

/// Order releases by preference score, highest first, keeping at most `cap`.
///
/// The sort is stable: releases with equal scores keep the order the
/// indexers returned them in.
pub fn rank_releases(mut releases: Vec<Release>, cap: usize) -> Vec<Release> {
    releases.sort_by(|a, b| b.score().total_cmp(&a.score()));
    releases.truncate(cap);
    releases
}

/// Movie releases worth offering, or all of them if none qualify
pub fn usable_movie_releases(releases: Vec<Release>) -> Vec<Release> {
    let usable: Vec<Release> = releases.iter().filter(|r| r.is_usable()).cloned().collect();
    if usable.is_empty() { releases } else { usable }
}

/// Select options for a ranked list, marking `selected` as the default
pub fn release_options(releases: &[Release], selected: Option<&str>) -> Vec<SelectOption> {
    releases
        .iter()
        .map(|r| {
            let mark = if r.approved { "✅" } else { "❌" };
            let label = truncate(&format!("{} {}", mark, r.display_title()), MAX_LABEL_LEN);
            SelectOption::new(label, r.guid.clone()).selected(selected == Some(r.guid.as_str()))
        })
        .collect()
}
