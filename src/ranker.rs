//! Merges every strategy's output for a run into one ordered list.

use std::cmp::Ordering;

use ahash::AHashMap;

use crate::suggestion::Suggestion;

/// Suggestions for the same broken link in the same file compete with each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey<'a> {
    broken_link: &'a str,
    file: &'a str,
}

fn by_confidence_desc(a: &(usize, Suggestion), b: &(usize, Suggestion)) -> Ordering {
    b.1.confidence
        .partial_cmp(&a.1.confidence)
        .unwrap_or(Ordering::Equal)
        .then(a.0.cmp(&b.0))
}

/// Keep the best `max_per_group` distinct targets per (broken link, file)
/// and order everything by confidence. Ties keep discovery order.
pub fn rank_suggestions(suggestions: Vec<Suggestion>, max_per_group: usize) -> Vec<Suggestion> {
    let mut groups: AHashMap<GroupKey<'_>, Vec<usize>> = AHashMap::new();
    for (index, suggestion) in suggestions.iter().enumerate() {
        groups
            .entry(GroupKey {
                broken_link: &suggestion.broken_link,
                file: &suggestion.file,
            })
            .or_default()
            .push(index);
    }

    let mut keep = vec![false; suggestions.len()];
    for members in groups.values() {
        let mut ranked: Vec<usize> = members.clone();
        ranked.sort_by(|&a, &b| {
            suggestions[b]
                .confidence
                .partial_cmp(&suggestions[a].confidence)
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut seen_targets: Vec<&str> = Vec::new();
        for index in ranked {
            if seen_targets.len() >= max_per_group {
                break;
            }
            let target = suggestions[index].suggested_target.as_str();
            if seen_targets.contains(&target) {
                continue;
            }
            seen_targets.push(target);
            keep[index] = true;
        }
    }

    let mut survivors: Vec<(usize, Suggestion)> = suggestions
        .into_iter()
        .enumerate()
        .filter(|(index, _)| keep[*index])
        .collect();
    survivors.sort_by(by_confidence_desc);
    survivors.into_iter().map(|(_, s)| s).collect()
}
