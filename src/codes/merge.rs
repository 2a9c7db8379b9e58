use std::collections::{HashMap, HashSet};

use super::ScrapedCode;

/// Collapse a batch to one record per code and drop the codes the store
/// already has.
///
/// Among duplicates the record with the strictly higher score replaces the
/// one kept so far, taking over its position; otherwise the first one seen
/// stays. Records without a score never displace anything.
pub fn merge(batch: Vec<ScrapedCode>, known: &HashSet<String>) -> Vec<ScrapedCode> {
    let mut kept: Vec<ScrapedCode> = Vec::with_capacity(batch.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in batch {
        if known.contains(candidate.code()) {
            continue;
        }

        match index.get(candidate.code()) {
            Some(&i) => {
                if outranks(&candidate, &kept[i]) {
                    tracing::debug!(
                        code = candidate.code(),
                        source = %candidate.record.source,
                        "replacing duplicate with higher scored occurrence"
                    );
                    kept[i] = candidate;
                }
            }
            None => {
                index.insert(candidate.code().to_string(), kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

fn outranks(candidate: &ScrapedCode, current: &ScrapedCode) -> bool {
    match (candidate.score, current.score) {
        (Some(new), Some(old)) => new > old,
        (Some(_), None) => true,
        _ => false,
    }
}
