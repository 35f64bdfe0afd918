// 🔎 Fuzzy column / name matcher
//
// One normalization + ranked matching utility shared by every import pipeline,
// both for spreadsheet headers ("현장명 " / "\u{FEFF}현장명" / "site_name") and
// for entity names typed by hand.
//
// Ranking: Exact (raw equality) → Normalized (equal after normalize) →
// Contains (either normalized form contains the other). A higher rank anywhere
// in the list beats a lower rank earlier in the list; within one rank the
// first item in input order wins.

/// Normalize free text for matching: drop BOMs, lowercase, remove whitespace,
/// underscores, zero-width spaces and non-breaking spaces.
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\u{FEFF}' | '\u{200B}' | '\u{00A0}' | '_') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRank {
    Exact,
    Normalized,
    Contains,
}

/// A successful match: which item, where it sits, and how strong the match was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub value: &'a str,
    pub index: usize,
    pub rank: MatchRank,
}

/// Best rank of `item` against any candidate
fn rank_of(item: &str, normalized_item: &str, candidates: &[(&str, String)]) -> Option<MatchRank> {
    if candidates.iter().any(|(raw, _)| *raw == item) {
        return Some(MatchRank::Exact);
    }
    if normalized_item.is_empty() {
        return None;
    }
    if candidates.iter().any(|(_, norm)| norm == normalized_item) {
        return Some(MatchRank::Normalized);
    }
    let contains = candidates.iter().any(|(_, norm)| {
        !norm.is_empty() && (normalized_item.contains(norm.as_str()) || norm.contains(normalized_item))
    });
    contains.then_some(MatchRank::Contains)
}

/// Find the best-ranked item of `items` matching any of `candidates`.
///
/// Ties within a rank resolve to the earliest item.
pub fn best_match<'a, S: AsRef<str>>(items: &'a [S], candidates: &[&str]) -> Option<Match<'a>> {
    let prepared: Vec<(&str, String)> = candidates.iter().map(|c| (*c, normalize(c))).collect();

    let mut best: Option<Match<'a>> = None;
    for (index, item) in items.iter().enumerate() {
        let value = item.as_ref();
        let Some(rank) = rank_of(value, &normalize(value), &prepared) else {
            continue;
        };
        let better = match best {
            Some(current) => rank < current.rank,
            None => true,
        };
        if better {
            best = Some(Match { value, index, rank });
            if rank == MatchRank::Exact {
                break;
            }
        }
    }

    best
}

/// Header lookup: the header that best matches any alias, or `None`
pub fn find_column<'a, S: AsRef<str>>(headers: &'a [S], aliases: &[&str]) -> Option<&'a str> {
    best_match(headers, aliases).map(|m| m.value)
}

/// Entity-name lookup with an upper bound on how loose the match may be.
///
/// Returns the index into `names`. A blank `wanted` never matches.
pub fn match_name<S: AsRef<str>>(names: &[S], wanted: &str, loosest: MatchRank) -> Option<usize> {
    if wanted.trim().is_empty() {
        return None;
    }
    best_match(names, &[wanted])
        .filter(|m| m.rank <= loosest)
        .map(|m| m.index)
}
