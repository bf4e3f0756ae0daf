//! Fuzzy string matching.
//!
//! Similarity is the Ratcliff/Obershelp ratio `2 * M / T` in `[0, 1]`,
//! where `M` counts the characters in matching blocks and `T` the
//! characters in both strings. Comparison is case-sensitive. Queries of 200
//! characters or more treat characters that make up more than 1% of the
//! query as junk. Ranking is deterministic: equal scores are ordered by
//! candidate text, highest first.

use std::collections::HashMap;

/// Query length from which over-frequent characters are ignored.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Similarity of a candidate to a query in `[0, 1]`; 1 means identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity(query: &str, candidate: &str) -> f64 {
    let a: Vec<char> = candidate.chars().collect();
    let b: Vec<char> = query.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Positions of each character of `b`, minus the popular ones.
fn index_of(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }
    if b.len() >= AUTOJUNK_MIN_LEN {
        let limit = b.len() / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= limit);
    }
    b2j
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as
/// `(i, j, size)`, leftmost in `a` then in `b` on ties.
fn longest_match(
    a: &[char],
    b: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    (alo, ahi, blo, bhi): (usize, usize, usize, usize),
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next = HashMap::new();
        for &j in b2j.get(c).map_or(&[][..], Vec::as_slice) {
            if j < blo {
                continue;
            }
            if j >= bhi {
                break;
            }
            let k = j
                .checked_sub(1)
                .and_then(|prev| run_ending_at.get(&prev))
                .copied()
                .unwrap_or(0)
                + 1;
            next.insert(j, k);
            if k > best_size {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_size = k;
            }
        }
        run_ending_at = next;
    }

    // Popular characters are missing from the index; grow over them.
    while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
        best_i -= 1;
        best_j -= 1;
        best_size += 1;
    }
    while best_i + best_size < ahi
        && best_j + best_size < bhi
        && a[best_i + best_size] == b[best_j + best_size]
    {
        best_size += 1;
    }

    (best_i, best_j, best_size)
}

/// Total size of the matching blocks of `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let b2j = index_of(b);
    let mut queue = vec![(0, a.len(), 0, b.len())];
    let mut matched = 0;

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, size) = longest_match(a, b, &b2j, (alo, ahi, blo, bhi));
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            queue.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Returns up to `n` candidates whose similarity to `query` is at least
/// `cutoff`, best first.
///
/// Duplicate candidates are ranked once. Returns an empty list when `n` is
/// zero or nothing clears the cutoff.
#[must_use]
pub fn close_matches<I, S>(query: &str, candidates: I, n: usize, cutoff: f64) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if n == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f64, String)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let candidate = candidate.as_ref();
            let score = similarity(query, candidate);
            (score >= cutoff).then(|| (score, candidate.to_string()))
        })
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .total_cmp(score_a)
            .then_with(|| b.cmp(a))
    });
    scored.dedup_by(|(_, a), (_, b)| a == b);
    scored.truncate(n);
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Returns the single best match, if any clears `cutoff`.
///
/// Requests half the candidate count (at least one) as ranked matches and
/// takes the first.
#[must_use]
pub fn best_match<S: AsRef<str>>(query: &str, candidates: &[S], cutoff: f64) -> Option<String> {
    close_matches(query, candidates, half_or_one(candidates.len()), cutoff)
        .into_iter()
        .next()
}

/// Half of `len`, but never less than one.
#[must_use]
pub const fn half_or_one(len: usize) -> usize {
    if len / 2 == 0 {
        1
    } else {
        len / 2
    }
}

/// Case-insensitive substring test.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Decodes a URL for display: `+` becomes a space and percent-escapes are
/// decoded. Invalid escapes are left as they are.
#[must_use]
pub fn unquote_plus(text: &str) -> String {
    let spaced = text.replace('+', " ");
    urlencoding::decode(&spaced).map_or(spaced.clone(), |decoded| decoded.into_owned())
}
