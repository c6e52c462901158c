//! Line-level three-way text merge (diff3 over an LCS matching).
//!
//! Text is split on `'\n'` and rejoined with `'\n'`, so a trailing newline
//! survives as a final empty line and the output never gains or loses one.
//!
//! The base is aligned with each side independently. Runs of lines that are
//! matched in all three are stable; everything between two stable runs is an
//! unstable chunk, resolved as:
//! - only one side changed it: take that side
//! - both sides made the same change: take it once
//! - both changed it differently: take the winner's block (a conflict)

use super::Side;
use tracing::warn;

/// Upper bound on LCS table cells (4 bytes each) for one pairwise diff.
///
/// Past this the differing middle is left unmatched and merges as a single
/// block under the winner rule.
pub const MAX_DIFF_CELLS: usize = 4_000_000;

/// Result of a text merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMerge {
    pub text: String,
    /// Number of overlapping blocks resolved by the winner rule.
    pub conflicts: usize,
}

/// Merge `ours` and `theirs` against `base`.
///
/// Pass an empty base when no ancestor exists; differing texts then resolve
/// whole to the winner.
#[must_use]
pub fn merge_text(base: &str, ours: &str, theirs: &str, winner: Side) -> TextMerge {
    if ours == theirs || theirs == base {
        return TextMerge {
            text: ours.to_string(),
            conflicts: 0,
        };
    }
    if ours == base {
        return TextMerge {
            text: theirs.to_string(),
            conflicts: 0,
        };
    }

    let base_lines = split_lines(base);
    let ours_lines = split_lines(ours);
    let theirs_lines = split_lines(theirs);

    let mut merged: Vec<&str> = Vec::with_capacity(ours_lines.len().max(theirs_lines.len()));
    let mut conflicts = 0;

    for chunk in diff3_chunks(&base_lines, &ours_lines, &theirs_lines) {
        match chunk {
            Chunk::Stable(lines) => merged.extend_from_slice(lines),
            Chunk::Unstable { base, ours, theirs } => {
                let lines = if ours == base {
                    theirs
                } else if theirs == base || ours == theirs {
                    ours
                } else {
                    conflicts += 1;
                    match winner {
                        Side::Ours => ours,
                        Side::Theirs => theirs,
                    }
                };
                merged.extend_from_slice(lines);
            }
        }
    }

    TextMerge {
        text: merged.join("\n"),
        conflicts,
    }
}

fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'s, 'l> {
    Stable(&'s [&'l str]),
    Unstable {
        base: &'s [&'l str],
        ours: &'s [&'l str],
        theirs: &'s [&'l str],
    },
}

fn diff3_chunks<'s, 'l>(
    base: &'s [&'l str],
    ours: &'s [&'l str],
    theirs: &'s [&'l str],
) -> Vec<Chunk<'s, 'l>> {
    let to_ours = matching(base, ours);
    let to_theirs = matching(base, theirs);

    let mut chunks = Vec::new();
    let (mut i, mut j, mut k) = (0, 0, 0);

    loop {
        let stable_start = i;
        let stable_ours = j;
        while i < base.len() && to_ours[i] == Some(j) && to_theirs[i] == Some(k) {
            i += 1;
            j += 1;
            k += 1;
        }
        if i > stable_start {
            chunks.push(Chunk::Stable(&ours[stable_ours..j]));
        }

        if i == base.len() && j == ours.len() && k == theirs.len() {
            break;
        }

        // Next base line matched in both sides closes the unstable chunk.
        let next = (i..base.len()).find(|&b| to_ours[b].is_some() && to_theirs[b].is_some());
        let (end_b, end_o, end_t) = match next {
            Some(b) => (
                b,
                to_ours[b].unwrap_or(ours.len()),
                to_theirs[b].unwrap_or(theirs.len()),
            ),
            None => (base.len(), ours.len(), theirs.len()),
        };

        chunks.push(Chunk::Unstable {
            base: &base[i..end_b],
            ours: &ours[j..end_o],
            theirs: &theirs[k..end_t],
        });
        i = end_b;
        j = end_o;
        k = end_t;
    }

    chunks
}

/// For each line of `a`, the index of its partner in `b` under a longest
/// common subsequence, if any.
fn matching(a: &[&str], b: &[&str]) -> Vec<Option<usize>> {
    let mut result = vec![None; a.len()];

    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    for (idx, slot) in result.iter_mut().enumerate().take(prefix) {
        *slot = Some(idx);
    }

    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    for offset in 1..=suffix {
        result[a.len() - offset] = Some(b.len() - offset);
    }

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];
    if a_mid.is_empty() || b_mid.is_empty() {
        return result;
    }
    if a_mid.len().saturating_mul(b_mid.len()) > MAX_DIFF_CELLS {
        warn!(
            lines_a = a_mid.len(),
            lines_b = b_mid.len(),
            "Text too large to diff line by line; merging the changed region whole"
        );
        return result;
    }

    // lengths[x][y] = LCS length of a_mid[x..] and b_mid[y..]
    let width = b_mid.len() + 1;
    let mut lengths = vec![0u32; (a_mid.len() + 1) * width];
    for x in (0..a_mid.len()).rev() {
        for y in (0..b_mid.len()).rev() {
            lengths[x * width + y] = if a_mid[x] == b_mid[y] {
                lengths[(x + 1) * width + y + 1] + 1
            } else {
                lengths[(x + 1) * width + y].max(lengths[x * width + y + 1])
            };
        }
    }

    let (mut x, mut y) = (0, 0);
    while x < a_mid.len() && y < b_mid.len() {
        if a_mid[x] == b_mid[y] {
            result[prefix + x] = Some(prefix + y);
            x += 1;
            y += 1;
        } else if lengths[(x + 1) * width + y] >= lengths[x * width + y + 1] {
            x += 1;
        } else {
            y += 1;
        }
    }

    result
}
