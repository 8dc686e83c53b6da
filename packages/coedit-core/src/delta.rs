//! Delta generation: turn an "old text → new text" transition into an operation sequence.
//!
//! Two tiers. The common prefix and suffix are always stripped first, which is linear and
//! already minimal for single-cursor typing. When the remaining middle region is large on
//! both sides (typically a paste over a selection, or a reformat), a bounded Myers search
//! finds the shortest edit script inside it so unchanged runs are retained rather than
//! deleted and reinserted. Both tiers satisfy `apply(old, generate_delta(old, new)) == new`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ops::OperationSeq;

/// Tuning knobs for [`generate_delta_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiffOptions {
    /// Minimum combined length (old + new, in chars) of the differing middle region before
    /// the edit-graph search is attempted.
    pub myers_threshold: usize,
    /// Upper bound on the edit distance explored by the search; past it the middle region
    /// is emitted as a single replace.
    pub max_edit_distance: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            myers_threshold: 64,
            max_edit_distance: 1024,
        }
    }
}

pub fn generate_delta(old: &str, new: &str) -> OperationSeq {
    generate_delta_with(old, new, &DiffOptions::default())
}

pub fn generate_delta_with(old: &str, new: &str, options: &DiffOptions) -> OperationSeq {
    let mut delta = OperationSeq::new();
    if old == new {
        return delta;
    }

    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();

    let prefix = common_prefix(&old, &new);
    let suffix = common_suffix(&old[prefix..], &new[prefix..]);
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    delta.retain(prefix);

    let script = if !old_mid.is_empty()
        && !new_mid.is_empty()
        && old_mid.len() + new_mid.len() >= options.myers_threshold
    {
        shortest_edit(old_mid, new_mid, options.max_edit_distance)
    } else {
        None
    };

    match script {
        Some(steps) => {
            let mut buf = [0u8; 4];
            for step in steps {
                match step {
                    Step::Equal => delta.retain(1),
                    Step::Delete => delta.delete(1),
                    Step::Insert(c) => delta.insert(c.encode_utf8(&mut buf)),
                };
            }
        }
        None => {
            let inserted: String = new_mid.iter().collect();
            delta.delete(old_mid.len()).insert(&inserted);
        }
    }

    delta.retain(suffix);
    delta
}

fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Equal,
    Delete,
    Insert(char),
}

/// Myers' O(ND) shortest edit script between `a` and `b`, or `None` when the edit
/// distance exceeds `max_d`.
fn shortest_edit(a: &[char], b: &[char], max_d: usize) -> Option<Vec<Step>> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let limit = (a.len() + b.len()).min(max_d) as isize;
    let offset = limit + 1;

    // `v[k + offset]` is the furthest x reached on diagonal k.
    let mut v = vec![0isize; 2 * limit as usize + 3];
    // `trace[d]` holds diagonals -d..=d after round d.
    let mut trace: Vec<Vec<isize>> = Vec::new();

    for d in 0..=limit {
        let mut k = -d;
        while k <= d {
            let down = k == -d
                || (k != d && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize]);
            let mut x = if down {
                v[(k + 1 + offset) as usize]
            } else {
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[(k + offset) as usize] = x;

            if x >= n && y >= m {
                trace.push(v[(offset - d) as usize..=(offset + d) as usize].to_vec());
                return Some(backtrack(&trace, b, n, m));
            }
            k += 2;
        }
        trace.push(v[(offset - d) as usize..=(offset + d) as usize].to_vec());
    }

    None
}

fn backtrack(trace: &[Vec<isize>], b: &[char], n: isize, m: isize) -> Vec<Step> {
    let mut steps = Vec::new();
    let (mut x, mut y) = (n, m);

    for d in (0..trace.len() as isize).rev() {
        if d == 0 {
            while x > 0 && y > 0 {
                steps.push(Step::Equal);
                x -= 1;
                y -= 1;
            }
            break;
        }

        let prev = &trace[(d - 1) as usize];
        let at = |k: isize| prev[(k + d - 1) as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = at(prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            steps.push(Step::Equal);
            x -= 1;
            y -= 1;
        }
        if prev_k == k + 1 {
            steps.push(Step::Insert(b[prev_y as usize]));
        } else {
            steps.push(Step::Delete);
        }
        x = prev_x;
        y = prev_y;
    }

    steps.reverse();
    steps
}
