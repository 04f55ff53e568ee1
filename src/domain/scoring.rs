/// Challenge scoring: compare a player's grid with the target.
///
/// Pure functions over immutable snapshots of both cell arrays.
///
///   percentage = round(100 * correct / total)
///   elapsed    = whole seconds since the clock started (0 if it never ran)
///   score      = max(0, percentage * 10 - elapsed)
///
/// A level counts as solved at a rounded percentage of 100, so on a
/// 16x16 grid one wrong cell still passes. `CheckResult::is_perfect` is
/// the exact rule used where every cell must match.

use std::collections::BTreeSet;

use super::grid::BitDepth;
use super::legend::bit_codes;

/// Points per percentage point.
pub const POINTS_PER_PERCENT: i64 = 10;

/// Result of a cell-by-cell comparison.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CheckResult {
    pub correct: usize,
    pub wrong: BTreeSet<usize>,
    pub total: usize,
}

impl CheckResult {
    pub fn percentage(&self) -> u32 {
        percentage(self.correct, self.total)
    }

    /// Every cell matches. Stricter than a rounded 100%.
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.correct == self.total
    }
}

/// Everything shown after pressing Check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreReport {
    pub check: CheckResult,
    pub percentage: u32,
    pub elapsed_secs: u64,
    pub score: u32,
}

impl ScoreReport {
    pub fn new(check: CheckResult, elapsed_secs: u64) -> Self {
        let percentage = check.percentage();
        ScoreReport { percentage, elapsed_secs, score: score(percentage, elapsed_secs), check }
    }

    /// Level pass rule: the rounded percentage reads 100.
    pub fn passed(&self) -> bool {
        self.percentage == 100
    }

    /// `Correct: 75% (3/4) | Time: 5s | Score: 745`
    pub fn summary(&self) -> String {
        format!(
            "Correct: {}% ({}/{}) | Time: {}s | Score: {}",
            self.percentage, self.check.correct, self.check.total, self.elapsed_secs, self.score,
        )
    }
}

/// Element-wise comparison. Indices present in only one of the slices
/// count as wrong.
pub fn check(player: &[u8], target: &[u8]) -> CheckResult {
    let total = target.len();
    let mut result = CheckResult { total, ..CheckResult::default() };
    for idx in 0..total {
        if player.get(idx) == target.get(idx) {
            result.correct += 1;
        } else {
            result.wrong.insert(idx);
        }
    }
    result
}

/// Compare typed codes with the canonical code of each target cell.
///
/// Whitespace in `typed` is layout and is removed; every other character
/// stays, so a stray character or a short code throws later windows off
/// and they fail to match.
pub fn check_typed(typed: &str, target: &[u8], depth: BitDepth) -> CheckResult {
    let codes = bit_codes(depth);
    let compact: Vec<char> = typed.chars().filter(|c| !c.is_whitespace()).collect();
    let windows: Vec<String> = compact.chunks(depth.bits()).map(|w| w.iter().collect()).collect();

    let mut result = CheckResult { total: target.len(), ..CheckResult::default() };
    for (idx, &value) in target.iter().enumerate() {
        let expected = codes.get(value as usize).copied();
        if windows.get(idx).map(String::as_str) == expected {
            result.correct += 1;
        } else {
            result.wrong.insert(idx);
        }
    }
    result
}

/// `round(100 * correct / total)`; an empty grid counts as 0%.
pub fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as u32
}

/// `max(0, percentage * 10 - elapsed)`.
pub fn score(percentage: u32, elapsed_secs: u64) -> u32 {
    let raw = percentage as i64 * POINTS_PER_PERCENT - elapsed_secs.min(i64::MAX as u64) as i64;
    raw.max(0) as u32
}
