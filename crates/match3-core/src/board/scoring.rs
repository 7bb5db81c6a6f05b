//! Tiered scoring.
//!
//! Points are awarded per resolution pass from the total number of cells
//! removed in that pass, not from the number of runs.

/// Points for a pass that removes exactly three cells.
pub const POINTS_THREE: u32 = 30;
/// Points for a pass that removes exactly four cells.
pub const POINTS_FOUR: u32 = 60;
/// Points for a pass that removes five or more cells.
pub const POINTS_FIVE_PLUS: u32 = 100;

/// Points for removing `count` cells in one pass.
pub fn score_for_count(count: u32) -> u32 {
    match count {
        3 => POINTS_THREE,
        4 => POINTS_FOUR,
        5.. => POINTS_FIVE_PLUS,
        n => n * 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(score_for_count(3), 30);
        assert_eq!(score_for_count(4), 60);
        assert_eq!(score_for_count(5), 100);
        assert_eq!(score_for_count(12), 100);
    }

    #[test]
    fn test_below_minimum_run() {
        assert_eq!(score_for_count(0), 0);
        assert_eq!(score_for_count(2), 20);
    }
}
