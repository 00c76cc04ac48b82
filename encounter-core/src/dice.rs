//! Dice rolling system.
//!
//! Supports single-term dice notation: `NdM`, `NdM+K` and `NdM-K`.
//! Every roll goes through a [`DieRoller`], so an encounter can be replayed
//! from a seed or driven by a fixed script of die faces.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
    #[error("dice expression out of range: {0}")]
    OutOfRange(String),
}

/// Largest dice count accepted from notation.
pub const MAX_DICE_COUNT: u32 = 100;
/// Largest die accepted from notation.
pub const MAX_DIE_SIDES: u32 = 1000;
/// Largest flat modifier, either sign, accepted from notation.
pub const MAX_MODIFIER: i32 = 10_000;

/// Narrow a 64-bit total into the `i32` range used by every roll.
fn clamp_total(total: i64) -> i32 {
    total.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

// ============================================================================
// Rollers
// ============================================================================

/// Source of die faces.
pub trait DieRoller: Send {
    /// Roll a single die, returning a value in `[1, sides]`.
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// A [`DieRoller`] backed by any `rand` RNG.
#[derive(Debug, Clone)]
pub struct RngRoller<R> {
    rng: R,
}

impl<R: Rng + Send> RngRoller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngRoller<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible roller: the same seed always yields the same faces.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> DieRoller for RngRoller<R> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

// ============================================================================
// Advantage
// ============================================================================

/// Whether a d20 roll takes the higher or lower of two dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Sources of advantage and disadvantage cancel out.
    pub fn combine(self, other: Advantage) -> Advantage {
        match (self, other) {
            (Advantage::Normal, x) | (x, Advantage::Normal) => x,
            (Advantage::Advantage, Advantage::Disadvantage) => Advantage::Normal,
            (Advantage::Disadvantage, Advantage::Advantage) => Advantage::Normal,
            (Advantage::Advantage, Advantage::Advantage) => Advantage::Advantage,
            (Advantage::Disadvantage, Advantage::Disadvantage) => Advantage::Disadvantage,
        }
    }

    pub fn note(&self) -> &'static str {
        match self {
            Advantage::Normal => "",
            Advantage::Advantage => " (Advantage)",
            Advantage::Disadvantage => " (Disadvantage)",
        }
    }
}

/// A d20 roll that may have been rolled twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Roll {
    /// Every face rolled, in order.
    pub rolls: Vec<u32>,
    /// The face that counts.
    pub kept: u32,
}

/// Roll a d20, twice under advantage or disadvantage.
pub fn roll_d20(roller: &mut dyn DieRoller, advantage: Advantage) -> D20Roll {
    let first = roller.roll_die(20);
    match advantage {
        Advantage::Normal => D20Roll {
            rolls: vec![first],
            kept: first,
        },
        Advantage::Advantage | Advantage::Disadvantage => {
            let second = roller.roll_die(20);
            let kept = if advantage == Advantage::Advantage {
                first.max(second)
            } else {
                first.min(second)
            };
            D20Roll {
                rolls: vec![first, second],
                kept,
            }
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// A single dice term such as `2d6+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceExpression {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Parse notation such as `1d8+3` or `d20`.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let cleaned: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if cleaned.is_empty() {
            return Err(DiceError::NoDice);
        }

        let invalid = || DiceError::InvalidNotation(notation.to_string());

        let d_pos = cleaned.find('d').ok_or_else(invalid)?;
        let count_str = &cleaned[..d_pos];
        let rest = &cleaned[d_pos + 1..];

        let out_of_range = || DiceError::OutOfRange(notation.to_string());
        let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

        let count: u32 = if count_str.is_empty() {
            1
        } else if all_digits(count_str) {
            count_str.parse().map_err(|_| out_of_range())?
        } else {
            return Err(invalid());
        };
        if count == 0 {
            return Err(DiceError::NoDice);
        }
        if count > MAX_DICE_COUNT {
            return Err(out_of_range());
        }

        let (sides_str, modifier) = match rest.find(|c: char| c == '+' || c == '-') {
            Some(pos) => {
                let (sign, digits) = rest[pos..].split_at(1);
                if !all_digits(digits) {
                    return Err(invalid());
                }
                let magnitude: i32 = digits.parse().map_err(|_| out_of_range())?;
                if magnitude > MAX_MODIFIER {
                    return Err(out_of_range());
                }
                let modifier = if sign == "-" { -magnitude } else { magnitude };
                (&rest[..pos], modifier)
            }
            None => (rest, 0),
        };

        if !all_digits(sides_str) {
            return Err(invalid());
        }
        let sides: u32 = sides_str.parse().map_err(|_| out_of_range())?;
        if sides == 0 {
            return Err(DiceError::InvalidDieSize(sides));
        }
        if sides > MAX_DIE_SIDES {
            return Err(out_of_range());
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }

    /// Same dice, different flat modifier.
    pub fn with_modifier(self, modifier: i32) -> Self {
        Self { modifier, ..self }
    }

    /// The dice term alone, without any modifier.
    pub fn dice_only(self) -> Self {
        self.with_modifier(0)
    }

    /// Critical-hit expression: twice the dice, same modifier.
    pub fn doubled_dice(self) -> Self {
        Self {
            count: self.count.saturating_mul(2),
            ..self
        }
    }

    /// Totals saturate at the `i32` bounds, so a roll always lands in
    /// `[min_total, max_total]`.
    pub fn min_total(&self) -> i32 {
        clamp_total(i64::from(self.count) + i64::from(self.modifier))
    }

    pub fn max_total(&self) -> i32 {
        let dice = i64::from(self.count).saturating_mul(i64::from(self.sides));
        clamp_total(dice.saturating_add(i64::from(self.modifier)))
    }

    /// Roll the expression.
    pub fn roll_with(&self, roller: &mut dyn DieRoller) -> RollResult {
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| roller.roll_die(self.sides))
            .collect();
        let dice_total = rolls
            .iter()
            .fold(0i64, |sum, r| sum.saturating_add(i64::from(*r)));

        RollResult {
            expression: self.to_string(),
            breakdown: breakdown(&rolls, self.modifier),
            rolls,
            modifier: self.modifier,
            total: clamp_total(dice_total.saturating_add(i64::from(self.modifier))),
            error: None,
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "-{}", m.abs()),
        }
    }
}

fn breakdown(rolls: &[u32], modifier: i32) -> String {
    let faces = rolls
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("+");
    match modifier {
        0 => format!("[{faces}]"),
        m if m > 0 => format!("[{faces}]+{m}"),
        m => format!("[{faces}]{m}"),
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result of rolling a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub expression: String,
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
    /// Human-readable breakdown, e.g. `[3+5]+2`.
    pub breakdown: String,
    /// Set when the notation could not be parsed.
    pub error: Option<String>,
}

impl RollResult {
    /// Zero-total result standing in for unparsable notation.
    pub fn failed(notation: &str, error: &DiceError) -> Self {
        Self {
            expression: notation.to_string(),
            rolls: Vec::new(),
            modifier: 0,
            total: 0,
            breakdown: "Error".to_string(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the total reaches `dc`.
    pub fn meets_dc(&self, dc: i32) -> bool {
        self.total >= dc
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.breakdown, self.total)
    }
}

/// Roll dice from notation, failing on malformed input.
pub fn roll(notation: &str, roller: &mut dyn DieRoller) -> Result<RollResult, DiceError> {
    let expr = DiceExpression::parse(notation)?;
    Ok(expr.roll_with(roller))
}

/// Roll dice from notation. Malformed input yields a zero-total result.
pub fn roll_expression(notation: &str, roller: &mut dyn DieRoller) -> RollResult {
    match roll(notation, roller) {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(notation, error = %err, "malformed dice expression");
            RollResult::failed(notation, &err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRoller;

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d20").unwrap();
        assert_eq!(expr, DiceExpression::new(1, 20, 0));
    }

    #[test]
    fn test_parse_signed_modifiers() {
        let expr = DiceExpression::parse("1d20+5").unwrap();
        assert_eq!(expr.modifier, 5);

        let expr = DiceExpression::parse("2d6-2").unwrap();
        assert_eq!(expr.modifier, -2);

        let expr = DiceExpression::parse(" 3D4 + 3 ").unwrap();
        assert_eq!(expr, DiceExpression::new(3, 4, 3));
    }

    #[test]
    fn test_parse_odd_die_sizes() {
        let expr = DiceExpression::parse("1d2").unwrap();
        assert_eq!(expr.sides, 2);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            DiceExpression::parse("banana"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert!(matches!(DiceExpression::parse(""), Err(DiceError::NoDice)));
        assert!(matches!(DiceExpression::parse("0d6"), Err(DiceError::NoDice)));
        assert!(matches!(
            DiceExpression::parse("1d0"),
            Err(DiceError::InvalidDieSize(0))
        ));
        assert!(DiceExpression::parse("1d6+x").is_err());
    }

    #[test]
    fn test_oversized_notation_is_rejected() {
        for notation in ["1d6+2147483647", "1d4000000000", "70000d70000", "101d6", "1d1001", "1d6-10001"] {
            assert!(
                matches!(DiceExpression::parse(notation), Err(DiceError::OutOfRange(_))),
                "{notation} should be out of range"
            );
        }
        assert!(DiceExpression::parse("100d1000+10000").is_ok());
        assert!(DiceExpression::parse("1d6+-2").is_err());

        let mut roller = RngRoller::seeded(3);
        let result = roll_expression("1d6+2147483647", &mut roller);
        assert!(result.is_error());
        assert_eq!(result.total, 0);
    }

    #[test]
    fn test_huge_constructed_expression_saturates() {
        let expr = DiceExpression::new(2, u32::MAX, i32::MAX);
        assert_eq!(expr.max_total(), i32::MAX);
        assert_eq!(expr.min_total(), i32::MAX);
        assert_eq!(expr.doubled_dice().count, 4);
        assert_eq!(DiceExpression::new(u32::MAX, 6, 0).doubled_dice().count, u32::MAX);

        let mut roller = RngRoller::seeded(9);
        let result = expr.roll_with(&mut roller);
        assert_eq!(result.total, i32::MAX);

        let low = DiceExpression::new(1, u32::MAX, i32::MIN);
        let result = low.roll_with(&mut roller);
        assert!(result.total >= low.min_total() && result.total <= low.max_total());
    }

    #[test]
    fn test_display_omits_zero_and_signs_negative() {
        assert_eq!(DiceExpression::new(1, 8, 0).to_string(), "1d8");
        assert_eq!(DiceExpression::new(1, 8, 3).to_string(), "1d8+3");
        assert_eq!(DiceExpression::new(2, 6, -1).to_string(), "2d6-1");
    }

    #[test]
    fn test_doubled_dice_keeps_modifier() {
        let expr = DiceExpression::parse("1d6+2").unwrap().doubled_dice();
        assert_eq!(expr.to_string(), "2d6+2");
    }

    #[test]
    fn test_roll_expression_breakdown() {
        let mut roller = ScriptedRoller::new([3, 5]);
        let result = roll_expression("2d6+2", &mut roller);
        assert_eq!(result.total, 10);
        assert_eq!(result.rolls, vec![3, 5]);
        assert_eq!(result.breakdown, "[3+5]+2");
        assert!(!result.is_error());
    }

    #[test]
    fn test_malformed_expression_is_zero_result() {
        let mut roller = RngRoller::seeded(1);
        let result = roll_expression("not dice", &mut roller);
        assert_eq!(result.total, 0);
        assert!(result.rolls.is_empty());
        assert_eq!(result.breakdown, "Error");
        assert!(result.is_error());
    }

    #[test]
    fn test_roll_range() {
        let mut roller = RngRoller::seeded(42);
        for _ in 0..200 {
            let result = roll("1d20+5", &mut roller).unwrap();
            assert!(result.total >= 6 && result.total <= 25);
        }
    }

    #[test]
    fn test_seeded_rollers_agree() {
        let mut a = RngRoller::seeded(7);
        let mut b = RngRoller::seeded(7);
        let left: Vec<u32> = (0..20).map(|_| a.roll_die(20)).collect();
        let right: Vec<u32> = (0..20).map(|_| b.roll_die(20)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_advantage_sources_cancel() {
        assert_eq!(
            Advantage::Normal.combine(Advantage::Advantage),
            Advantage::Advantage
        );
        assert_eq!(
            Advantage::Advantage.combine(Advantage::Disadvantage),
            Advantage::Normal
        );
        assert_eq!(
            Advantage::Disadvantage.combine(Advantage::Disadvantage),
            Advantage::Disadvantage
        );
    }

    #[test]
    fn test_d20_advantage_keeps_extremes() {
        let mut roller = ScriptedRoller::new([4, 17]);
        let roll = roll_d20(&mut roller, Advantage::Advantage);
        assert_eq!(roll.kept, 17);
        assert_eq!(roll.rolls, vec![4, 17]);

        let mut roller = ScriptedRoller::new([4, 17]);
        let roll = roll_d20(&mut roller, Advantage::Disadvantage);
        assert_eq!(roll.kept, 4);

        let mut roller = ScriptedRoller::new([4, 17]);
        let roll = roll_d20(&mut roller, Advantage::Normal);
        assert_eq!(roll.rolls, vec![4]);
    }
}
