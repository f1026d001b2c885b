use super::TokenKind;

/// Highest operator tier; resolution walks from here down to 0.
pub const MAX_PRECEDENCE: u8 = 10;

/// Direction of the fold for one precedence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Left to right: `a - b - c` folds as `(a - b) - c`
    Forward,
    /// Right to left, used by the logical and xor tiers
    Reverse,
}

/// Tiers folded right to left so chained `and` / `or` / `^` short-circuit
/// from the left when the tree is walked.
const REVERSED_OPERATORS: [TokenKind; 3] =
    [TokenKind::LogicalAnd, TokenKind::LogicalOr, TokenKind::Xor];

pub fn is_reversed_tier(tier: u8) -> bool {
    REVERSED_OPERATORS
        .iter()
        .any(|kind| kind.precedence() == Some(tier))
}

pub fn scan_direction(tier: u8) -> ScanDirection {
    if is_reversed_tier(tier) {
        ScanDirection::Reverse
    } else {
        ScanDirection::Forward
    }
}
