//! Exit reason heuristic.
//!
//! Venues report that a position is gone, not why. The reason is inferred
//! from how the trade ended: a tracker stopped from outside is a forced
//! stop, otherwise the final return on notional is compared with the
//! per-trade stop-loss / take-profit levels. Returns within 10% of a level
//! count as hitting it, to absorb slippage. This is approximate.

use ooda_core::{ExitReason, Pct};

/// Fraction of a level that counts as reaching it.
const LEVEL_TOLERANCE: f64 = 0.9;

/// Classify how a trade ended.
///
/// `return_fraction` is realized P&L / entry notional (`-0.02` = -2%).
/// A zero level disables that branch.
#[must_use]
pub fn classify_exit(
    forced: bool,
    return_fraction: f64,
    stop_loss: Pct,
    take_profit: Pct,
) -> ExitReason {
    if forced {
        return ExitReason::ForcedStop;
    }
    let sl = stop_loss.fraction();
    if sl > 0.0 && return_fraction <= -sl * LEVEL_TOLERANCE {
        return ExitReason::StopLoss;
    }
    let tp = take_profit.fraction();
    if tp > 0.0 && return_fraction >= tp * LEVEL_TOLERANCE {
        return ExitReason::TakeProfit;
    }
    ExitReason::Manual
}
