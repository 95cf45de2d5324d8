//! In-memory paper trading platform.
//!
//! Market orders fill immediately at the decision's entry price. Positions
//! are netted per pair and marked through a [`PriceSource`]; realized P&L
//! moves the cash balance.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ooda_core::{
    AssetPair, BoxFuture, CoreError, Decision, ExecutionReport, OrderStatus, PlatformPosition,
    PortfolioBreakdown, PositionSide, Price, RawFuturesPosition, Result, Size, TradingPlatform,
};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PaperConfig;

/// Mark prices for paper positions.
pub trait PriceSource: Send + Sync {
    fn mark(&self, asset_pair: &AssetPair) -> Option<Price>;
}

/// Fixed marks, settable at runtime.
#[derive(Debug, Default)]
pub struct StaticPrices {
    marks: RwLock<HashMap<AssetPair, Price>>,
}

impl StaticPrices {
    #[must_use]
    pub fn new(marks: HashMap<AssetPair, Price>) -> Self {
        Self {
            marks: RwLock::new(marks),
        }
    }

    pub fn set(&self, asset_pair: AssetPair, price: Price) {
        self.marks.write().insert(asset_pair, price);
    }
}

impl PriceSource for StaticPrices {
    fn mark(&self, asset_pair: &AssetPair) -> Option<Price> {
        self.marks.read().get(asset_pair).copied()
    }
}

#[derive(Debug, Clone)]
struct PaperPosition {
    side: PositionSide,
    size: Size,
    entry_price: Price,
    opened_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct PaperBook {
    cash: Decimal,
    positions: HashMap<AssetPair, PaperPosition>,
    orders: HashMap<String, OrderStatus>,
}

impl PaperBook {
    /// Apply a fill, netting against any open position on the pair.
    fn fill(&mut self, asset_pair: &AssetPair, side: PositionSide, size: Size, price: Price) {
        let Some(existing) = self.positions.get_mut(asset_pair) else {
            self.positions.insert(
                asset_pair.clone(),
                PaperPosition {
                    side,
                    size,
                    entry_price: price,
                    opened_at: Utc::now(),
                },
            );
            return;
        };

        if existing.side == side {
            let total = existing.size + size;
            let cost = existing.entry_price.inner() * existing.size.inner()
                + price.inner() * size.inner();
            existing.entry_price = Price::new(cost / total.inner());
            existing.size = total;
            return;
        }

        let closing = existing.size.min(size);
        let realized = PlatformPosition::pnl_at(existing.side, existing.entry_price, price, closing);
        self.cash += realized.inner();

        let remaining = existing.size - closing;
        if remaining.is_positive() {
            existing.size = remaining;
        } else {
            self.positions.remove(asset_pair);
        }

        let flipped = size - closing;
        if flipped.is_positive() {
            self.positions.insert(
                asset_pair.clone(),
                PaperPosition {
                    side,
                    size: flipped,
                    entry_price: price,
                    opened_at: Utc::now(),
                },
            );
        }
    }
}

/// Paper trading platform.
pub struct PaperPlatform {
    book: Mutex<PaperBook>,
    prices: Arc<dyn PriceSource>,
}

impl PaperPlatform {
    #[must_use]
    pub fn new(initial_balance: Decimal, prices: Arc<dyn PriceSource>) -> Self {
        Self {
            book: Mutex::new(PaperBook {
                cash: initial_balance,
                ..PaperBook::default()
            }),
            prices,
        }
    }

    /// Platform with static marks taken from configuration.
    #[must_use]
    pub fn from_config(config: &PaperConfig) -> Self {
        Self::new(
            config.initial_balance,
            Arc::new(StaticPrices::new(config.marks.clone())),
        )
    }

    #[must_use]
    pub fn cash(&self) -> Decimal {
        self.book.lock().cash
    }

    fn mark_or(&self, asset_pair: &AssetPair, fallback: Price) -> Price {
        self.prices.mark(asset_pair).unwrap_or(fallback)
    }
}

impl TradingPlatform for PaperPlatform {
    fn get_portfolio_breakdown(&self) -> BoxFuture<'_, Result<PortfolioBreakdown>> {
        Box::pin(async move {
            let book = self.book.lock();
            let mut total = book.cash;
            let mut futures_positions = Vec::with_capacity(book.positions.len());
            for (pair, position) in &book.positions {
                let mark = self.mark_or(pair, position.entry_price);
                let pnl = PlatformPosition::pnl_at(
                    position.side,
                    position.entry_price,
                    mark,
                    position.size,
                );
                total += pnl.inner();
                futures_positions.push(RawFuturesPosition {
                    product_id: Some(pair.to_string()),
                    side: Some(position.side.to_string()),
                    contracts: Some(position.size.inner()),
                    entry_price: Some(position.entry_price.inner()),
                    current_price: Some(mark.inner()),
                    unrealized_pnl: Some(pnl.inner()),
                    opened_at: Some(position.opened_at),
                });
            }
            Ok(PortfolioBreakdown {
                total_value_usd: Price::new(total),
                futures_positions,
                as_of: Some(Utc::now()),
                market_stats: Default::default(),
            })
        })
    }

    fn execute_trade<'a>(&'a self, decision: &'a Decision) -> BoxFuture<'a, Result<ExecutionReport>> {
        Box::pin(async move {
            let Some(side) = decision.action.side() else {
                return Ok(ExecutionReport::failed("HOLD is not an order"));
            };
            if !decision.recommended_position_size.is_positive() {
                return Ok(ExecutionReport::failed("non-positive size"));
            }

            let order_id = format!("paper-{}", Uuid::new_v4());
            let mut book = self.book.lock();
            book.fill(
                &decision.asset_pair,
                side,
                decision.recommended_position_size,
                decision.entry_price,
            );
            book.orders.insert(order_id.clone(), OrderStatus::Filled);
            info!(
                %order_id,
                asset_pair = %decision.asset_pair,
                action = %decision.action,
                size = %decision.recommended_position_size,
                price = %decision.entry_price,
                "Paper order filled"
            );
            Ok(ExecutionReport::accepted(order_id))
        })
    }

    fn get_order_status<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, Result<Option<OrderStatus>>> {
        Box::pin(async move { Ok(self.book.lock().orders.get(order_id).copied()) })
    }

    fn close_position<'a>(&'a self, position: &'a PlatformPosition) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut book = self.book.lock();
            let open = book
                .positions
                .get(&position.asset_pair)
                .filter(|p| p.side == position.side)
                .cloned()
                .ok_or_else(|| {
                    CoreError::Rejected(format!(
                        "no open {} position on {}",
                        position.side, position.asset_pair
                    ))
                })?;

            let mark = self.mark_or(&position.asset_pair, position.current_price);
            let realized = PlatformPosition::pnl_at(open.side, open.entry_price, mark, open.size);
            book.cash += realized.inner();
            book.positions.remove(&position.asset_pair);
            debug!(
                asset_pair = %position.asset_pair,
                %realized,
                "Paper position closed"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ooda_core::{DecisionId, TradeAction};
    use rust_decimal_macros::dec;

    fn pair() -> AssetPair {
        AssetPair::new("BTC-USD").unwrap()
    }

    fn order(action: TradeAction, size: Decimal, price: Decimal) -> Decision {
        Decision {
            id: DecisionId::generate(),
            asset_pair: pair(),
            action,
            confidence: 70.0,
            recommended_position_size: Size::new(size),
            entry_price: Price::new(price),
            reasoning: String::new(),
            created_at: Utc::now(),
        }
    }

    fn platform() -> (PaperPlatform, Arc<StaticPrices>) {
        let prices = Arc::new(StaticPrices::default());
        (PaperPlatform::new(dec!(10000), prices.clone()), prices)
    }

    #[tokio::test]
    async fn test_fill_and_mark() {
        let (paper, prices) = platform();
        let report = paper
            .execute_trade(&order(TradeAction::Buy, dec!(2), dec!(100)))
            .await
            .unwrap();
        assert!(report.success);
        let order_id = report.order_id.unwrap();
        assert_eq!(
            paper.get_order_status(&order_id).await.unwrap(),
            Some(OrderStatus::Filled)
        );

        prices.set(pair(), Price::new(dec!(110)));
        let breakdown = paper.get_portfolio_breakdown().await.unwrap();
        assert_eq!(breakdown.total_value_usd, Price::new(dec!(10020)));
        let positions = breakdown.validated_positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].side, PositionSide::Long);
        assert_eq!(positions[0].unrealized_pnl, Price::new(dec!(20)));
    }

    #[tokio::test]
    async fn test_same_side_averages_entry() {
        let (paper, _) = platform();
        paper
            .execute_trade(&order(TradeAction::Buy, dec!(1), dec!(100)))
            .await
            .unwrap();
        paper
            .execute_trade(&order(TradeAction::Buy, dec!(1), dec!(200)))
            .await
            .unwrap();

        let positions = paper
            .get_portfolio_breakdown()
            .await
            .unwrap()
            .validated_positions()
            .unwrap();
        assert_eq!(positions[0].size, Size::new(dec!(2)));
        assert_eq!(positions[0].entry_price, Price::new(dec!(150)));
    }

    #[tokio::test]
    async fn test_opposite_side_reduces_then_flips() {
        let (paper, _) = platform();
        paper
            .execute_trade(&order(TradeAction::Buy, dec!(2), dec!(100)))
            .await
            .unwrap();
        paper
            .execute_trade(&order(TradeAction::Sell, dec!(3), dec!(120)))
            .await
            .unwrap();

        // 2 closed at +20 each, 1 left short
        assert_eq!(paper.cash(), dec!(10040));
        let positions = paper
            .get_portfolio_breakdown()
            .await
            .unwrap()
            .validated_positions()
            .unwrap();
        assert_eq!(positions[0].side, PositionSide::Short);
        assert_eq!(positions[0].size, Size::new(dec!(1)));
    }

    #[tokio::test]
    async fn test_close_position_realizes_at_mark() {
        let (paper, prices) = platform();
        paper
            .execute_trade(&order(TradeAction::Sell, dec!(1), dec!(100)))
            .await
            .unwrap();
        prices.set(pair(), Price::new(dec!(90)));

        let position = paper
            .get_portfolio_breakdown()
            .await
            .unwrap()
            .validated_positions()
            .unwrap()
            .remove(0);
        paper.close_position(&position).await.unwrap();

        assert_eq!(paper.cash(), dec!(10010));
        assert!(paper.close_position(&position).await.is_err());
        let breakdown = paper.get_portfolio_breakdown().await.unwrap();
        assert!(breakdown.futures_positions.is_empty());
    }

    #[tokio::test]
    async fn test_hold_is_refused() {
        let (paper, _) = platform();
        let report = paper
            .execute_trade(&order(TradeAction::Hold, dec!(1), dec!(100)))
            .await
            .unwrap();
        assert!(!report.success);
    }
}
