//! Trade P&L aggregation
//!
//! Turns the entry/exit spread pairs returned by the backtest engine into
//! per-trade figures and run totals. Each trade is allocated half of the
//! capital; there is no running balance and no compounding between trades.

use crate::types::{AggregationInputs, Aggregation, Summary, TradeRecord, TradeView};

/// Fraction of capital committed to every trade (two-leg spread position)
pub const TRADE_ALLOCATION: f64 = 0.5;

/// Derive the per-trade view of a single record
pub fn trade_view(trade: &TradeRecord, inputs: &AggregationInputs) -> TradeView {
    let spread_diff = trade.exit_spread - trade.entry_spread;
    let net_percent = spread_diff - inputs.fee_rate;
    let profit_amount = (inputs.capital * TRADE_ALLOCATION) * (net_percent / 100.0);

    TradeView {
        entry_at: trade.entry_at,
        exit_at: trade.exit_at,
        entry_spread: trade.entry_spread,
        exit_spread: trade.exit_spread,
        spread_diff,
        net_percent,
        profit_amount,
    }
}

/// Aggregate a trade list into per-trade views and a summary.
///
/// Non-finite inputs are not rejected; they propagate into the results.
pub fn aggregate(trades: &[TradeRecord], inputs: &AggregationInputs) -> Aggregation {
    let mut views = Vec::with_capacity(trades.len());
    let mut wins = 0u32;
    let mut gross_return = 0.0;
    let mut net_return = 0.0;
    let mut net_profit = 0.0;

    for trade in trades {
        let view = trade_view(trade, inputs);

        // Zero net is not a win
        if view.net_percent > 0.0 {
            wins += 1;
        }
        gross_return += view.spread_diff;
        net_return += view.net_percent;
        net_profit += view.profit_amount;

        views.push(view);
    }

    let total_trades = views.len() as u32;
    let win_rate = if total_trades > 0 {
        wins as f64 / total_trades as f64 * 100.0
    } else {
        0.0
    };

    Aggregation {
        trades: views,
        summary: Summary {
            total_trades,
            wins,
            win_rate,
            gross_return,
            net_return,
            net_profit,
            final_equity: inputs.capital + net_profit,
        },
    }
}
