//! Plain-text views for the terminal commands

use std::fmt::Write;

use crate::candles::{axis_label_kst, format_kst, MarketStats};
use crate::heatmap::{HeatmapGrid, DAY_NAMES};
use crate::simulation::SimulationRun;
use crate::sweep::SweepResult;
use crate::types::{MarketCandle, Summary, TradeView};

/// Header cards: current, max and min premium
pub fn market_stats(stats: Option<&MarketStats>) -> String {
    match stats {
        Some(s) => format!(
            "Last Updated: {}\n\
             Current Premium:     {:>7.2}%\n\
             Max Spread (Period): {:>7.2}%\n\
             Min Spread (Period): {:>7.2}%",
            format_kst(s.last_updated),
            s.current,
            s.max,
            s.min
        ),
        None => "Last Updated: -\nNo candles available".to_string(),
    }
}

/// Chronological candle table
pub fn candle_table(candles: &[MarketCandle]) -> String {
    let mut out = format!(
        "{:<12} {:>8} {:>8} {:>8} {:>8} {:>8}\n",
        "Time (KST)", "Open", "High", "Low", "Close", "Avg"
    );
    for c in candles {
        let _ = writeln!(
            out,
            "{:<12} {:>7.2}% {:>7.2}% {:>7.2}% {:>7.2}% {:>7.2}%",
            axis_label_kst(c.bucket),
            c.open,
            c.high,
            c.low,
            c.close,
            c.avg_spread
        );
    }
    out
}

pub fn summary(summary: &Summary) -> String {
    format!(
        "Total Trades: {}\n\
         Win Rate:     {:.1}%\n\
         Gross Return: {:+.2}%\n\
         Net Return:   {:+.2}%\n\
         Net Profit:   {:+.0} KRW\n\
         Final Equity: {:.0} KRW",
        summary.total_trades,
        summary.win_rate,
        summary.gross_return,
        summary.net_return,
        summary.net_profit,
        summary.final_equity
    )
}

pub fn trade_table(trades: &[TradeView]) -> String {
    if trades.is_empty() {
        return "No trades".to_string();
    }

    let mut out = format!(
        "{:<20} {:<20} {:>8} {:>8} {:>8} {:>12}\n",
        "Entry (KST)", "Exit (KST)", "Entry", "Exit", "Net", "Profit"
    );
    for t in trades {
        let _ = writeln!(
            out,
            "{:<20} {:<20} {:>7.2}% {:>7.2}% {:>+7.2}% {:>12.0}",
            format_kst(t.entry_at).trim_end_matches(" KST"),
            format_kst(t.exit_at).trim_end_matches(" KST"),
            t.entry_spread,
            t.exit_spread,
            t.net_percent,
            t.profit_amount
        );
    }
    out
}

pub fn simulation(run: &SimulationRun) -> String {
    format!(
        "Backtest: entry {:.2}% / target +{:.2}% / {} days (capital {:.0} KRW, fee {:.2}%)\n\n{}\n\n{}",
        run.params.entry_spread,
        run.params.target_margin,
        run.params.period_days,
        run.inputs.capital,
        run.inputs.fee_rate,
        summary(&run.result.summary),
        trade_table(&run.result.trades)
    )
}

/// Heatmap as a table of average spreads, one row per KST day
pub fn heatmap(grid: &HeatmapGrid) -> String {
    if grid.is_empty() {
        return "No heatmap data".to_string();
    }

    let slots = HeatmapGrid::slots_per_day(grid.segment_minutes);
    let mut out = String::from("     ");
    for slot in 0..slots {
        let (hour, minute) = grid.slot_time(slot);
        let _ = write!(out, " {:02}:{:02}", hour, minute);
    }
    out.push('\n');

    for (day, row) in DAY_NAMES.iter().zip(&grid.rows) {
        let _ = write!(out, "{:<5}", day);
        for value in row {
            match value {
                Some(v) => {
                    let _ = write!(out, " {:>5.2}", v);
                }
                None => out.push_str("     -"),
            }
        }
        out.push('\n');
    }

    let _ = write!(out, "Scale: {:.2}% (low) .. {:.2}% (high)", grid.min, grid.max);
    out
}

pub fn sweep_top(results: &[SweepResult], limit: usize) -> String {
    if results.is_empty() {
        return "No sweep results".to_string();
    }

    let mut out = format!("Top {} by net profit:\n", limit.min(results.len()));
    for (i, r) in results.iter().take(limit).enumerate() {
        let s = &r.summary;
        let _ = writeln!(
            out,
            "  {}. entry={:.2}% target={:.2}%  P&L={:+.0} Trades={} WR={:.1}% Net={:+.2}%",
            i + 1,
            r.params.entry_spread,
            r.params.target_margin,
            s.net_profit,
            s.total_trades,
            s.win_rate,
            s.net_return
        );
    }
    out
}
