//! Output formatting for `voltrigger` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::domain::TrackedInstrument;

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct InstrumentRow {
    pub instrument: String,
    pub active: bool,
    pub side: String,
    pub size: String,
    pub threshold: String,
    pub cooldown_ms: u64,
    pub last_metric: String,
    pub last_fired_ms: String,
    pub trades: u64,
    pub failed: u64,
    pub volume: String,
    pub success_rate: String,
}

impl From<&TrackedInstrument> for InstrumentRow {
    fn from(tracked: &TrackedInstrument) -> Self {
        let stats = &tracked.stats;
        Self {
            instrument: tracked.spec.id.clone(),
            active: tracked.active,
            side: tracked.spec.side.to_string(),
            size: tracked.spec.size.to_string(),
            threshold: format!("{}%", tracked.spec.threshold_pct),
            cooldown_ms: tracked.spec.cooldown_ms,
            last_metric: stats
                .last_metric
                .map(|m| format!("{}%", m))
                .unwrap_or_else(|| "-".to_string()),
            last_fired_ms: tracked
                .last_fired_ms
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            trades: stats.total_trades,
            failed: stats.failed_trades,
            volume: stats.total_volume.to_string(),
            success_rate: format!("{}%", stats.success_rate()),
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no instruments)");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

pub fn print_instruments(instruments: &[TrackedInstrument], mode: OutputMode) -> anyhow::Result<()> {
    let rows: Vec<InstrumentRow> = instruments.iter().map(InstrumentRow::from).collect();
    print_items(&rows, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstrumentSpec;
    use rust_decimal_macros::dec;

    #[test]
    fn test_row_from_fresh_instrument() {
        let tracked = TrackedInstrument::new(InstrumentSpec::new("SEI/USDT", dec!(10), 60_000));
        let row = InstrumentRow::from(&tracked);
        assert!(row.active);
        assert_eq!(row.threshold, "10%");
        assert_eq!(row.last_metric, "-");
        assert_eq!(row.last_fired_ms, "-");
        assert_eq!(row.success_rate, "0%");
    }

    #[test]
    fn test_table_renders_headers() {
        let tracked = TrackedInstrument::new(InstrumentSpec::new("SEI/USDT", dec!(10), 60_000));
        let rows = vec![InstrumentRow::from(&tracked)];
        let table = Table::new(&rows).to_string();
        assert!(table.contains("instrument"));
        assert!(table.contains("SEI/USDT"));
    }
}
