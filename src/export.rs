use std::fs::File;
use std::io::Write;

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;

use crate::llama::{ChartPoint, TvlPoint};

/// Output filename for a protocol/chain/aggregate label, e.g.
/// `TLV_history_UNI.csv`.
pub fn history_path(label: &str) -> String {
    format!("TLV_history_{}.csv", label)
}

// Serialize-only projection of a TvlPoint down to the one column we keep.
#[derive(Debug, Serialize)]
struct TvlRow {
    tvl: f64,
}

/// Write a protocol series as a single `tvl` column, one row per record in
/// API order, no index column. The header is written even when the series is
/// empty.
pub fn write_tvl_column<W: Write>(out: W, points: &[TvlPoint]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);

    wtr.write_record(["tvl"])?;
    for point in points {
        wtr.serialize(TvlRow { tvl: point.tvl })?;
    }
    wtr.flush()?;

    Ok(())
}

/// Write an aggregate or single-chain series with every source column kept
/// under its source name.
pub fn write_chart<W: Write>(out: W, points: &[ChartPoint]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);

    wtr.write_record(["date", "totalLiquidityUSD"])?;
    for point in points {
        wtr.serialize(point)?;
    }
    wtr.flush()?;

    Ok(())
}

pub fn save_tvl_column(path: &str, points: &[TvlPoint]) -> Result<()> {
    write_tvl_column(File::create(path)?, points)
}

pub fn save_chart(path: &str, points: &[ChartPoint]) -> Result<()> {
    write_chart(File::create(path)?, points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written<F: FnOnce(&mut Vec<u8>)>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn projects_protocol_series_to_tvl_column() {
        let points = vec![
            TvlPoint { date: 1000, tvl: 500.0 },
            TvlPoint { date: 2000, tvl: 600.0 },
        ];

        let csv = written(|buf| write_tvl_column(buf, &points).unwrap());

        assert_eq!(csv, "tvl\n500.0\n600.0\n");
    }

    #[test]
    fn empty_series_still_gets_a_header() {
        let csv = written(|buf| write_tvl_column(buf, &[]).unwrap());
        assert_eq!(csv, "tvl\n");
    }

    #[test]
    fn chart_keeps_all_source_columns() {
        let points = vec![
            ChartPoint { date: 1603670400, total_liquidity_usd: 11.59 },
            ChartPoint { date: 1603756800, total_liquidity_usd: 12.0 },
        ];

        let csv = written(|buf| write_chart(buf, &points).unwrap());

        assert_eq!(
            csv,
            "date,totalLiquidityUSD\n1603670400,11.59\n1603756800,12.0\n"
        );
    }

    #[test]
    fn row_count_matches_record_count() {
        let points: Vec<TvlPoint> = (0..37)
            .map(|i| TvlPoint { date: i * 100, tvl: i as f64 })
            .collect();

        let csv = written(|buf| write_tvl_column(buf, &points).unwrap());

        assert_eq!(csv.lines().count(), points.len() + 1);
    }

    #[test]
    fn history_path_uses_original_naming() {
        assert_eq!(history_path("UNI"), "TLV_history_UNI.csv");
        assert_eq!(history_path("all"), "TLV_history_all.csv");
    }
}
