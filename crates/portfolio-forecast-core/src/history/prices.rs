use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Range;
use tracing::{debug, warn};

use crate::error::ForecastError;
use crate::statistics::AssetHistory;
use crate::types::ReturnFrequency;
use crate::ForecastResult;

/// One row of a daily price snapshot as exported by the data collector.
///
/// Header spellings vary between exports ("Adj Close" vs "Adj_Close"), so
/// both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPriceRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Close", default)]
    pub close: Option<String>,
    #[serde(rename = "Adj_Close", alias = "Adj Close", default)]
    pub adj_close: Option<String>,
}

/// A parsed closing price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: Option<Decimal>,
    #[serde(default)]
    pub adj_close: Option<Decimal>,
}

impl PriceObservation {
    /// Adjusted close, falling back to the raw close.
    pub fn price(&self) -> Option<Decimal> {
        self.adj_close.or(self.close)
    }
}

/// Date-ordered, de-duplicated prices of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<(NaiveDate, Decimal)>,
}

/// Parse raw rows, dropping rows whose date or both prices are unusable.
/// Returns the parsed observations and the number of rows dropped.
pub fn parse_rows(rows: Vec<RawPriceRow>) -> (Vec<PriceObservation>, usize) {
    let total = rows.len();
    let parsed: Vec<PriceObservation> = rows
        .into_iter()
        .filter_map(|row| {
            let date = parse_date(&row.date).ok()?;
            let close = row.close.as_deref().and_then(parse_price);
            let adj_close = row.adj_close.as_deref().and_then(parse_price);
            if close.is_none() && adj_close.is_none() {
                return None;
            }
            Some(PriceObservation {
                ticker: row.ticker.trim().to_string(),
                date,
                close,
                adj_close,
            })
        })
        .collect();
    let dropped = total - parsed.len();
    (parsed, dropped)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
pub fn parse_date(s: &str) -> ForecastResult<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    // Timezone-suffixed timestamps: keep the calendar date
    if s.len() > 10 && s.is_char_boundary(10) {
        if let Ok(d) = NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d") {
            return Ok(d);
        }
    }
    Err(ForecastError::DateError(format!("Unrecognised date '{s}'")))
}

fn parse_price(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// Group observations per ticker: duplicates of (ticker, date) keep the first
/// row, non-positive prices are dropped, and each series is sorted by date.
pub fn clean_prices(rows: Vec<PriceObservation>) -> BTreeMap<String, PriceSeries> {
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
    let mut out: BTreeMap<String, PriceSeries> = BTreeMap::new();

    for row in rows {
        let Some(price) = row.price() else { continue };
        if price <= Decimal::ZERO {
            continue;
        }
        if !seen.insert((row.ticker.clone(), row.date)) {
            continue;
        }
        out.entry(row.ticker.clone())
            .or_insert_with(|| PriceSeries {
                ticker: row.ticker.clone(),
                points: Vec::new(),
            })
            .points
            .push((row.date, price));
    }

    for series in out.values_mut() {
        series.points.sort_by_key(|(d, _)| *d);
    }
    out
}

/// Calendar bucket a date falls into at a given frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    year: i32,
    index: u32,
}

impl PeriodKey {
    pub fn of(date: NaiveDate, frequency: ReturnFrequency) -> Self {
        match frequency {
            ReturnFrequency::Daily => PeriodKey {
                year: date.year(),
                index: date.ordinal(),
            },
            ReturnFrequency::Weekly => {
                let w = date.iso_week();
                PeriodKey {
                    year: w.year(),
                    index: w.week(),
                }
            }
            ReturnFrequency::Monthly => PeriodKey {
                year: date.year(),
                index: date.month(),
            },
            ReturnFrequency::Quarterly => PeriodKey {
                year: date.year(),
                index: (date.month() - 1) / 3 + 1,
            },
            ReturnFrequency::Annual => PeriodKey {
                year: date.year(),
                index: 1,
            },
        }
    }

    /// First calendar day of the bucket.
    pub fn start(&self, frequency: ReturnFrequency) -> Option<NaiveDate> {
        match frequency {
            ReturnFrequency::Daily => NaiveDate::from_yo_opt(self.year, self.index),
            ReturnFrequency::Weekly => {
                NaiveDate::from_isoywd_opt(self.year, self.index, Weekday::Mon)
            }
            ReturnFrequency::Monthly => NaiveDate::from_ymd_opt(self.year, self.index, 1),
            ReturnFrequency::Quarterly => {
                NaiveDate::from_ymd_opt(self.year, (self.index - 1) * 3 + 1, 1)
            }
            ReturnFrequency::Annual => NaiveDate::from_ymd_opt(self.year, 1, 1),
        }
    }

    /// The bucket immediately after this one.
    pub fn next(&self, frequency: ReturnFrequency) -> Option<Self> {
        let roll = |last: u32| {
            if self.index >= last {
                PeriodKey {
                    year: self.year + 1,
                    index: 1,
                }
            } else {
                PeriodKey {
                    year: self.year,
                    index: self.index + 1,
                }
            }
        };
        match frequency {
            ReturnFrequency::Daily => self
                .start(frequency)?
                .succ_opt()
                .map(|d| PeriodKey::of(d, frequency)),
            ReturnFrequency::Weekly => self
                .start(frequency)?
                .checked_add_days(Days::new(7))
                .map(|d| PeriodKey::of(d, frequency)),
            ReturnFrequency::Monthly => Some(roll(12)),
            ReturnFrequency::Quarterly => Some(roll(4)),
            ReturnFrequency::Annual => Some(roll(1)),
        }
    }
}

/// Last observed price in each period.
pub fn resample(series: &PriceSeries, frequency: ReturnFrequency) -> BTreeMap<PeriodKey, Decimal> {
    let mut out = BTreeMap::new();
    for (date, price) in &series.points {
        out.insert(PeriodKey::of(*date, frequency), *price);
    }
    out
}

/// Simple returns p_t / p_{t-1} − 1. Every price must be positive.
pub fn periodic_returns(prices: &[Decimal]) -> ForecastResult<Vec<Decimal>> {
    if let Some(i) = prices.iter().position(|p| *p <= Decimal::ZERO) {
        return Err(ForecastError::InvalidInput {
            field: "prices".into(),
            reason: format!("Price {} at position {} is not positive", prices[i], i),
        });
    }
    Ok(prices
        .windows(2)
        .map(|w| w[1] / w[0] - Decimal::ONE)
        .collect())
}

/// Longest stretch of consecutive periods; the latest one wins a tie.
fn longest_contiguous_run(keys: &[PeriodKey], frequency: ReturnFrequency) -> &[PeriodKey] {
    let mut best: Range<usize> = 0..0;
    let mut run_start = 0;
    for i in 1..=keys.len() {
        let broken = i == keys.len() || keys[i - 1].next(frequency) != Some(keys[i]);
        if broken {
            if i - run_start >= best.len() {
                best = run_start..i;
            }
            run_start = i;
        }
    }
    &keys[best]
}

/// Turn cleaned price series into return histories sharing one calendar
/// index.
///
/// Only periods present for every ticker are kept, and of those only the
/// longest run of consecutive periods, so that every return spans exactly
/// one period. Each history's `period_start` is the start of its first
/// return period.
pub fn align_histories(
    series: &BTreeMap<String, PriceSeries>,
    frequency: ReturnFrequency,
) -> ForecastResult<Vec<AssetHistory>> {
    if series.is_empty() {
        return Err(ForecastError::InsufficientData(
            "No price series supplied".into(),
        ));
    }

    let resampled: Vec<(&String, BTreeMap<PeriodKey, Decimal>)> = series
        .iter()
        .map(|(ticker, s)| (ticker, resample(s, frequency)))
        .collect();

    let mut common: BTreeSet<PeriodKey> = resampled[0].1.keys().copied().collect();
    for (_, periods) in &resampled[1..] {
        common.retain(|k| periods.contains_key(k));
    }
    let common: Vec<PeriodKey> = common.into_iter().collect();
    let keys = longest_contiguous_run(&common, frequency);
    if keys.len() < 2 {
        return Err(ForecastError::InvalidInput {
            field: "prices".into(),
            reason: format!(
                "Tickers share {} consecutive common period(s); at least 2 needed to form a return",
                keys.len()
            ),
        });
    }
    if keys.len() < common.len() {
        warn!(
            kept = keys.len(),
            dropped = common.len() - keys.len(),
            "common periods have gaps, keeping the longest consecutive run"
        );
    }

    let period_start = keys[1].start(frequency);
    debug!(
        tickers = resampled.len(),
        periods = keys.len(),
        ?period_start,
        "aligned price histories"
    );

    resampled
        .into_iter()
        .map(|(ticker, periods)| {
            let prices: Vec<Decimal> = keys.iter().filter_map(|k| periods.get(k).copied()).collect();
            Ok(AssetHistory {
                id: ticker.clone(),
                returns: periodic_returns(&prices)?,
                period_start,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn obs(ticker: &str, date: NaiveDate, price: Decimal) -> PriceObservation {
        PriceObservation {
            ticker: ticker.into(),
            date,
            close: Some(price),
            adj_close: None,
        }
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2020-03-31").unwrap(), d(2020, 3, 31));
        assert_eq!(parse_date("2020-03-31 00:00:00").unwrap(), d(2020, 3, 31));
        assert_eq!(parse_date("2020-03-31 00:00:00+00:00").unwrap(), d(2020, 3, 31));
        assert!(matches!(
            parse_date("31/03/2020"),
            Err(ForecastError::DateError(_))
        ));
    }

    #[test]
    fn test_parse_rows_drops_bad_rows() {
        let rows = vec![
            RawPriceRow {
                date: "2020-01-02".into(),
                ticker: "SPY".into(),
                close: Some("100.5".into()),
                adj_close: Some("98.25".into()),
            },
            RawPriceRow {
                date: "not a date".into(),
                ticker: "SPY".into(),
                close: Some("101".into()),
                adj_close: None,
            },
            RawPriceRow {
                date: "2020-01-03".into(),
                ticker: "SPY".into(),
                close: Some("".into()),
                adj_close: None,
            },
        ];
        let (parsed, dropped) = parse_rows(rows);
        assert_eq!(parsed.len(), 1);
        assert_eq!(dropped, 2);
        assert_eq!(parsed[0].price(), Some(dec!(98.25)));
    }

    #[test]
    fn test_adj_close_fallback() {
        let o = obs("SPY", d(2020, 1, 2), dec!(10));
        assert_eq!(o.price(), Some(dec!(10)));
    }

    #[test]
    fn test_clean_dedupes_and_sorts() {
        let rows = vec![
            obs("SPY", d(2020, 1, 3), dec!(11)),
            obs("SPY", d(2020, 1, 2), dec!(10)),
            obs("SPY", d(2020, 1, 3), dec!(99)),
            obs("SPY", d(2020, 1, 6), dec!(0)),
        ];
        let cleaned = clean_prices(rows);
        let spy = &cleaned["SPY"];
        assert_eq!(
            spy.points,
            vec![(d(2020, 1, 2), dec!(10)), (d(2020, 1, 3), dec!(11))]
        );
    }

    #[test]
    fn test_monthly_resample_keeps_last() {
        let series = PriceSeries {
            ticker: "SPY".into(),
            points: vec![
                (d(2020, 1, 2), dec!(10)),
                (d(2020, 1, 31), dec!(12)),
                (d(2020, 2, 28), dec!(15)),
            ],
        };
        let r = resample(&series, ReturnFrequency::Monthly);
        let prices: Vec<Decimal> = r.values().copied().collect();
        assert_eq!(prices, vec![dec!(12), dec!(15)]);
    }

    #[test]
    fn test_period_start() {
        let k = PeriodKey::of(d(2021, 8, 17), ReturnFrequency::Quarterly);
        assert_eq!(k.start(ReturnFrequency::Quarterly), Some(d(2021, 7, 1)));
        let k = PeriodKey::of(d(2021, 8, 19), ReturnFrequency::Weekly);
        assert_eq!(k.start(ReturnFrequency::Weekly), Some(d(2021, 8, 16)));
    }

    #[test]
    fn test_periodic_returns() {
        let r = periodic_returns(&[dec!(100), dec!(110), dec!(99)]).unwrap();
        assert_eq!(r, vec![dec!(0.1), dec!(-0.1)]);
    }

    #[test]
    fn test_periodic_returns_reject_non_positive_price() {
        assert!(matches!(
            periodic_returns(&[dec!(100), dec!(0), dec!(99)]),
            Err(ForecastError::InvalidInput { .. })
        ));
        assert!(periodic_returns(&[dec!(100), dec!(-5)]).is_err());
    }

    #[test]
    fn test_next_period_rolls_over_year_end() {
        let dec_2020 = PeriodKey::of(d(2020, 12, 15), ReturnFrequency::Monthly);
        assert_eq!(
            dec_2020.next(ReturnFrequency::Monthly),
            Some(PeriodKey::of(d(2021, 1, 4), ReturnFrequency::Monthly))
        );
        let q4 = PeriodKey::of(d(2020, 11, 2), ReturnFrequency::Quarterly);
        assert_eq!(
            q4.next(ReturnFrequency::Quarterly),
            Some(PeriodKey::of(d(2021, 2, 1), ReturnFrequency::Quarterly))
        );
        // ISO week 53 of 2020 is followed by week 1 of 2021
        let w53 = PeriodKey::of(d(2020, 12, 31), ReturnFrequency::Weekly);
        assert_eq!(
            w53.next(ReturnFrequency::Weekly),
            Some(PeriodKey::of(d(2021, 1, 6), ReturnFrequency::Weekly))
        );
        let last_day = PeriodKey::of(d(2020, 12, 31), ReturnFrequency::Daily);
        assert_eq!(
            last_day.next(ReturnFrequency::Daily),
            Some(PeriodKey::of(d(2021, 1, 1), ReturnFrequency::Daily))
        );
    }

    #[test]
    fn test_align_intersects_periods() {
        let rows = vec![
            obs("SPY", d(2020, 1, 31), dec!(100)),
            obs("SPY", d(2020, 2, 28), dec!(110)),
            obs("SPY", d(2020, 3, 31), dec!(121)),
            obs("SPY", d(2020, 4, 30), dec!(133.1)),
            obs("TSLA", d(2020, 2, 28), dec!(50)),
            obs("TSLA", d(2020, 3, 31), dec!(40)),
            obs("TSLA", d(2020, 4, 30), dec!(60)),
        ];
        let histories = align_histories(&clean_prices(rows), ReturnFrequency::Monthly).unwrap();
        assert_eq!(histories.len(), 2);
        let spy = histories.iter().find(|h| h.id == "SPY").unwrap();
        let tsla = histories.iter().find(|h| h.id == "TSLA").unwrap();
        assert_eq!(spy.returns, vec![dec!(0.1), dec!(0.1)]);
        assert_eq!(tsla.returns, vec![dec!(-0.2), dec!(0.5)]);
        assert_eq!(spy.period_start, Some(d(2020, 3, 1)));
        assert_eq!(spy.period_start, tsla.period_start);
    }

    #[test]
    fn test_align_keeps_longest_consecutive_run() {
        // TSLA skips February, so January is cut off from the March-May run
        let rows = vec![
            obs("SPY", d(2020, 1, 31), dec!(100)),
            obs("SPY", d(2020, 2, 28), dec!(110)),
            obs("SPY", d(2020, 3, 31), dec!(121)),
            obs("SPY", d(2020, 4, 30), dec!(133.1)),
            obs("SPY", d(2020, 5, 29), dec!(146.41)),
            obs("TSLA", d(2020, 1, 31), dec!(50)),
            obs("TSLA", d(2020, 3, 31), dec!(40)),
            obs("TSLA", d(2020, 4, 30), dec!(60)),
            obs("TSLA", d(2020, 5, 29), dec!(30)),
        ];
        let histories = align_histories(&clean_prices(rows), ReturnFrequency::Monthly).unwrap();
        let spy = histories.iter().find(|h| h.id == "SPY").unwrap();
        let tsla = histories.iter().find(|h| h.id == "TSLA").unwrap();
        assert_eq!(spy.returns, vec![dec!(0.1), dec!(0.1)]);
        assert_eq!(tsla.returns, vec![dec!(0.5), dec!(-0.5)]);
        assert_eq!(spy.period_start, Some(d(2020, 4, 1)));
    }

    #[test]
    fn test_align_never_spans_a_gap() {
        let rows = vec![
            obs("A", d(2020, 1, 31), dec!(100)),
            obs("A", d(2020, 2, 28), dec!(110)),
            obs("A", d(2020, 3, 31), dec!(121)),
            obs("A", d(2020, 4, 30), dec!(133.1)),
            obs("B", d(2020, 1, 31), dec!(10)),
            obs("B", d(2020, 2, 28), dec!(11)),
            obs("B", d(2020, 4, 30), dec!(12)),
        ];
        let histories = align_histories(&clean_prices(rows), ReturnFrequency::Monthly).unwrap();
        let a = histories.iter().find(|h| h.id == "A").unwrap();
        // Feb -> Apr would be a two-month move counted as one period
        assert_eq!(a.returns, vec![dec!(0.1)]);
        assert_eq!(a.period_start, Some(d(2020, 2, 1)));
    }

    #[test]
    fn test_align_with_only_isolated_common_periods_fails() {
        let rows = vec![
            obs("A", d(2020, 1, 31), dec!(100)),
            obs("A", d(2020, 3, 31), dec!(110)),
            obs("B", d(2020, 1, 31), dec!(10)),
            obs("B", d(2020, 3, 31), dec!(11)),
        ];
        assert!(matches!(
            align_histories(&clean_prices(rows), ReturnFrequency::Monthly),
            Err(ForecastError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_align_without_overlap_fails() {
        let rows = vec![
            obs("SPY", d(2020, 1, 31), dec!(100)),
            obs("SPY", d(2020, 2, 28), dec!(110)),
            obs("TSLA", d(2021, 1, 29), dec!(50)),
            obs("TSLA", d(2021, 2, 26), dec!(40)),
        ];
        assert!(align_histories(&clean_prices(rows), ReturnFrequency::Monthly).is_err());
    }
}
