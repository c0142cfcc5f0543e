pub mod prices;

pub use prices::{
    align_histories, clean_prices, parse_date, parse_rows, periodic_returns, resample,
    PeriodKey, PriceObservation, PriceSeries, RawPriceRow,
};
