//! Domain types for cambio

pub mod rate;

pub use rate::{
    format_timestamp, utc_now, RateRecord, RecordError, SOURCE_API_FRANKFURTER,
    SOURCE_XRATES_SITE,
};
