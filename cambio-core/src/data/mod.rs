//! Rate acquisition and normalization

pub mod frankfurter;
pub mod http;
pub mod normalize;
pub mod provider;
pub mod xrates;

pub use frankfurter::{FrankfurterSource, FRANKFURTER_URL};
pub use http::{create_client, HttpClient, RetryPolicy, DEFAULT_USER_AGENT};
pub use normalize::{coerce_locale_number, normalize, normalize_all, NormalizedFields, RecordLike};
pub use provider::{FetchError, FormatError, RateSource, SourceError};
pub use xrates::{parse_rates_table, XRatesSource, BROWSER_USER_AGENT, XRATES_URL};
