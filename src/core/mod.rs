//! Transform primitives shared by all dashboards

pub mod buckets;
pub mod dates;
pub mod locator;
pub mod merge;
pub mod normalize;
pub mod transplant;

pub use buckets::{count_buckets, period_block, AgedIncident, BucketCounts, MetricRecord};
pub use locator::{find_header_row, locate_headers, HeaderMap, HeaderRow, ScanWindow};
pub use merge::{append_block, outer_join, sort_by_period_and_order, SortSpec};
pub use normalize::{clean_label, OeMatcher};
pub use transplant::{last_filled_row, transplant_rows, TransplantPlan, TransplantReport};
