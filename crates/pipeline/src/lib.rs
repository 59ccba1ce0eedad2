//! Deal pipeline engine: stage transitions, won-deal conversion, aggregate
//! metrics and invoice arithmetic. Everything here is pure; persistence and
//! side effects belong to the caller.

pub mod conversion;
pub mod dashboard;
pub mod invoice;
pub mod metrics;
pub mod stage;
pub mod validation;

pub use conversion::on_deal_won;
pub use dashboard::{summarize, DashboardSummary};
pub use invoice::{normalize_line_items, recompute_totals, InvoiceTotals, TAX_RATE};
pub use metrics::{compute_metrics, PipelineMetrics};
pub use stage::{apply_stage_change, transition, StageChange};
pub use validation::{parse_amount, validate_deal, validate_deal_draft, validate_line_items};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
