//! HTTP API handlers for cca-re

pub mod health;
pub mod insights;
pub mod jobs;
pub mod reports;
pub mod results;
pub mod sse;

pub use health::{get_build_info, health_routes};
pub use insights::{enqueue_insights, get_insights};
pub use jobs::{get_job, list_jobs};
pub use reports::{enqueue_report, get_report};
pub use results::{delete_result, get_completion, get_result, list_results, submit_result};
pub use sse::event_stream;
