//! Result service tables: test results, jobs and stored insights

pub mod insights;
pub mod jobs;
pub mod results;
pub mod users;
