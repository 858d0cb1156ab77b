//! Shared HTTP constants (headers, problem kinds, stream tuning).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_LAST_EVENT_ID: &str = "last-event-id";
pub(crate) const SSE_KEEP_ALIVE_SECS: u64 = 20;

pub(crate) const EVENT_PROGRESS: &str = "progress";
pub(crate) const EVENT_DONE: &str = "done";

pub(crate) const PROBLEM_INTERNAL: &str = "https://reelay.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://reelay.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://reelay.dev/problems/not-found";
pub(crate) const PROBLEM_NOT_READY: &str = "https://reelay.dev/problems/not-ready";
pub(crate) const PROBLEM_UPSTREAM: &str = "https://reelay.dev/problems/upstream-tool";
