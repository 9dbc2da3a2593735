// Single integration test binary.
// Tasks run against stub executors and drivers; the credentials service and
// the browser driver sidecar are played by raw TCP mock servers.

#[macro_use]
mod common;

mod test_cancel;
mod test_end_to_end;
mod test_sessions;
mod test_sweep;
mod test_tasks_http;
mod test_uploads;
