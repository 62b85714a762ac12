#![allow(dead_code, unused_imports)]

pub use tdag_test_utils::builders;
pub use tdag_test_utils::recorder::{Event, ExecutionLog, RecordingReporter};
pub use tdag_test_utils::{init_tracing, recording_dag, recording_node, with_timeout};
