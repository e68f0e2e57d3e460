//! Progress and feedback events.
//!
//! The sequencer reports progress through an [`EventSink`]. Event types:
//!
//! | event                | data                                                          |
//! |----------------------|---------------------------------------------------------------|
//! | `pipeline.started`   | `run_id`, `pipeline`, `stages`, `working_dir`                 |
//! | `stage.started`      | `stage`, `index`, `total`, `percent`, `command`, `inputs`     |
//! | `stage.output`       | `stream`, `line`                                              |
//! | `stage.warning`      | `stage`, `warning`                                            |
//! | `stage.completed`    | `stage`, `index`, `total`, `percent`, `duration_ms`, `warnings` |
//! | `stage.failed`       | `stage_number`, `stage`, `command_line`, `exit_code`, output  |
//! | `pipeline.completed` | `run_id`, `stages`, `duration_ms`                             |
//! | `pipeline.failed`    | `run_id`, `error`                                             |
//! | `pipeline.cancelled` | `run_id`, `reason`, `completed_stages`                        |

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Percentage of the pipeline finished once `completed` of `total` stages are done.
#[must_use]
pub fn percent_complete(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = completed as f64 / total as f64;
    (ratio * 100.0).clamp(0.0, 100.0)
}
