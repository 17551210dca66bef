use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// `pop_min` on a queue with no entries.
    #[error("event queue is empty")]
    EmptyQueue,
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
