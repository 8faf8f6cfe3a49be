use async_trait::async_trait;
use chrono::Weekday;

/// When a sweep fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Fixed interval from the previous firing; not clock-aligned.
    Every { secs: u64 },
    /// A weekly UK wall-clock slot (e.g. Sunday 12:00).
    WeeklyUk { weekday: Weekday, hour: u32, minute: u32 },
}

/// Sweep failures are logged by the engine and the cadence continues; a
/// failing sweep never stops the loop.
pub type SweepError = Box<dyn std::error::Error + Send + Sync>;

/// One periodic job. Implementations live beside the state they sweep.
#[async_trait]
pub trait Sweep: Send + Sync {
    fn name(&self) -> &'static str;

    fn cadence(&self) -> Cadence;

    async fn run(&self) -> Result<(), SweepError>;
}
