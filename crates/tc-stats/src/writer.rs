//! The `StatsWriter` trait implemented by statistics exporters.

use crate::{OutputResult, SimStat};

/// Sink for [`SimStat`] snapshots.
pub trait StatsWriter {
    /// Write the road and trip rows of one snapshot.
    fn write_stat(&mut self, stat: &SimStat) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
