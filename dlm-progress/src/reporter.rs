use std::io::{self, Write};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::counter::CounterHandle;

/// Default interval between two progress ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shortest interval the tick loop accepts; shorter ones are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Format one progress line.
///
/// With a known `total` the line reads `\r{pct:>3}% {n:>width}/{total} bytes`,
/// where `pct` is `floor(100 * n / total)`. With `total == 0` it is just
/// `\r{n} bytes`. The leading carriage return makes successive lines overwrite
/// each other on a terminal.
///
/// The percentage is not clamped: a server that under-declares its length
/// shows up as a value above 100.
///
/// ```
/// use dlm_progress::render_line;
///
/// assert_eq!(render_line(849, 1000, 4), "\r 84%  849/1000 bytes");
/// assert_eq!(render_line(4096, 0, 1), "\r4096 bytes");
/// ```
pub fn render_line(n: u64, total: u64, width: usize) -> String {
    if total == 0 {
        return format!("\r{n} bytes");
    }
    let pct = u128::from(n) * 100 / u128::from(total);
    format!("\r{pct:>3}% {n:>width$}/{total} bytes")
}

/// Write the current progress line to `output`.
pub fn report<O: Write>(counter: &CounterHandle, output: &mut O) -> io::Result<()> {
    output.write_all(counter.snapshot().line().as_bytes())?;
    output.flush()
}

/// Write the final progress line followed by a newline.
pub fn report_final<O: Write>(counter: &CounterHandle, output: &mut O) -> io::Result<()> {
    output.write_all(counter.snapshot().line().as_bytes())?;
    output.write_all(b"\n")?;
    output.flush()
}

/// Tick loop: every `interval`, render the counter into `output`.
///
/// Only `cancel` ends the loop. The output sink is handed back so the caller
/// can write after the loop is gone. An `interval` below [`MIN_POLL_INTERVAL`]
/// is raised to it.
pub async fn run_periodic<O: Write>(
    counter: CounterHandle,
    mut output: O,
    interval: Duration,
    cancel: CancellationToken,
) -> O {
    let interval = interval.max(MIN_POLL_INTERVAL);
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(err) = report(&counter, &mut output) {
                    tracing::debug!("progress output failed: {err}");
                }
            }
        }
    }

    output
}

/// A periodic reporter running in its own tokio task.
///
/// Dropping it without calling [`finish`](Self::finish) cancels the task.
#[derive(Debug)]
pub struct ProgressReporter<O> {
    counter: CounterHandle,
    task: JoinHandle<O>,
    stop: DropGuard,
}

impl<O> ProgressReporter<O>
where
    O: Write + Send + 'static,
{
    /// Start reporting `counter` into `output` every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(counter: CounterHandle, output: O, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_periodic(
            counter.clone(),
            output,
            interval,
            cancel.clone(),
        ));

        Self {
            counter,
            task,
            stop: cancel.drop_guard(),
        }
    }

    /// Stop the periodic task, then emit the final report exactly once.
    ///
    /// The final line is written only after the task has returned the output
    /// sink, so it can never interleave with a tick. If the task died the sink
    /// died with it: the failure is logged, no final line is written and
    /// `None` comes back.
    pub async fn finish(self) -> Option<O> {
        let Self {
            counter,
            task,
            stop,
        } = self;

        drop(stop);
        let mut output = match task.await {
            Ok(output) => output,
            Err(err) => {
                let snapshot = counter.snapshot();
                tracing::warn!(
                    bytes_written = snapshot.bytes_written,
                    total_expected = snapshot.total_expected,
                    "progress reporter stopped abnormally: {err}"
                );
                return None;
            }
        };

        if let Err(err) = report_final(&counter, &mut output) {
            tracing::debug!("final progress output failed: {err}");
        }
        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::ByteCounter;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_render_truncates_percentage() {
        assert_eq!(render_line(849, 1000, 4), "\r 84%  849/1000 bytes");
        assert_eq!(render_line(999, 1000, 4), "\r 99%  999/1000 bytes");
        assert_eq!(render_line(1, 3, 1), "\r 33% 1/3 bytes");
        assert_eq!(render_line(2, 3, 1), "\r 66% 2/3 bytes");
    }

    #[test]
    fn test_render_pads_count_to_total_width() {
        assert_eq!(render_line(0, 1000, 4), "\r  0%    0/1000 bytes");
        assert_eq!(render_line(850, 1000, 4), "\r 85%  850/1000 bytes");
        assert_eq!(render_line(1000, 1000, 4), "\r100% 1000/1000 bytes");

        for n in [0u64, 7, 42, 512, 12_345] {
            let line = render_line(n, 12_345, 5);
            let field = &line[6..11];
            assert_eq!(field.trim_start(), n.to_string(), "{line:?}");
        }
    }

    #[test]
    fn test_render_unknown_total() {
        assert_eq!(render_line(0, 0, 1), "\r0 bytes");
        assert_eq!(render_line(4096, 0, 1), "\r4096 bytes");
    }

    #[test]
    fn test_render_does_not_clamp_over_delivery() {
        assert_eq!(render_line(150, 100, 3), "\r150% 150/100 bytes");
    }

    #[test]
    fn test_render_large_values_do_not_overflow() {
        let line = render_line(u64::MAX, u64::MAX, 20);
        assert!(line.starts_with("\r100% "));
    }

    #[tokio::test]
    async fn test_report_final_appends_single_newline() {
        let mut counter = ByteCounter::new(Vec::<u8>::new(), 1000);
        for _ in 0..85 {
            counter.write_all(&[0u8; 10]).await.unwrap();
        }

        let mut output = Vec::<u8>::new();
        report_final(&counter.handle(), &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "\r 85%  850/1000 bytes\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_ticks_then_final_report() {
        let mut counter = ByteCounter::new(Vec::<u8>::new(), 0);
        counter.write_all(&[0u8; 4096]).await.unwrap();

        let reporter =
            ProgressReporter::spawn(counter.handle(), Vec::<u8>::new(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(35)).await;
        let output = String::from_utf8(reporter.finish().await.unwrap()).unwrap();

        let lines: Vec<&str> = output.split('\r').filter(|s| !s.is_empty()).collect();
        assert!(lines.len() >= 2, "expected ticks before the final line: {output:?}");
        assert_eq!(lines.last(), Some(&"4096 bytes\n"));
        assert_eq!(output.matches('\n').count(), 1);
    }

    #[tokio::test]
    async fn test_finish_before_first_tick_emits_only_final_line() {
        let counter = ByteCounter::new(Vec::<u8>::new(), 10);
        let reporter =
            ProgressReporter::spawn(counter.handle(), Vec::<u8>::new(), Duration::from_secs(3600));

        let output = reporter.finish().await.unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "\r  0%  0/10 bytes\n");
    }

    #[tokio::test]
    async fn test_cancelled_loop_hands_back_output() {
        let counter = ByteCounter::new(Vec::<u8>::new(), 0);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_periodic(
            counter.handle(),
            Vec::<u8>::new(),
            Duration::from_millis(1),
            cancel.clone(),
        ));

        let guard = cancel.drop_guard();
        drop(guard);

        let output = task.await.unwrap();
        assert!(output.iter().all(|&b| b != b'\n'));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let mut counter = ByteCounter::new(Vec::<u8>::new(), 8);
        counter.write_all(&[0u8; 8]).await.unwrap();

        let reporter = ProgressReporter::spawn(counter.handle(), Vec::<u8>::new(), Duration::ZERO);
        tokio::time::sleep(MIN_POLL_INTERVAL * 3).await;
        let output = String::from_utf8(reporter.finish().await.unwrap()).unwrap();

        assert!(output.starts_with("\r100% 8/8 bytes\r"), "{output:?}");
        assert!(output.ends_with("\r100% 8/8 bytes\n"));
    }

    /// Terminal that goes away mid-transfer
    struct PanickingOutput;

    impl Write for PanickingOutput {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            panic!("terminal vanished");
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_reporter_task_yields_no_output() {
        let counter = ByteCounter::new(Vec::<u8>::new(), 0);
        let reporter =
            ProgressReporter::spawn(counter.handle(), PanickingOutput, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(25)).await;

        assert!(reporter.finish().await.is_none());
    }
}
