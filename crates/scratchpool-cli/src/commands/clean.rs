use super::build_manager;
use anyhow::Result;
use scratchpool_core::config::Config;
use scratchpool_core::units::format_bytes;
use scratchpool_workspace::CleanupReport;
use std::time::Duration;
use tracing::warn;

pub fn run(config: &Config, older_than_hours: Option<u64>) -> Result<()> {
    let max_age = match older_than_hours {
        Some(hours) => Duration::from_secs(hours.saturating_mul(3600)),
        None => match config.cleanup.max_age() {
            Some(age) => age,
            None => {
                println!("Cleanup disabled (cleanup.max_age_hours = 0)");
                return Ok(());
            }
        },
    };

    let manager = build_manager(config)?;
    let report = manager.clean_stale_files(max_age, &config.cleanup.prefixes);

    warn_on_failures(&report);
    println!(
        "Removed {} of {} candidate file(s), freed {}",
        report.removed,
        report.scanned,
        format_bytes(report.removed_bytes)
    );
    Ok(())
}

fn warn_on_failures(report: &CleanupReport) {
    if report.failed > 0 {
        warn!(
            failed = report.failed,
            "{} file(s) could not be removed; see earlier warnings", report.failed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged(report: &CleanupReport) -> String {
        let buffer = Buffer::default();
        let sink = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || warn_on_failures(report));
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn failed_removals_are_logged_as_warning() {
        let report = CleanupReport {
            scanned: 3,
            removed: 1,
            removed_bytes: 10,
            failed: 2,
        };
        let logs = logged(&report);
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("2 file(s) could not be removed"), "{logs}");
    }

    #[test]
    fn clean_sweep_logs_nothing() {
        let report = CleanupReport {
            scanned: 1,
            removed: 1,
            removed_bytes: 10,
            failed: 0,
        };
        assert!(logged(&report).is_empty());
    }
}
