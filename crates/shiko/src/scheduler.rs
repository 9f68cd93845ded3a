//! Daily tick source
//!
//! Emits an [`UpdateEvent`] for each new local day, at midnight.

use chrono::{DateTime, Duration as DateDuration, Local, NaiveDate, TimeZone};
use shiko_core::{ShutdownListener, UpdateEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the tick channel
pub const TICK_CHANNEL_CAPACITY: usize = 1;

/// First instant of `date` in `tz`
///
/// When local midnight does not exist (a DST gap), the day starts one hour
/// later.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + DateDuration::hours(1))).earliest())
}

/// Next instant the scheduler fires
///
/// That is the start of the day after `now`, or of the day after `last`
/// when that day was already emitted.
pub fn next_fire<Tz: TimeZone>(
    now: &DateTime<Tz>,
    last: Option<NaiveDate>,
) -> Option<DateTime<Tz>> {
    let mut date = now.date_naive().succ_opt()?;
    if let Some(last) = last {
        if date <= last {
            date = last.succ_opt()?;
        }
    }
    start_of_day(&now.timezone(), date)
}

/// Midnight scheduler on the local time zone
#[derive(Debug, Default)]
pub struct DailyScheduler {
    last: Option<NaiveDate>,
}

impl DailyScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run on a background task
    pub fn spawn(self, shutdown: ShutdownListener) -> (mpsc::Receiver<UpdateEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);
        let handle = tokio::spawn(self.run(tx, shutdown));
        (rx, handle)
    }

    /// Emit ticks until cancelled or until the receiver goes away
    pub async fn run(mut self, tx: mpsc::Sender<UpdateEvent>, mut shutdown: ShutdownListener) {
        loop {
            let now = Local::now();
            let Some(at) = next_fire(&now, self.last) else {
                tracing::error!(now = %now, "no next midnight, scheduler stopping");
                break;
            };
            let delay = (at - now).to_std().unwrap_or_default();
            tracing::debug!(at = %at, "next day rollover scheduled");

            tokio::select! {
                biased;
                () = shutdown.wait() => break,
                () = tokio::time::sleep(delay) => {}
            }

            let event = UpdateEvent {
                date: at.date_naive(),
            };
            tokio::select! {
                biased;
                () = shutdown.wait() => break,
                sent = tx.send(event) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
            tracing::info!(date = %event.date, "day rollover emitted");
            self.last = Some(event.date);
        }
        tracing::debug!("scheduler stopped");
    }
}
