use anyhow::{Context, Result};
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{run_municipal_job, run_regional_job};
use crate::app::AppState;

/// First occurrence of `at` strictly after `now`
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Run `job`, retrying `retries` more times with a fixed `delay` between attempts
pub async fn with_retry<T, F, Fut>(name: &str, retries: u32, delay: Duration, mut job: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match job().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt > retries => {
                return Err(e).with_context(|| format!("{name} failed after {attempt} attempts"));
            }
            Err(e) => {
                warn!(job = name, attempt, error = %e, "ingestion attempt failed, retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

pub fn spawn_ingestion_tasks(state: AppState) -> Result<()> {
    let cfg = state.cfg.ingestion.clone();
    if !cfg.enabled {
        info!("ingestion disabled");
        return Ok(());
    }
    let daily_at = cfg.daily_time()?;
    let delay = Duration::from_secs(cfg.retry_delay_seconds);

    if cfg.municipal_on_startup {
        let st = state.clone();
        let cfg = cfg.clone();
        tokio::spawn(async move {
            let current_year = Local::now().year();
            let (st, cfg) = (&st, &cfg);
            let result = with_retry("municipal ingestion", cfg.retries, delay, move || {
                run_municipal_job(
                    st.store.as_ref(),
                    &st.open_data,
                    &cfg.history_years,
                    &st.cfg.forecast,
                    current_year,
                )
            })
            .await;
            if let Err(e) = result {
                let msg = format!("{e:#}");
                error!(error = %msg, "municipal ingestion stopped");
            }
        });
    }

    tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, daily_at);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, "regional ingestion scheduled");
            tokio::time::sleep(wait).await;

            let run_date = Local::now().date_naive();
            let st = &state;
            let result = with_retry("regional ingestion", cfg.retries, delay, move || {
                run_regional_job(st.store.as_ref(), &st.open_data, run_date)
            })
            .await;
            if let Err(e) = result {
                let msg = format!("{e:#}");
                error!(error = %msg, %run_date, "regional ingestion failed");
            }
        }
    });

    Ok(())
}
