//! Cronjob schedule adherence.
//!
//! A cronjob is considered stuck when its schedule would have fired more
//! than [`MISSED_RUN_LIMIT`] times since the last successful run. Kubernetes
//! itself stops scheduling a cronjob after that many missed starts.

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use k8s_openapi::api::batch::v1::CronJob;
use kube::ResourceExt;

use super::{text, Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

pub const MISSED_RUN_LIMIT: usize = 100;

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Judges cronjobs relative to a fixed instant so results are reproducible.
#[derive(Debug, Clone, Copy)]
pub struct CronJobHealth {
    now: DateTime<Utc>,
}

impl CronJobHealth {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

fn suspended(item: &CronJob) -> bool {
    item.spec.as_ref().and_then(|s| s.suspend).unwrap_or(false)
}

fn last_success(item: &CronJob) -> Option<DateTime<Utc>> {
    item.status
        .as_ref()
        .and_then(|s| s.last_successful_time.as_ref())
        .map(|t| t.0)
}

fn last_schedule(item: &CronJob) -> Option<DateTime<Utc>> {
    item.status
        .as_ref()
        .and_then(|s| s.last_schedule_time.as_ref())
        .map(|t| t.0)
}

/// Rewrite a Kubernetes cron expression into the dialect of the `cron` crate.
///
/// Kubernetes uses five fields without seconds, optionally prefixed with a
/// `TZ=` or `CRON_TZ=` zone, and numbers weekdays from 0 (Sunday, also 7).
/// The `cron` crate wants a leading seconds field and numbers weekdays from
/// 1, so weekdays are spelled out by name. The zone is dropped; projections
/// are always computed in UTC.
///
/// When both day-of-month and day-of-week are restricted, Kubernetes fires
/// on either match while the `cron` crate requires both. Such a schedule is
/// split into one expression per day field; the job fires when any of the
/// returned expressions does. `None` means the weekday field is malformed.
fn translate_schedule(schedule: &str) -> Option<Vec<String>> {
    let mut fields: Vec<&str> = schedule.split_whitespace().collect();
    if fields
        .first()
        .is_some_and(|f| f.starts_with("TZ=") || f.starts_with("CRON_TZ="))
    {
        fields.remove(0);
    }

    match fields.as_slice() {
        [macro_] if macro_.starts_with('@') => Some(vec![macro_alias(macro_).to_string()]),
        [minute, hour, day, month, weekday] => {
            let names = weekday_names(weekday)?;
            let head = format!("0 {minute} {hour}");
            if is_wildcard(day) || is_wildcard(weekday) {
                Some(vec![format!("{head} {day} {month} {names}")])
            } else {
                Some(vec![
                    format!("{head} {day} {month} *"),
                    format!("{head} * {month} {names}"),
                ])
            }
        }
        _ => Some(vec![fields.join(" ")]),
    }
}

/// Macros Kubernetes accepts under a name the `cron` crate does not know.
fn macro_alias(macro_: &str) -> &str {
    match macro_ {
        "@midnight" => "@daily",
        "@annually" => "@yearly",
        other => other,
    }
}

fn is_wildcard(field: &str) -> bool {
    field == "*" || field == "?"
}

fn weekday(token: &str) -> Option<usize> {
    token
        .parse::<usize>()
        .ok()
        .filter(|day| *day <= 7)
        .or_else(|| WEEKDAYS.iter().position(|name| name.eq_ignore_ascii_case(token)))
}

/// Expand a weekday field into a comma-separated list of day names.
fn weekday_names(field: &str) -> Option<String> {
    if is_wildcard(field) {
        return Some(field.to_string());
    }

    let mut days = BTreeSet::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, step.parse::<usize>().ok().filter(|s| *s > 0)?),
            None => (part, 1),
        };
        let (first, last) = match range.split_once('-') {
            Some((first, last)) => (weekday(first)?, weekday(last)?),
            None if is_wildcard(range) => (0, 6),
            // `n/step` runs from n to the end of the week.
            None if part.contains('/') => (weekday(range)?, 6),
            None => {
                let day = weekday(range)?;
                (day, day)
            }
        };
        if first > last {
            return None;
        }
        days.extend((first..=last).step_by(step).map(|day| day % 7));
    }

    Some(
        days.into_iter()
            .map(|day| WEEKDAYS[day])
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// The run that would come [`MISSED_RUN_LIMIT`] occurrences after `since`.
fn last_tolerated_run(schedule: &str, since: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let schedules = translate_schedule(schedule)?
        .iter()
        .map(|expression| Schedule::from_str(expression).ok())
        .collect::<Option<Vec<_>>>()?;

    // The first MISSED_RUN_LIMIT runs of the union are among the first
    // MISSED_RUN_LIMIT runs of each expression.
    let runs: BTreeSet<DateTime<Utc>> = schedules
        .iter()
        .flat_map(|schedule| schedule.after(&since).take(MISSED_RUN_LIMIT))
        .collect();
    runs.into_iter().take(MISSED_RUN_LIMIT).last()
}

#[async_trait]
impl HealthCheck for CronJobHealth {
    type Item = CronJob;

    fn name(&self) -> &'static str {
        "cronjobs"
    }

    fn noun(&self) -> &'static str {
        "cronjobs"
    }

    fn header(&self) -> &'static [&'static str] {
        &["Cronjob", "Namespace", "Status", "Last Success"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<CronJob>> {
        cluster.cron_jobs().await
    }

    fn namespace<'a>(&self, item: &'a CronJob) -> Option<&'a str> {
        item.metadata.namespace.as_deref()
    }

    fn assess(&self, item: &CronJob) -> Assessment {
        if suspended(item) {
            return Assessment::Healthy;
        }

        let Some(success) = last_success(item) else {
            return if last_schedule(item).is_some() {
                Assessment::Failing(FailureClass::CronJobNeverSucceeded)
            } else {
                Assessment::Healthy
            };
        };

        let schedule = item.spec.as_ref().map_or("", |s| s.schedule.as_str());
        match last_tolerated_run(schedule, success) {
            None => Assessment::Failing(FailureClass::CronJobInvalidSchedule),
            Some(run) if run < self.now => Assessment::Failing(FailureClass::CronJobMissedSchedules),
            Some(_) => Assessment::Healthy,
        }
    }

    fn row(&self, item: &CronJob, failure: FailureClass) -> Vec<String> {
        vec![
            item.name_any(),
            text(self.namespace(item)),
            failure.to_string(),
            last_success(item)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use k8s_openapi::api::batch::v1::{CronJobSpec, CronJobStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube::api::ObjectMeta;

    use super::*;
    use crate::health::{evaluate, NamespaceFilter};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn cronjob(
        namespace: &str,
        schedule: &str,
        suspend: bool,
        scheduled: Option<DateTime<Utc>>,
        succeeded: Option<DateTime<Utc>>,
    ) -> CronJob {
        CronJob {
            metadata: ObjectMeta {
                name: Some("nightly".to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec: Some(CronJobSpec {
                schedule: schedule.to_string(),
                suspend: Some(suspend),
                ..Default::default()
            }),
            status: Some(CronJobStatus {
                last_schedule_time: scheduled.map(Time),
                last_successful_time: succeeded.map(Time),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_hourly_cronjob_stale_for_a_month() {
        let health = CronJobHealth::new(now());
        let success = now() - Duration::hours(720);
        let items = vec![cronjob("test", "@hourly", false, Some(success), Some(success))];
        let report = evaluate(&health, &NamespaceFilter::default(), &items);

        assert_eq!(report.exit_code(), 53);
        assert_eq!(
            report.rows[0],
            vec!["nightly", "test", "Too many missed start times (> 100)", "2024-05-02 12:00:00 UTC"]
        );
    }

    #[test]
    fn test_recent_success_is_healthy() {
        let health = CronJobHealth::new(now());
        let success = now() - Duration::hours(10);
        let item = cronjob("test", "@hourly", false, Some(success), Some(success));
        assert_eq!(health.assess(&item), Assessment::Healthy);
    }

    #[test]
    fn test_scheduled_but_never_succeeded() {
        let health = CronJobHealth::new(now());
        let item = cronjob("test", "*/5 * * * *", false, Some(now()), None);
        assert_eq!(health.assess(&item), Assessment::Failing(FailureClass::CronJobNeverSucceeded));
    }

    #[test]
    fn test_never_scheduled_is_healthy() {
        let health = CronJobHealth::new(now());
        let item = cronjob("test", "*/5 * * * *", false, None, None);
        assert_eq!(health.assess(&item), Assessment::Healthy);
    }

    #[test]
    fn test_suspended_is_healthy() {
        let health = CronJobHealth::new(now());
        let item = cronjob("test", "not a schedule", true, Some(now()), None);
        assert_eq!(health.assess(&item), Assessment::Healthy);
    }

    #[test]
    fn test_invalid_schedule() {
        let health = CronJobHealth::new(now());
        let item = cronjob("test", "every tuesday", false, Some(now()), Some(now()));
        let report = evaluate(&health, &NamespaceFilter::default(), &[item]);

        assert_eq!(report.failure, Some(FailureClass::CronJobInvalidSchedule));
        assert_eq!(report.exit_code(), 53);
        assert_eq!(report.rows[0][2], "Invalid schedule");
    }

    #[test]
    fn test_never_succeeded_takes_precedence() {
        let health = CronJobHealth::new(now());
        let stale = now() - Duration::hours(720);
        let items = vec![
            cronjob("test", "@hourly", false, Some(stale), Some(stale)),
            cronjob("test", "@hourly", false, Some(now()), None),
        ];
        let report = evaluate(&health, &NamespaceFilter::default(), &items);

        assert_eq!(report.summary, "0 of 2 cronjobs are healthy (0 ignored).");
        assert_eq!(report.exit_code(), 52);
    }

    #[test]
    fn test_ci_cronjob_is_ignored() {
        let health = CronJobHealth::new(now());
        let items = vec![cronjob("ci-test", "@hourly", false, Some(now()), None)];
        let report = evaluate(&health, &NamespaceFilter::default(), &items);

        assert_eq!(report.ignored, 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_translate_schedule() {
        let translated = |schedule: &str| translate_schedule(schedule).unwrap();

        assert_eq!(translated("@daily"), vec!["@daily"]);
        assert_eq!(translated("@midnight"), vec!["@daily"]);
        assert_eq!(translated("*/15 * * * *"), vec!["0 */15 * * * *"]);
        assert_eq!(translated("0 3 * * 1-5"), vec!["0 0 3 * * MON,TUE,WED,THU,FRI"]);
        assert_eq!(translated("0 3 * * 0,6"), vec!["0 0 3 * * SUN,SAT"]);
        assert_eq!(translated("0 3 * * 5-7"), vec!["0 0 3 * * SUN,FRI,SAT"]);
        assert_eq!(translated("0 3 * * */2"), vec!["0 0 3 * * SUN,TUE,THU,SAT"]);
        assert_eq!(translated("0 3 * * mon-wed"), vec!["0 0 3 * * MON,TUE,WED"]);
        assert_eq!(translated("CRON_TZ=Europe/Oslo 30 2 * * *"), vec!["0 30 2 * * *"]);
        assert_eq!(
            translated("0 0 1 * 1"),
            vec!["0 0 0 1 * *", "0 0 0 * * MON"]
        );
    }

    #[test]
    fn test_malformed_weekdays() {
        assert_eq!(translate_schedule("0 3 * * 5-2"), None);
        assert_eq!(translate_schedule("0 3 * * 8"), None);
        assert_eq!(translate_schedule("0 3 * * 1/0"), None);
    }

    #[test]
    fn test_weekday_ranges_through_sunday_are_valid() {
        let health = CronJobHealth::new(now());
        let success = now() - Duration::hours(1);
        for schedule in ["0 3 * * 5-7", "0 3 * * 1-7", "0 3 * * 7", "0 3 * * 0-6"] {
            let item = cronjob("test", schedule, false, Some(success), Some(success));
            assert_eq!(health.assess(&item), Assessment::Healthy, "{schedule}");
        }
    }

    #[test]
    fn test_midnight_macro_is_valid() {
        let health = CronJobHealth::new(now());
        let success = now() - Duration::hours(1);
        let item = cronjob("test", "@midnight", false, Some(success), Some(success));
        assert_eq!(health.assess(&item), Assessment::Healthy);
    }

    #[test]
    fn test_day_of_month_or_weekday_fires_on_either() {
        // 95 Mondays alone stay under the limit; adding the 1st of each month does not.
        let since = now() - Duration::weeks(95);

        assert!(last_tolerated_run("0 0 * * 1", since).is_some_and(|run| run > now()));
        assert!(last_tolerated_run("0 0 1 * 1", since).is_some_and(|run| run < now()));

        let health = CronJobHealth::new(now());
        let item = cronjob("test", "0 0 1 * 1", false, Some(since), Some(since));
        assert_eq!(
            health.assess(&item),
            Assessment::Failing(FailureClass::CronJobMissedSchedules)
        );
    }

    #[test]
    fn test_input_order_does_not_change_outcome() {
        let health = CronJobHealth::new(now());
        let stale = now() - Duration::hours(720);
        let recent = now() - Duration::hours(1);
        let items = vec![
            cronjob("test", "@hourly", false, Some(stale), Some(stale)),
            cronjob("test", "@hourly", false, Some(recent), Some(recent)),
            cronjob("test", "@hourly", false, Some(now()), None),
            cronjob("lab-test", "@hourly", false, Some(now()), None),
            cronjob("test", "every tuesday", false, Some(recent), Some(recent)),
        ];
        let reversed: Vec<CronJob> = items.iter().rev().cloned().collect();

        let forward = evaluate(&health, &NamespaceFilter::default(), &items);
        let backward = evaluate(&health, &NamespaceFilter::default(), &reversed);

        assert_eq!(forward.exit_code(), 52);
        assert_eq!(backward.exit_code(), forward.exit_code());
        assert_eq!(
            (backward.total, backward.healthy, backward.ignored, backward.unhealthy),
            (forward.total, forward.healthy, forward.ignored, forward.unhealthy)
        );
        assert_eq!((forward.healthy, forward.ignored, forward.unhealthy), (1, 1, 3));
    }

    #[test]
    fn test_weekly_schedule_projection() {
        // Mondays at 03:00; 100 weeks is roughly two years.
        let since = now() - Duration::weeks(99);
        assert!(last_tolerated_run("0 3 * * 1", since).is_some_and(|run| run > now()));

        let since = now() - Duration::weeks(101);
        assert!(last_tolerated_run("0 3 * * 1", since).is_some_and(|run| run < now()));
    }
}
