use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tracing::debug;

use calendar_cell::{CalendarError, CalendarStore};
use shared_config::AppConfig;

use crate::models::Alternatives;

/// Number of slot-sized steps each alternative scan pass examines.
const SCAN_STEPS: usize = 20;

/// Decides whether a candidate slot is bookable and hunts for nearby
/// alternatives when it is not.
pub struct AvailabilityChecker {
    calendar: Arc<dyn CalendarStore>,
    working_weekdays: Vec<Weekday>,
    opening_time: NaiveTime,
    closing_time: NaiveTime,
    slot_minutes: i64,
    holidays: HashSet<String>,
}

impl AvailabilityChecker {
    pub fn new(config: &AppConfig, calendar: Arc<dyn CalendarStore>) -> Self {
        Self {
            calendar,
            working_weekdays: config.working_weekdays.clone(),
            opening_time: config.opening_time,
            closing_time: config.closing_time,
            slot_minutes: config.slot_minutes,
            holidays: config.holidays.clone(),
        }
    }

    pub fn is_business_day(&self, dt: &DateTime<Tz>) -> bool {
        self.working_weekdays.contains(&dt.weekday())
    }

    pub fn is_holiday(&self, dt: &DateTime<Tz>) -> bool {
        self.holidays.contains(&dt.format("%Y-%m-%d").to_string())
    }

    /// True iff no existing booking intersects `[dt, dt + duration)`.
    /// A calendar failure is an error, not an open slot: the caller must
    /// answer "try again" rather than book blind.
    pub async fn has_open_slot(
        &self,
        dt: DateTime<Tz>,
        duration_minutes: i64,
    ) -> Result<bool, CalendarError> {
        let start = dt.with_timezone(&Utc);
        let end = start + Duration::minutes(duration_minutes);
        let events = self.calendar.list_events(start, end).await?;
        Ok(events.is_empty())
    }

    /// Looks for the next two bookable slots after `dt`: one pass in
    /// slot-sized steps from `dt`, a second pass from the next day's
    /// opening time if the first came up short. When both passes fail the
    /// result degrades to two copies of `dt + 1h`, flagged so the caller
    /// can say "nothing found nearby" instead of suggesting them.
    pub async fn find_alternatives(
        &self,
        dt: DateTime<Tz>,
        duration_minutes: i64,
    ) -> Alternatives {
        let mut slots = Vec::with_capacity(2);

        self.scan(dt + Duration::minutes(self.slot_minutes), duration_minutes, &mut slots)
            .await;

        if slots.len() < 2 {
            if let Some(restart) = self.next_day_opening(dt) {
                self.scan(restart, duration_minutes, &mut slots).await;
            }
        }

        if slots.len() < 2 {
            debug!("No real alternatives near {}, degrading to placeholder", dt);
            let placeholder = dt + Duration::hours(1);
            return Alternatives {
                slots: vec![placeholder, placeholder],
                degenerate: true,
            };
        }

        Alternatives {
            slots,
            degenerate: false,
        }
    }

    async fn scan(
        &self,
        mut candidate: DateTime<Tz>,
        duration_minutes: i64,
        slots: &mut Vec<DateTime<Tz>>,
    ) {
        for _ in 0..SCAN_STEPS {
            if slots.len() == 2 {
                break;
            }
            if self.fits_opening_hours(candidate, duration_minutes)
                && self.is_business_day(&candidate)
                && !self.is_holiday(&candidate)
                && matches!(self.has_open_slot(candidate, duration_minutes).await, Ok(true))
                && !slots.contains(&candidate)
            {
                slots.push(candidate);
            }
            candidate += Duration::minutes(self.slot_minutes);
        }
    }

    /// A suggested slot must start after opening and finish by closing on
    /// the same day.
    fn fits_opening_hours(&self, dt: DateTime<Tz>, duration_minutes: i64) -> bool {
        let end = dt + Duration::minutes(duration_minutes);
        dt.time() >= self.opening_time
            && end.date_naive() == dt.date_naive()
            && end.time() <= self.closing_time
    }

    fn next_day_opening(&self, dt: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let next_day = (dt.date_naive() + Duration::days(1)).and_time(self.opening_time);
        dt.timezone().from_local_datetime(&next_day).single()
    }
}
