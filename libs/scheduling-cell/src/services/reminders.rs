use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Timelike, Utc};
use tracing::{info, warn};

use calendar_cell::CalendarStore;
use shared_config::AppConfig;
use whatsapp_cell::{MessagingSender, ReplyButton};

use crate::catalog::MessageTemplates;

/// One pass of the reminder job: find every unconfirmed booking that
/// starts `reminder_lead_hours` from now (to hour precision) and ping the
/// patient with confirm/cancel buttons. Returns how many went out.
pub async fn run_reminder_sweep(
    calendar: Arc<dyn CalendarStore>,
    messaging: Arc<dyn MessagingSender>,
    templates: &MessageTemplates,
    config: &AppConfig,
) -> Result<usize> {
    let now_local = Utc::now().with_timezone(&config.clinic_timezone);
    let target = now_local + Duration::hours(config.reminder_lead_hours);
    let window_start = target
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(target);
    let window_end = window_start + Duration::hours(1);

    info!(
        "Reminder sweep for bookings between {} and {}",
        window_start, window_end
    );

    let window_start_utc = window_start.with_timezone(&Utc);
    let window_end_utc = window_end.with_timezone(&Utc);
    let events = calendar.list_events(window_start_utc, window_end_utc).await?;

    let buttons = [
        ReplyButton::new("conf", "Confirmar"),
        ReplyButton::new("canc", "Cancelar"),
    ];

    let mut sent = 0;
    for event in events {
        // The API returns anything overlapping the range; an appointment
        // that started earlier was already covered by the previous sweep.
        if event.start < window_start_utc || event.start >= window_end_utc {
            continue;
        }
        if event.is_confirmed() {
            continue;
        }

        let Some(phone) = event
            .patient_phone
            .clone()
            .or_else(|| summary_phone(&event.summary))
        else {
            warn!("Event {} has no patient phone, skipping reminder", event.id);
            continue;
        };

        let start_local = event.start.with_timezone(&config.clinic_timezone);
        let text = templates.render(
            "recordatorio",
            &[
                ("fecha", start_local.format("%d/%m/%Y").to_string()),
                ("hora", start_local.format("%I:%M %p").to_string()),
            ],
        );

        match messaging.send_buttons(&phone, &text, &buttons).await {
            Ok(()) => sent += 1,
            Err(e) => warn!("Reminder to {} failed: {}", phone, e),
        }
    }

    info!("Reminder sweep sent {} message(s)", sent);
    Ok(sent)
}

/// Events created before metadata landed keep the phone in the summary
/// as "Treatment - phone".
fn summary_phone(summary: &str) -> Option<String> {
    summary
        .rsplit(" - ")
        .next()
        .filter(|tail| *tail != summary && !tail.trim().is_empty())
        .map(|tail| tail.trim().to_string())
}
