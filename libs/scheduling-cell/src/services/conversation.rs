use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use calendar_cell::{CalendarEvent, CalendarStore, EventMetadata, STATUS_BOOKED, STATUS_CONFIRMED};
use sheets_cell::{AppendOnlyLog, AppointmentRow};
use shared_config::AppConfig;
use whatsapp_cell::MessagingSender;

use crate::catalog::{MessageTemplates, TreatmentCatalog};
use crate::models::{
    ConversationState, SchedulingError, Treatment, CANCEL_KEYWORDS, CONFIRM_KEYWORDS, GREETINGS,
};
use crate::services::availability::AvailabilityChecker;
use crate::services::resolver;
use crate::services::store::ConversationStore;

/// Drives the whole chat: one inbound message in, zero or more template
/// replies out, conversation state updated in the store.
pub struct ConversationEngine {
    catalog: TreatmentCatalog,
    templates: MessageTemplates,
    availability: AvailabilityChecker,
    messaging: Arc<dyn MessagingSender>,
    calendar: Arc<dyn CalendarStore>,
    log: Arc<dyn AppendOnlyLog>,
    store: Arc<dyn ConversationStore>,
    timezone: Tz,
    reply_window_hours: i64,
}

impl ConversationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        catalog: TreatmentCatalog,
        templates: MessageTemplates,
        messaging: Arc<dyn MessagingSender>,
        calendar: Arc<dyn CalendarStore>,
        log: Arc<dyn AppendOnlyLog>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let availability = AvailabilityChecker::new(config, calendar.clone());
        Self {
            catalog,
            templates,
            availability,
            messaging,
            calendar,
            log,
            store,
            timezone: config.clinic_timezone,
            reply_window_hours: config.reply_window_hours,
        }
    }

    /// Entry point for every inbound message. Never returns an error to
    /// the webhook: failures are logged and answered with the technical
    /// error template so the patient is not left hanging.
    pub async fn handle_message(&self, phone: &str, text: &str) {
        let normalized = text.trim().to_lowercase();
        info!("Inbound message from {}: {:?}", phone, normalized);

        if let Err(e) = self.dispatch(phone, &normalized).await {
            error!("Conversation with {} failed: {}", phone, e);
            if let Err(send_err) = self
                .messaging
                .send_text(phone, self.templates.get("error_tecnico"))
                .await
            {
                warn!("Could not deliver error notice to {}: {}", phone, send_err);
            }
            if let Err(store_err) = self.store.delete(phone).await {
                warn!("Could not reset state for {}: {}", phone, store_err);
            }
        }
    }

    async fn dispatch(&self, phone: &str, text: &str) -> Result<(), SchedulingError> {
        if GREETINGS.contains(&text) {
            return self.greet(phone).await;
        }

        if let Some(treatment) = self.catalog.get(text).cloned() {
            return self.select_treatment(phone, treatment).await;
        }

        let state = self.store.get(phone).await?.unwrap_or_default();
        let now = Utc::now().with_timezone(&self.timezone);

        if let (Some(when), Some(treatment)) = (resolver::resolve(text, now), state.treatment) {
            return self.book(phone, treatment, when).await;
        }

        if CONFIRM_KEYWORDS.contains(&text) {
            return self.confirm_reminder(phone).await;
        }
        if CANCEL_KEYWORDS.contains(&text) {
            return self.cancel_reminder(phone).await;
        }

        self.messaging
            .send_text(phone, self.templates.get("no_entendi"))
            .await?;
        Ok(())
    }

    /// A greeting always restarts the flow, whatever state was left over.
    async fn greet(&self, phone: &str) -> Result<(), SchedulingError> {
        self.store.set(phone, &ConversationState::default()).await?;
        self.messaging
            .send_buttons(
                phone,
                self.templates.get("bienvenida"),
                &self.catalog.menu_buttons(),
            )
            .await?;
        Ok(())
    }

    async fn select_treatment(
        &self,
        phone: &str,
        treatment: Treatment,
    ) -> Result<(), SchedulingError> {
        let state = ConversationState {
            treatment: Some(treatment),
            event_id: None,
        };
        self.store.set(phone, &state).await?;
        self.messaging
            .send_text(phone, self.templates.get("pedir_fecha"))
            .await?;
        Ok(())
    }

    async fn book(
        &self,
        phone: &str,
        treatment: Treatment,
        when: DateTime<Tz>,
    ) -> Result<(), SchedulingError> {
        if !self.availability.is_business_day(&when) {
            self.messaging
                .send_text(phone, self.templates.get("no_laborable"))
                .await?;
            return Ok(());
        }
        if self.availability.is_holiday(&when) {
            self.messaging
                .send_text(phone, self.templates.get("feriado"))
                .await?;
            return Ok(());
        }

        let open = match self
            .availability
            .has_open_slot(when, treatment.duration_minutes)
            .await
        {
            Ok(open) => open,
            Err(e) => {
                // Can't tell whether the slot is free; never book blind.
                warn!("Availability check for {} failed: {}", phone, e);
                self.messaging
                    .send_text(phone, self.templates.get("error_tecnico"))
                    .await?;
                self.store.delete(phone).await?;
                return Ok(());
            }
        };

        if !open {
            return self.suggest_alternatives(phone, treatment, when).await;
        }

        let start = when.with_timezone(&Utc);
        let end = start + Duration::minutes(treatment.duration_minutes);
        let metadata = EventMetadata {
            patient_phone: phone.to_string(),
            treatment: treatment.name.clone(),
            status: STATUS_BOOKED.to_string(),
        };
        let summary = format!("{} - {}", treatment.name, phone);

        let event_id = match self
            .calendar
            .create_event(&summary, start, end, &metadata)
            .await
        {
            Ok(id) if !id.is_empty() => id,
            Ok(_) => {
                warn!("Calendar returned an event without an id for {}", phone);
                self.messaging
                    .send_text(phone, self.templates.get("error_agenda"))
                    .await?;
                return Ok(());
            }
            Err(e) => {
                warn!("Event creation for {} failed: {}", phone, e);
                self.messaging
                    .send_text(phone, self.templates.get("error_agenda"))
                    .await?;
                return Ok(());
            }
        };

        info!("Booked {} for {} at {} ({})", treatment.name, phone, when, event_id);

        let booked = ConversationState {
            treatment: Some(treatment.clone()),
            event_id: Some(event_id),
        };
        self.store.set(phone, &booked).await?;

        self.log_appointment(when, &treatment.name, phone, "Agendada")
            .await;

        self.messaging
            .send_text(
                phone,
                &self.templates.render(
                    "confirmada",
                    &[
                        ("fecha", when.format("%d/%m/%Y").to_string()),
                        ("hora", when.format("%I:%M %p").to_string()),
                    ],
                ),
            )
            .await?;

        // Flow is complete; keeping the state would make the next greeting
        // unnecessary but also make stray text look like a date request.
        self.store.delete(phone).await?;
        Ok(())
    }

    async fn suggest_alternatives(
        &self,
        phone: &str,
        treatment: Treatment,
        when: DateTime<Tz>,
    ) -> Result<(), SchedulingError> {
        let alternatives = self
            .availability
            .find_alternatives(when, treatment.duration_minutes)
            .await;

        let text = if alternatives.degenerate {
            self.templates.get("sin_alternativas").to_string()
        } else {
            self.templates.render(
                "no_hay_hueco",
                &[
                    ("alt1", alternatives.slots[0].format("%d/%m %I:%M %p").to_string()),
                    ("alt2", alternatives.slots[1].format("%d/%m %I:%M %p").to_string()),
                ],
            )
        };
        // State stays untouched so the patient can answer with a new date.
        self.messaging.send_text(phone, &text).await?;
        Ok(())
    }

    async fn confirm_reminder(&self, phone: &str) -> Result<(), SchedulingError> {
        let Some(event) = self.upcoming_event(phone).await? else {
            self.messaging
                .send_text(phone, self.templates.get("sin_cita_proxima"))
                .await?;
            return Ok(());
        };

        self.calendar
            .patch_event_status(&event.id, STATUS_CONFIRMED)
            .await?;
        info!("{} confirmed event {}", phone, event.id);
        self.messaging
            .send_text(phone, self.templates.get("confirmado_ok"))
            .await?;
        Ok(())
    }

    async fn cancel_reminder(&self, phone: &str) -> Result<(), SchedulingError> {
        let Some(event) = self.upcoming_event(phone).await? else {
            self.messaging
                .send_text(phone, self.templates.get("sin_cita_proxima"))
                .await?;
            return Ok(());
        };

        let treatment = event
            .treatment
            .clone()
            .unwrap_or_else(|| summary_treatment(&event.summary));

        self.calendar.delete_event(&event.id).await?;
        info!("{} cancelled event {}", phone, event.id);

        let when = event.start.with_timezone(&self.timezone);
        self.log_appointment(when, &treatment, phone, "Cancelada").await;

        self.messaging
            .send_text(phone, self.templates.get("cancelado_ok"))
            .await?;
        self.store.delete(phone).await?;
        Ok(())
    }

    /// The patient's next booking inside the reminder reply window, if any.
    async fn upcoming_event(
        &self,
        phone: &str,
    ) -> Result<Option<CalendarEvent>, SchedulingError> {
        let now = Utc::now();
        let until = now + Duration::hours(self.reply_window_hours);
        let mut events = self
            .calendar
            .list_events_for_patient(phone, now, until)
            .await?;
        events.sort_by_key(|e| e.start);
        Ok(events.into_iter().next())
    }

    /// The sheet is an audit trail, not the source of truth; a failed
    /// append must not undo a booking that already exists in the calendar.
    async fn log_appointment(&self, when: DateTime<Tz>, treatment: &str, phone: &str, status: &str) {
        let now = Utc::now().with_timezone(&self.timezone);
        let row = AppointmentRow::new(when, treatment, phone, status, now);
        if let Err(e) = self.log.append(&row).await {
            warn!("Appointment log append for {} failed: {}", phone, e);
        }
    }
}

/// Older events carry the treatment only in the "Treatment - phone" summary.
fn summary_treatment(summary: &str) -> String {
    summary
        .split(" - ")
        .next()
        .unwrap_or(summary)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_fallback_strips_phone_suffix() {
        assert_eq!(summary_treatment("Limpieza dental - 5215512345678"), "Limpieza dental");
        assert_eq!(summary_treatment("Limpieza"), "Limpieza");
    }
}
