use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, TimeZone, Weekday};
use chrono_tz::Tz;
use regex::Regex;

/// Accents are optional: patients type "miercoles" as often as "miércoles".
const RELATIVE_DAYS: [(&str, i64); 4] = [
    ("hoy", 0),
    ("mañana", 1),
    ("manana", 1),
    ("pasado", 2),
];

const WEEKDAYS: [(&str, Weekday); 9] = [
    ("lunes", Weekday::Mon),
    ("martes", Weekday::Tue),
    ("miércoles", Weekday::Wed),
    ("miercoles", Weekday::Wed),
    ("jueves", Weekday::Thu),
    ("viernes", Weekday::Fri),
    ("sábado", Weekday::Sat),
    ("sabado", Weekday::Sat),
    ("domingo", Weekday::Sun),
];

fn hour_pattern() -> &'static Regex {
    static HOUR_RE: OnceLock<Regex> = OnceLock::new();
    // 1-2 digits followed by an am/pm marker; the marker tolerates a bare
    // "a"/"p" as well as the full suffix ("4 pm", "4pm", "4 p").
    HOUR_RE.get_or_init(|| Regex::new(r"(\d{1,2})\s*([ap])m?\b").expect("static regex is valid"))
}

/// Resolves free text like "mañana 4 pm" or "lunes 10am" to a concrete
/// local date-time. Minutes and seconds are always zero. Returns `None`
/// whenever either the day or the hour cannot be understood; nothing in
/// here ever panics on patient input.
pub fn resolve(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let text = text.to_lowercase();

    let offset = day_offset(&text, now.weekday())?;
    let hour = hour_of_day(&text)?;

    let date = now.date_naive() + Duration::days(offset);
    // Nonsense hours ("15 pm" -> 27) and DST gaps collapse to None here.
    now.timezone()
        .with_ymd_and_hms(date.year(), date.month(), date.day(), hour, 0, 0)
        .single()
}

/// Relative-day keywords win over weekday names when both appear. A named
/// weekday resolves to its next occurrence strictly after today: naming
/// today's weekday means next week, never today.
fn day_offset(text: &str, today: Weekday) -> Option<i64> {
    for (keyword, days) in RELATIVE_DAYS {
        if text.contains(keyword) {
            return Some(days);
        }
    }

    for (name, weekday) in WEEKDAYS {
        if text.contains(name) {
            let ahead = (weekday.num_days_from_monday() as i64
                - today.num_days_from_monday() as i64)
                .rem_euclid(7);
            return Some(if ahead == 0 { 7 } else { ahead });
        }
    }

    None
}

fn hour_of_day(text: &str) -> Option<u32> {
    let captures = hour_pattern().captures(text)?;
    let hour: u32 = captures.get(1)?.as_str().parse().ok()?;
    let meridiem = captures.get(2)?.as_str();

    Some(match (meridiem, hour) {
        ("p", h) if h != 12 => h + 12,
        ("a", 12) => 0,
        (_, h) => h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn monday_morning() -> DateTime<Tz> {
        // 2025-07-14 was a Monday
        chrono_tz::America::Mexico_City
            .with_ymd_and_hms(2025, 7, 14, 9, 0, 0)
            .unwrap()
    }

    #[test]
    fn tomorrow_afternoon_resolves_to_tuesday_sixteen_hundred() {
        let dt = resolve("mañana 4 pm", monday_morning()).unwrap();
        assert_eq!(dt.weekday(), Weekday::Tue);
        assert_eq!((dt.day(), dt.hour(), dt.minute(), dt.second()), (15, 16, 0, 0));
    }

    #[test]
    fn relative_keywords_map_to_fixed_offsets() {
        let now = monday_morning();
        assert_eq!(resolve("hoy 3pm", now).unwrap().day(), 14);
        assert_eq!(resolve("manana 3pm", now).unwrap().day(), 15);
        assert_eq!(resolve("pasado 3pm", now).unwrap().day(), 16);
    }

    #[test]
    fn todays_weekday_name_means_next_week() {
        let dt = resolve("lunes 10am", monday_morning()).unwrap();
        assert_eq!(dt.weekday(), Weekday::Mon);
        assert_eq!(dt.day(), 21); // strictly after today, never +0
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn weekday_name_resolves_to_next_occurrence() {
        let dt = resolve("miercoles 10am", monday_morning()).unwrap();
        assert_eq!(dt.weekday(), Weekday::Wed);
        assert_eq!(dt.day(), 16);
    }

    #[test]
    fn relative_keyword_beats_weekday_name() {
        // "hoy" and "viernes" in one message: the relative keyword wins
        let dt = resolve("hoy viernes 5pm", monday_morning()).unwrap();
        assert_eq!(dt.day(), 14);
    }

    #[test]
    fn twelve_hour_conversion_edges() {
        let now = monday_morning();
        assert_eq!(resolve("hoy 12pm", now).unwrap().hour(), 12);
        assert_eq!(resolve("hoy 12am", now).unwrap().hour(), 0);
        assert_eq!(resolve("hoy 9am", now).unwrap().hour(), 9);
        assert_eq!(resolve("hoy 9pm", now).unwrap().hour(), 21);
    }

    #[test]
    fn bare_meridiem_letter_is_accepted() {
        let dt = resolve("mañana 4 p", monday_morning()).unwrap();
        assert_eq!(dt.hour(), 16);
    }

    #[test]
    fn day_without_hour_is_not_a_date() {
        assert!(resolve("mañana", monday_morning()).is_none());
        assert!(resolve("lunes por favor", monday_morning()).is_none());
    }

    #[test]
    fn hour_without_day_is_not_a_date() {
        assert!(resolve("4 pm", monday_morning()).is_none());
    }

    #[test]
    fn unrelated_text_is_not_a_date() {
        assert!(resolve("gracias", monday_morning()).is_none());
        assert!(resolve("", monday_morning()).is_none());
    }

    #[test]
    fn impossible_hour_is_rejected_not_wrapped() {
        assert!(resolve("hoy 15 pm", monday_morning()).is_none());
    }
}
