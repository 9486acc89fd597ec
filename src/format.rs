//! Display formatting in the application's `es-ES` locale.

use chrono::{DateTime, Datelike, Timelike, Utc};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

fn plural(n: i64, one: &str, many: &str) -> String {
    format!("hace {n} {}", if n == 1 { one } else { many })
}

/// Coarse "time ago" text: minutes under an hour, hours under a day, days under
/// thirty days, 30-day months under a year and years beyond that.
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 60 {
        return "hace un momento".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return plural(minutes, "minuto", "minutos");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return plural(hours, "hora", "horas");
    }
    let days = hours / 24;
    if days < 30 {
        return plural(days, "día", "días");
    }
    let months = days / 30;
    if months < 12 {
        return plural(months, "mes", "meses");
    }
    plural(months / 12, "año", "años")
}

/// Card date, e.g. `15 ago 2023`.
pub fn format_date(at: DateTime<Utc>) -> String {
    let month = MONTHS[at.month0() as usize];
    let short: String = month.chars().take(3).collect();
    format!("{} {} {}", at.day(), short, at.year())
}

/// Detail page date, e.g. `15 de agosto de 2023, 10:30`.
pub fn format_detail_date(at: DateTime<Utc>) -> String {
    format!(
        "{} de {} de {}, {:02}:{:02}",
        at.day(),
        MONTHS[at.month0() as usize],
        at.year(),
        at.hour(),
        at.minute()
    )
}
