//! Instruction augmentation with the owner's current date and time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Clock used when rendering the current date into instructions.
pub type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// System clock.
pub fn system_clock() -> NowFn {
    Arc::new(Utc::now)
}

/// Resolve the owner's timezone, falling back to `default_tz` and then UTC.
pub fn resolve_timezone(owner_tz: Option<&str>, default_tz: &str) -> Tz {
    if let Some(name) = owner_tz.map(str::trim).filter(|name| !name.is_empty()) {
        match name.parse::<Tz>() {
            Ok(tz) => return tz,
            Err(_) => tracing::warn!(timezone = name, "unknown owner timezone, using default"),
        }
    }
    default_tz.parse::<Tz>().unwrap_or(Tz::UTC)
}

/// Human-readable timestamp, e.g. `Monday, October 19, 2026 at 14:05 (Europe/Berlin)`.
pub fn render_datetime(now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz);
    format!("{} ({})", local.format("%A, %B %-d, %Y at %H:%M"), tz.name())
}

/// Stored instructions followed by the current date line.
pub fn augment_instructions(instructions: &str, now: DateTime<Utc>, tz: Tz) -> String {
    let stamp = format!("Current date and time: {}", render_datetime(now, tz));
    if instructions.trim().is_empty() {
        stamp
    } else {
        format!("{instructions}\n\n{stamp}")
    }
}
