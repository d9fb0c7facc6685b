use indexmap::IndexMap;

use crate::types::MetaValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimeParts {
    pub hour: u32,
    pub minute: u32,
}

impl TimeParts {
    /// Canonical 24-hour form.
    pub fn canonical(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    /// 12-hour display form (`2:30 PM`).
    pub fn display(&self) -> String {
        let (h, suffix) = match self.hour {
            0 => (12, "AM"),
            1..=11 => (self.hour, "AM"),
            12 => (12, "PM"),
            _ => (self.hour - 12, "PM"),
        };
        format!("{}:{:02} {}", h, self.minute, suffix)
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

/// Parse 12-hour, 24-hour, and keyword clock forms.
pub(crate) fn parse_time(text: &str) -> Option<TimeParts> {
    let text = text.trim();
    match text.to_lowercase().as_str() {
        "noon" => return Some(TimeParts { hour: 12, minute: 0 }),
        "midnight" => return Some(TimeParts { hour: 0, minute: 0 }),
        _ => {}
    }

    // Split off a trailing AM/PM marker if present.
    let lower = text.to_lowercase();
    let (clock, meridiem) = if let Some(rest) = lower
        .strip_suffix("a.m.")
        .or_else(|| lower.strip_suffix("am"))
    {
        (rest.trim_end(), Some(false))
    } else if let Some(rest) = lower
        .strip_suffix("p.m.")
        .or_else(|| lower.strip_suffix("pm"))
    {
        (rest.trim_end(), Some(true))
    } else {
        (lower.as_str(), None)
    };

    let mut it = clock.split(':');
    let hour: u32 = it.next()?.trim().parse().ok()?;
    let minute: u32 = it.next()?.trim().parse().ok()?;
    // Seconds are accepted and dropped.
    if let Some(seconds) = it.next() {
        let _: u32 = seconds.trim().parse().ok()?;
    }
    if it.next().is_some() || minute > 59 {
        return None;
    }

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            }
        }
        None => {
            if hour > 23 {
                return None;
            }
            hour
        }
    };

    Some(TimeParts { hour, minute })
}

pub(crate) fn time_metadata(parts: &TimeParts) -> IndexMap<String, MetaValue> {
    let mut meta = IndexMap::new();
    meta.insert("hour".to_string(), MetaValue::Int(parts.hour as i64));
    meta.insert("minute".to_string(), MetaValue::Int(parts.minute as i64));
    meta.insert(
        "minutes_since_midnight".to_string(),
        MetaValue::Int(parts.minutes_since_midnight() as i64),
    );
    meta.insert("display".to_string(), parts.display().into());
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_hour_forms() {
        let t = parse_time("2:30 PM").unwrap();
        assert_eq!(t.canonical(), "14:30");
        assert_eq!(t.display(), "2:30 PM");
        assert_eq!(t.minutes_since_midnight(), 870);

        assert_eq!(parse_time("12:00 AM").unwrap().canonical(), "00:00");
        assert_eq!(parse_time("12:15 p.m.").unwrap().canonical(), "12:15");
    }

    #[test]
    fn twenty_four_hour_forms() {
        assert_eq!(parse_time("14:30").unwrap().canonical(), "14:30");
        assert_eq!(parse_time("00:05").unwrap().canonical(), "00:05");
        assert_eq!(parse_time("23:59:59").unwrap().canonical(), "23:59");
    }

    #[test]
    fn keywords() {
        assert_eq!(parse_time("noon").unwrap().canonical(), "12:00");
        assert_eq!(parse_time("midnight").unwrap().canonical(), "00:00");
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(parse_time("25:00").is_none());
        assert!(parse_time("13:00 PM").is_none());
        assert!(parse_time("9:75").is_none());
    }
}
