use chrono::Weekday;

/// Parse a weekday name, ignoring case and surrounding whitespace
///
/// Accepts full names ("Monday") and three-letter forms ("mon").
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let day = match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Weekday for a stored day index, 0 = Monday
pub fn weekday_from_index(index: i32) -> Option<Weekday> {
    let day = match index {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        6 => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Full English name used in digests
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_any_casing() {
        assert_eq!(parse_weekday("Monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("WEDNESDAY"), Some(Weekday::Wed));
        assert_eq!(parse_weekday("  friday "), Some(Weekday::Fri));
        assert_eq!(parse_weekday("sUn"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("Funday"), None);
        assert_eq!(parse_weekday(""), None);
    }

    #[test]
    fn test_index_matches_chrono_numbering() {
        for index in 0..7 {
            let day = weekday_from_index(index).unwrap();
            assert_eq!(day.num_days_from_monday() as i32, index);
        }
        assert_eq!(weekday_from_index(7), None);
        assert_eq!(weekday_from_index(-1), None);
    }

    #[test]
    fn test_name_round_trips_through_parser() {
        for index in 0..7 {
            let day = weekday_from_index(index).unwrap();
            assert_eq!(parse_weekday(day_name(day)), Some(day));
        }
    }
}
