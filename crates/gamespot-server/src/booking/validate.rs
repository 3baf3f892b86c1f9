//! Input validation for booking requests.
//!
//! Everything here runs before any state is touched.

use gamespot_relay::RelayAction;
use serde_json::Value;

use super::error::{BookingError, Result};

pub fn console_name(raw: Option<&str>) -> Result<&str> {
    match raw {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(BookingError::Validation("console is required".into())),
    }
}

/// Session length in minutes: a positive integer, sent either as a JSON
/// number or as a numeric string.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn minutes(raw: Option<&Value>) -> Result<u32> {
    let invalid = || BookingError::Validation("minutes must be a positive integer".into());
    let parsed = match raw {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(m) => Some(m),
            // Whole floats such as `30.0`.
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= f64::from(u32::MAX))
                .map(|f| f as u64),
        },
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .filter(|&m| m > 0)
        .and_then(|m| u32::try_from(m).ok())
        .ok_or_else(invalid)
}

pub fn method(raw: Option<&str>) -> Result<&str> {
    match raw {
        Some(method) if !method.trim().is_empty() => Ok(method),
        _ => Err(BookingError::Validation("method is required".into())),
    }
}

pub fn action(raw: Option<&str>) -> Result<RelayAction> {
    raw.and_then(|a| a.parse().ok())
        .ok_or_else(|| BookingError::Validation("action must be \"on\" or \"off\"".into()))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn minutes_accepts_numbers_and_numeric_strings() {
        assert_eq!(minutes(Some(&json!(30))).unwrap(), 30);
        assert_eq!(minutes(Some(&json!("45"))).unwrap(), 45);
        assert_eq!(minutes(Some(&json!(" 15 "))).unwrap(), 15);
        assert_eq!(minutes(Some(&json!(60.0))).unwrap(), 60);
    }

    #[test]
    fn minutes_rejects_everything_else() {
        for bad in [
            json!(0),
            json!(-5),
            json!(2.5),
            json!("0"),
            json!("abc"),
            json!("30min"),
            json!(""),
            json!(null),
            json!(true),
            json!([30]),
            json!(u64::from(u32::MAX) + 1),
        ] {
            let err = minutes(Some(&bad)).unwrap_err();
            assert!(matches!(err, BookingError::Validation(_)), "{bad}");
        }
        assert!(minutes(None).is_err());
    }

    #[test]
    fn blank_console_and_method_are_rejected() {
        assert!(console_name(None).is_err());
        assert!(console_name(Some("  ")).is_err());
        assert_eq!(console_name(Some("PS5 #1")).unwrap(), "PS5 #1");

        assert!(method(Some("")).is_err());
        assert_eq!(method(Some("upi")).unwrap(), "upi");
    }

    #[test]
    fn action_must_be_on_or_off() {
        assert_eq!(action(Some("on")).unwrap(), RelayAction::On);
        assert_eq!(action(Some("off")).unwrap(), RelayAction::Off);
        assert!(action(Some("reboot")).is_err());
        assert!(action(Some("ON")).is_err());
        assert!(action(None).is_err());
    }
}
