//! Bus payload parser
//!
//! Field controllers publish one line of text per observation:
//!
//! ```text
//! Temperature: 28.5 C, Humidity: 66 %, Raining: false, Valve: Closed
//! ```
//!
//! ## Grammar
//!
//! - Pairs are separated by `", "`; blank segments (e.g. a trailing
//!   delimiter) are ignored
//! - Each pair splits on its first `": "`; keys are case-insensitive
//! - `temperature` and `humidity` carry `"<number> <unit text>"`; only the
//!   leading whitespace-delimited token is parsed, the unit is discarded
//! - Unknown keys are ignored, a repeated key keeps its last value
//!
//! Parsing never panics: every input maps to a `Reading` or a `ParseError`.

use crate::errors::{ParseError, ParseResult};
use crate::record::{parse_rain_flag, Reading, Valve};

const PAIR_DELIMITER: &str = ", ";
const KEY_DELIMITER: &str = ": ";

/// Raw values collected from one payload, keyed by field
#[derive(Default)]
struct Fields<'a> {
    temperature: Option<&'a str>,
    humidity: Option<&'a str>,
    raining: Option<&'a str>,
    valve: Option<&'a str>,
}

impl<'a> Fields<'a> {
    fn collect(payload: &'a str) -> ParseResult<Self> {
        let mut fields = Self::default();

        for pair in payload.split(PAIR_DELIMITER) {
            if pair.trim().is_empty() {
                continue;
            }

            let (key, value) = pair
                .split_once(KEY_DELIMITER)
                .ok_or_else(|| ParseError::MalformedPair {
                    pair: pair.to_string(),
                })?;

            match key.trim().to_lowercase().as_str() {
                "temperature" => fields.temperature = Some(value),
                "humidity" => fields.humidity = Some(value),
                "raining" => fields.raining = Some(value),
                "valve" => fields.valve = Some(value),
                _ => {}
            }
        }

        Ok(fields)
    }
}

fn require<'a>(value: Option<&'a str>, key: &'static str) -> ParseResult<&'a str> {
    value.ok_or(ParseError::MissingKey { key })
}

/// Parse the leading numeric token of a `"<number> <unit>"` value
fn parse_measurement(value: &str, field: &'static str) -> ParseResult<f64> {
    let invalid = || ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    };

    let token = value.split_whitespace().next().ok_or_else(invalid)?;
    let number: f64 = token.parse().map_err(|_| invalid())?;

    // "nan" and "inf" parse as f64 but are not measurements
    if !number.is_finite() {
        return Err(invalid());
    }
    Ok(number)
}

/// Parse a bus payload into a reading
pub fn parse_payload(payload: &str) -> ParseResult<Reading> {
    let fields = Fields::collect(payload)?;

    let temperature = require(fields.temperature, "temperature")?;
    let humidity = require(fields.humidity, "humidity")?;
    let raining = require(fields.raining, "raining")?;
    let valve = require(fields.valve, "valve")?;

    Ok(Reading {
        temperature: parse_measurement(temperature, "temperature")?,
        humidity: parse_measurement(humidity, "humidity")?,
        raining: parse_rain_flag(raining)?,
        valve: valve.parse::<Valve>()?,
    })
}

/// Parse raw payload bytes, rejecting non-UTF-8 input
pub fn parse_bytes(payload: &[u8]) -> ParseResult<Reading> {
    let text = core::str::from_utf8(payload).map_err(|_| ParseError::InvalidEncoding)?;
    parse_payload(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = "Temperature: 28.5 C, Humidity: 66 %, Raining: false, Valve: Closed";

    #[test]
    fn canonical_payload() {
        let reading = parse_payload(CANONICAL).unwrap();
        assert_eq!(reading.temperature, 28.5);
        assert_eq!(reading.humidity, 66.0);
        assert!(!reading.raining);
        assert_eq!(reading.valve, Valve::Closed);
    }

    #[test]
    fn keys_are_case_insensitive_and_order_free() {
        let reading =
            parse_payload("VALVE: Open, raining: True, HUMIDITY: 40.25 %RH, temperature: -3 °C").unwrap();
        assert_eq!(reading.temperature, -3.0);
        assert_eq!(reading.humidity, 40.25);
        assert!(reading.raining);
        assert_eq!(reading.valve, Valve::Open);
    }

    #[test]
    fn missing_keys_are_named() {
        let cases = [
            ("Humidity: 66 %, Raining: false, Valve: Closed", "temperature"),
            ("Temperature: 28.5 C, Raining: false, Valve: Closed", "humidity"),
            ("Temperature: 28.5 C, Humidity: 66 %, Valve: Closed", "raining"),
            ("Temperature: 28.5 C, Humidity: 66 %, Raining: false", "valve"),
        ];
        for (payload, key) in cases {
            assert_eq!(parse_payload(payload), Err(ParseError::MissingKey { key }));
        }
    }

    #[test]
    fn numeric_failures_name_the_field() {
        let err = parse_payload("Temperature: warm, Humidity: 66 %, Raining: false, Valve: Closed")
            .unwrap_err();
        assert_eq!(err.field(), Some("temperature"));

        let err = parse_payload("Temperature: 20 C, Humidity:  , Raining: false, Valve: Closed")
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { field: "humidity", .. }));
    }

    #[test]
    fn non_finite_numbers_rejected() {
        for bad in ["NaN", "inf", "-infinity"] {
            let payload = format!("Temperature: {bad} C, Humidity: 66 %, Raining: false, Valve: Closed");
            assert!(matches!(
                parse_payload(&payload),
                Err(ParseError::InvalidNumber { field: "temperature", .. })
            ));
        }
    }

    #[test]
    fn unit_glued_to_number_is_rejected() {
        let err = parse_payload("Temperature: 28.5C, Humidity: 66 %, Raining: false, Valve: Closed")
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { field: "temperature", .. }));
    }

    #[test]
    fn malformed_pair() {
        let err = parse_payload("Temperature 28.5 C, Humidity: 66 %").unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedPair {
                pair: "Temperature 28.5 C".into()
            }
        );
    }

    #[test]
    fn value_may_contain_key_delimiter() {
        // Only the first ": " separates key from value
        let reading =
            parse_payload("Temperature: 21 C: approx, Humidity: 50 %, Raining: no, Valve: Open").unwrap();
        assert_eq!(reading.temperature, 21.0);
    }

    #[test]
    fn trailing_delimiter_and_extra_keys() {
        let reading = parse_payload(
            "Device: plot-7, Temperature: 28.5 C, Humidity: 66 %, Raining: false, Valve: Closed, ",
        )
        .unwrap();
        assert_eq!(reading.valve, Valve::Closed);
    }

    #[test]
    fn last_duplicate_wins() {
        let reading = parse_payload(
            "Temperature: 1 C, Temperature: 2 C, Humidity: 66 %, Raining: false, Valve: Closed",
        )
        .unwrap();
        assert_eq!(reading.temperature, 2.0);
    }

    #[test]
    fn bytes_must_be_utf8() {
        assert_eq!(parse_bytes(&[0xff, 0xfe]), Err(ParseError::InvalidEncoding));
        assert!(parse_bytes(CANONICAL.as_bytes()).is_ok());
    }

    #[test]
    fn empty_payload() {
        assert_eq!(
            parse_payload(""),
            Err(ParseError::MissingKey { key: "temperature" })
        );
    }
}
