use super::*;

#[test]
fn time_units_scale_to_seconds() {
    assert_eq!(parse_time("1h").unwrap(), 3600.0);
    assert_eq!(parse_time("-10min").unwrap(), -600.0);
    assert_eq!(parse_time("+1s").unwrap(), 1.0);
    assert!((parse_time("10ms").unwrap() - 0.01).abs() < 1e-12);
    assert_eq!(parse_time("2.5").unwrap(), 2.5);
    assert_eq!(parse_time("  - 3s  ").unwrap(), -3.0);
}

#[test]
fn malformed_time_is_parse_error() {
    for bad in ["", "s", "1.s", "1 s", "1d", "abc", "1.5.2s", "--1"] {
        assert!(
            matches!(parse_time(bad), Err(ThalaError::Parse(_))),
            "expected parse error for {bad:?}"
        );
    }
}

#[test]
fn gain_accepts_signed_decibels() {
    assert_eq!(parse_gain("-10dB").unwrap(), -10.0);
    assert_eq!(parse_gain("10dB").unwrap(), 10.0);
    assert_eq!(parse_gain(" +1.5 dB").unwrap(), 1.5);
}

#[test]
fn malformed_gain_is_parse_error() {
    for bad in ["10", "dB", "10db", "10dB ", "x10dB"] {
        assert!(
            matches!(parse_gain(bad), Err(ThalaError::Parse(_))),
            "expected parse error for {bad:?}"
        );
    }
}
