//! Human-readable error descriptions and structured JSON error formatting.

use hydro_core::error::{BuildError, ControlError};

/// Exit code for a missing or unusable probe calibration.
pub const EXIT_CALIBRATION: i32 = 3;
/// Exit code for an invalid daily schedule.
pub const EXIT_SCHEDULE: i32 = 4;
pub const EXIT_OTHER: i32 = 1;

fn control_error(err: &eyre::Report) -> Option<&ControlError> {
    err.chain().find_map(|e| e.downcast_ref::<ControlError>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensors => {
                "What happened: No sensors were provided to the controller.\nLikely causes: The sensor backend failed to initialize.\nHow to fix: Check the [pins] and [hardware] sections and rerun `hydro self-check`.".to_string()
            }
            BuildError::MissingActuators => {
                "What happened: No actuators were provided to the controller.\nLikely causes: GPIO outputs failed to initialize.\nHow to fix: Check the [pins] section and GPIO permissions.".to_string()
            }
            BuildError::MissingConfig => {
                "What happened: The controller was started without a configuration.\nLikely causes: Internal wiring error.\nHow to fix: Re-run with --log-level=debug and report the output.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Tick interval or durations out of range.\nHow to fix: Edit the config file, then rerun. See etc/hydro_config.toml for a sample."
            ),
        };
    }

    if let Some(ce) = control_error(err) {
        return match ce {
            ControlError::Calibration(msg) => format!(
                "What happened: Probe calibration is missing or invalid ({msg}).\nLikely causes: No [calibration] section, or identical pH reference voltages.\nHow to fix: Measure the probes in pH 4, pH 7 and 1.413 mS/cm solutions and set ph4_v, ph7_v and ec1413_v."
            ),
            ControlError::ScheduleConfig(msg) => format!(
                "What happened: A daily schedule is invalid ({msg}).\nLikely causes: on is not earlier than off, or the off window overlaps the next on window.\nHow to fix: Fix [lighting], [circulation] or the [ec] dosing window."
            ),
            ControlError::Timeout => "What happened: Hardware did not answer in time.\nLikely causes: ADC not powered or wrong I2C address.\nHow to fix: Check wiring and hardware.conversion_timeout_ms.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open actuator pins") || lower.contains("open sensors") {
        let cause = err
            .source()
            .map(|s| format!(" Cause: {s}"))
            .unwrap_or_default();
        return format!(
            "What happened: Failed to initialize hardware.{cause}\nLikely causes: Incorrect pin numbers, I2C disabled, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] and [hardware] values; ensure the process may access GPIO and I2C."
        );
    }

    if lower.contains("invalid configuration") {
        let cause = err
            .source()
            .map(|s| s.to_string())
            .unwrap_or_else(|| msg.clone());
        return format!(
            "What happened: Configuration is invalid ({cause}).\nLikely causes: Out-of-range values or a tick interval longer than a grace period.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: calibration 3, schedule 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match control_error(err) {
        Some(ControlError::Calibration(_)) => EXIT_CALIBRATION,
        Some(ControlError::ScheduleConfig(_)) => EXIT_SCHEDULE,
        _ => EXIT_OTHER,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "BuildError";
    }
    match control_error(err) {
        Some(ControlError::Calibration(_)) => "CalibrationError",
        Some(ControlError::ScheduleConfig(_)) => "ScheduleConfigError",
        Some(ControlError::Timeout) => "Timeout",
        Some(_) => "ControlError",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_map_to_stable_exit_codes() {
        let cal = eyre::Report::new(ControlError::Calibration("none".into()));
        let sched = eyre::Report::new(ControlError::ScheduleConfig("on >= off".into()));
        let other = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&cal), 3);
        assert_eq!(exit_code_for_error(&sched), 4);
        assert_eq!(exit_code_for_error(&other), 1);
        assert!(humanize(&cal).contains("ph4_v"));
    }

    #[test]
    fn json_error_carries_reason_and_code() {
        let err = eyre::Report::new(ControlError::ScheduleConfig("on >= off".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "ScheduleConfigError");
        assert_eq!(v["exit_code"], 4);
    }
}
