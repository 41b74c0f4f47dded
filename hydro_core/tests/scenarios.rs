//! End-to-end tick scenarios over scripted sensors.

mod common;

use chrono::{NaiveDate, TimeDelta};
use common::{at, controller, healthy_sensors, rig, run_ticks};
use hydro_core::mocks::FailingActuators;
use hydro_core::{DoseKind, Phase};
use hydro_traits::clock::test_clock::TestClock;
use hydro_traits::{Actuator, Sensor};

#[test]
fn ph_above_band_doses_ph_down_once_window_is_full() {
    let mut r = rig();
    r.ctrl.resume_schedules(at(12, 0, 0));
    let warmup = run_ticks(&mut r.ctrl, at(12, 0, 0), 5);
    assert_eq!(warmup[4].commanded(Actuator::WaterPump), Some(true));

    r.sensors
        .queue_analog(Sensor::Ph, &[7.2, 7.5, 7.6, 7.8, 7.9]);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 25), 5);
    for rep in &reports[..4] {
        assert!(rep.doses_started.is_empty());
        assert_eq!(rep.avg_ph, None);
    }
    assert_eq!(reports[4].avg_ph, Some(7.6));
    assert_eq!(reports[4].doses_started, vec![DoseKind::PhDown]);
    assert_eq!(reports[4].commanded(Actuator::RedLed), Some(true));

    let done = r.ctrl.wait_for_workers();
    assert_eq!(done.len(), 1);
    assert!(done[0].completed);
    assert_eq!(r.outputs.writes_for(Actuator::PhDownPump), vec![true, false]);
    assert!(r.outputs.writes_for(Actuator::PhUpPump).is_empty());
}

#[test]
fn ph_is_not_redosed_before_settling() {
    let mut r = rig();
    r.ctrl.resume_schedules(at(12, 0, 0));
    r.sensors.set_analog(Sensor::Ph, 7.9);
    let first = run_ticks(&mut r.ctrl, at(12, 0, 0), 10);
    assert_eq!(first[9].doses_started, vec![DoseKind::PhDown]);
    r.ctrl.wait_for_workers();

    // Dose started at 12:00:50; the next may start 60 s later.
    let next = run_ticks(&mut r.ctrl, at(12, 0, 50), 12);
    for rep in &next[..11] {
        assert!(rep.doses_started.is_empty(), "dosed at {}", rep.at);
    }
    assert_eq!(next[11].at, at(12, 1, 50));
    assert_eq!(next[11].doses_started, vec![DoseKind::PhDown]);
}

#[test]
fn ph_pump_that_will_not_stop_blocks_redosing_and_sounds_the_buzzer() {
    let sensors = healthy_sensors();
    sensors.set_analog(Sensor::Ph, 7.9);
    let hal = FailingActuators::new();
    hal.stick_on(Actuator::PhDownPump);
    let mut ctrl = controller(&sensors, hal.clone(), &TestClock::new());
    ctrl.resume_schedules(at(12, 0, 0));

    let first = run_ticks(&mut ctrl, at(12, 0, 0), 10);
    assert_eq!(first[9].doses_started, vec![DoseKind::PhDown]);
    let done = ctrl.wait_for_workers();
    assert_eq!(done[0].pump_left_on, Some(Actuator::PhDownPump));

    // Well past the settle interval, still no second dose.
    let stuck = run_ticks(&mut ctrl, at(12, 0, 50), 20);
    assert!(stuck.iter().all(|rep| rep.doses_started.is_empty()));
    assert!(stuck.iter().all(|rep| rep.write_errors >= 1));
    assert_eq!(stuck[0].commanded(Actuator::Buzzer), Some(true));
    assert_eq!(ctrl.state().chemistry.ph_in_flight, Some(DoseKind::PhDown));

    hal.heal(Actuator::PhDownPump);
    let healed = ctrl.tick(at(12, 2, 35));
    assert_eq!(healed.commanded(Actuator::PhDownPump), Some(false));
    assert_eq!(healed.commanded(Actuator::Buzzer), Some(false));
    assert_eq!(ctrl.state().chemistry.stuck_pump, None);
    assert_eq!(healed.doses_started, vec![DoseKind::PhDown]);
    ctrl.wait_for_workers();
}

#[test]
fn low_ph_doses_ph_up() {
    let mut r = rig();
    r.ctrl.resume_schedules(at(12, 0, 0));
    r.sensors.set_analog(Sensor::Ph, 5.0);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 10);
    assert_eq!(reports[9].doses_started, vec![DoseKind::PhUp]);
    r.ctrl.wait_for_workers();
    assert_eq!(r.outputs.writes_for(Actuator::PhUpPump), vec![true, false]);
}

#[test]
fn chemistry_waits_for_the_circulation_pump() {
    let mut r = rig();
    // No resume: circulation gate stays disengaged at noon.
    r.sensors.set_analog(Sensor::Ph, 7.9);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 20);
    assert!(reports.iter().all(|rep| rep.doses_started.is_empty()));
    assert_eq!(r.sensors.reads(Sensor::Ph), 0);
    assert_eq!(r.ctrl.state().circulation.phase, Phase::Idle);
}

#[test]
fn nutrients_dose_once_per_day_inside_window() {
    let mut r = rig();
    r.sensors.set_analog(Sensor::Ec, 0.8);
    r.ctrl.resume_schedules(at(14, 59, 0));
    let before = run_ticks(&mut r.ctrl, at(14, 59, 0), 10);
    assert_eq!(before[9].avg_ec, Some(0.8));
    assert!(before.iter().all(|rep| rep.doses_started.is_empty()));
    assert_eq!(before[9].commanded(Actuator::BlueLed), Some(true));

    let rep = r.ctrl.tick(at(15, 2, 0));
    assert_eq!(rep.doses_started, vec![DoseKind::Nutrients]);
    r.ctrl.wait_for_workers();
    assert_eq!(
        r.outputs
            .writes()
            .into_iter()
            .filter(|(a, _)| matches!(
                a,
                Actuator::FertilizationPumpA | Actuator::FertilizationPumpB
            ))
            .collect::<Vec<_>>(),
        vec![
            (Actuator::FertilizationPumpA, true),
            (Actuator::FertilizationPumpA, false),
            (Actuator::FertilizationPumpB, true),
            (Actuator::FertilizationPumpB, false),
        ]
    );
    assert_eq!(
        r.ctrl.state().chemistry.guard.last_dose(),
        Some(at(15, 2, 0))
    );

    let later = r.ctrl.tick(at(15, 4, 0));
    assert!(later.doses_started.is_empty());

    let next_day = NaiveDate::from_ymd_opt(2024, 5, 2)
        .unwrap()
        .and_hms_opt(15, 2, 0)
        .unwrap();
    assert!(r.ctrl.tick(next_day).doses_started.is_empty());
    assert_eq!(
        r.ctrl.tick(next_day + TimeDelta::seconds(5)).doses_started,
        vec![DoseKind::Nutrients]
    );
}

#[test]
fn vent_opens_on_either_signal_and_closes_on_both() {
    let mut r = rig();
    r.sensors
        .set_analog(Sensor::AirTemperature, 31.0)
        .set_analog(Sensor::AirHumidity, 85.0);
    let open = run_ticks(&mut r.ctrl, at(12, 0, 0), 5);
    for rep in &open[..4] {
        assert_eq!(rep.commanded(Actuator::Vent), None);
    }
    assert_eq!(open[4].avg_air_temp, Some(31.0));
    assert_eq!(open[4].commanded(Actuator::Vent), Some(true));

    r.sensors
        .set_analog(Sensor::AirTemperature, 24.0)
        .set_analog(Sensor::AirHumidity, 39.0);
    let close = run_ticks(&mut r.ctrl, at(12, 0, 25), 5);
    for rep in &close[..4] {
        assert_eq!(rep.commanded(Actuator::Vent), None);
    }
    assert_eq!(close[4].commanded(Actuator::Vent), Some(false));
    assert_eq!(r.outputs.writes_for(Actuator::Vent), vec![true, false]);
}

#[test]
fn humidity_alone_keeps_the_vent_open() {
    let mut r = rig();
    r.sensors
        .set_analog(Sensor::AirTemperature, 26.0)
        .set_analog(Sensor::AirHumidity, 85.0);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 5);
    assert_eq!(reports[4].commanded(Actuator::Vent), Some(true));

    r.sensors
        .set_analog(Sensor::AirTemperature, 24.0)
        .set_analog(Sensor::AirHumidity, 50.0);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 25), 10);
    assert!(
        reports
            .iter()
            .all(|rep| rep.commanded(Actuator::Vent).is_none())
    );
    assert!(r.outputs.is_on(Actuator::Vent));
}

#[test]
fn debounced_low_water_fills_until_top_is_full() {
    let mut r = rig();
    r.sensors.set_digital(Sensor::WaterLevelBottom, true);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 5);
    assert_eq!(reports[0].commanded(Actuator::WaterValve), Some(false));
    assert_eq!(reports[4].commanded(Actuator::WaterValve), Some(true));
    assert_eq!(reports[4].phase, Phase::Filling { since: at(12, 0, 25) });
    assert_eq!(reports[4].commanded(Actuator::WaterLed), Some(true));

    r.sensors.set_digital(Sensor::WaterLevelTop, true);
    let rep = r.ctrl.tick(at(12, 0, 30));
    assert_eq!(rep.commanded(Actuator::WaterValve), Some(false));
    assert_eq!(rep.phase, Phase::Idle);
    assert!(r.ctrl.state().circulation.bottom.is_empty());
}

#[test]
fn fill_stops_after_the_fill_duration() {
    let mut r = rig();
    r.sensors.set_digital(Sensor::WaterLevelBottom, true);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 41);
    assert_eq!(reports[39].phase, Phase::Filling { since: at(12, 0, 25) });
    assert_eq!(reports[40].at, at(12, 3, 25));
    assert_eq!(reports[40].phase, Phase::Idle);
    assert_eq!(reports[40].commanded(Actuator::WaterValve), Some(false));
}

#[test]
fn filling_takes_precedence_over_scheduled_circulation() {
    let mut r = rig();
    r.ctrl.resume_schedules(at(12, 0, 0));
    r.sensors.set_digital(Sensor::WaterLevelBottom, true);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 20);
    assert!(matches!(reports[19].phase, Phase::Filling { .. }));
    assert!(!r.outputs.is_on(Actuator::WaterPump));
    assert!(r.outputs.is_on(Actuator::WaterValve));
}

#[test]
fn scheduled_circulation_keeps_the_refill_valve_closed() {
    let mut r = rig();
    r.ctrl.resume_schedules(at(12, 0, 0));
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 20);
    assert_eq!(reports[4].commanded(Actuator::WaterPump), Some(true));
    assert!(reports[4..].iter().all(|rep| rep.phase == Phase::PumpScheduled));
    assert_eq!(r.ctrl.bank().commanded(Actuator::WaterValve), Some(false));
    assert_eq!(r.outputs.writes_for(Actuator::WaterValve), vec![false]);
    assert!(r.outputs.is_on(Actuator::WaterPump));
}

#[test]
fn fill_ending_on_top_full_returns_to_scheduled_circulation() {
    let mut r = rig();
    r.ctrl.resume_schedules(at(12, 0, 0));
    r.sensors.set_digital(Sensor::WaterLevelBottom, true);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 5);
    assert_eq!(reports[4].phase, Phase::Filling { since: at(12, 0, 25) });

    r.sensors
        .set_digital(Sensor::WaterLevelBottom, false)
        .set_digital(Sensor::WaterLevelTop, true);
    let full = r.ctrl.tick(at(12, 0, 30));
    assert_eq!(full.phase, Phase::Idle);
    assert_eq!(full.commanded(Actuator::WaterValve), Some(false));

    let after = run_ticks(&mut r.ctrl, at(12, 0, 30), 5);
    assert_eq!(after[3].phase, Phase::Idle);
    assert_eq!(after[4].phase, Phase::PumpScheduled);
    assert_eq!(after[4].commanded(Actuator::WaterPump), Some(true));
    assert!(after.iter().all(|rep| rep.commanded(Actuator::WaterValve).is_none()));
    assert_eq!(
        r.outputs.writes_for(Actuator::WaterValve),
        vec![false, true, false]
    );
    assert!(!r.outputs.is_on(Actuator::WaterValve));
}

#[test]
fn unrecovered_low_water_raises_alarm_until_acknowledged() {
    let mut r = rig();
    r.ctrl.resume_schedules(at(12, 0, 0));
    run_ticks(&mut r.ctrl, at(12, 0, 0), 5);
    assert!(r.outputs.is_on(Actuator::WaterPump));

    // One low reading, then the switch goes silent.
    r.sensors.fail(Sensor::WaterLevelBottom);
    r.sensors.queue_digital(Sensor::WaterLevelBottom, &[true]);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 25), 61);
    assert_eq!(reports[0].phase, Phase::LowWaterGrace { since: at(12, 0, 30) });
    assert_eq!(reports[0].commanded(Actuator::WaterPump), None);
    assert!(matches!(reports[59].phase, Phase::LowWaterGrace { .. }));
    assert_eq!(r.outputs.writes_for(Actuator::WaterValve), vec![false]);
    assert_eq!(reports[59].read_errors, 1);

    let expired = &reports[60];
    assert_eq!(expired.at, at(12, 5, 30));
    assert_eq!(expired.phase, Phase::Idle);
    assert_eq!(expired.commanded(Actuator::WaterPump), Some(false));
    assert_eq!(expired.commanded(Actuator::Buzzer), Some(true));
    assert!(r.ctrl.state().circulation.low_water_alarm);

    r.sensors.set_digital(Sensor::Button, true);
    let ack = r.ctrl.tick(at(12, 5, 35));
    assert_eq!(ack.commanded(Actuator::Buzzer), Some(false));
    assert!(r.ctrl.state().indicators.acknowledged);

    r.sensors
        .set_digital(Sensor::Button, false)
        .set_digital(Sensor::WaterLevelBottom, false);
    let recovered = run_ticks(&mut r.ctrl, at(12, 5, 35), 5);
    assert!(!r.ctrl.state().circulation.low_water_alarm);
    assert!(!r.ctrl.state().indicators.acknowledged);
    assert_eq!(recovered[4].phase, Phase::PumpScheduled);
    assert!(r.outputs.is_on(Actuator::WaterPump));
    assert!(!r.outputs.is_on(Actuator::Buzzer));
}

#[test]
fn light_follows_schedule_edges() {
    let mut r = rig();
    let rep = r.ctrl.tick(at(5, 54, 59));
    assert_eq!(rep.commanded(Actuator::Light), Some(false));
    let rep = r.ctrl.tick(at(5, 56, 0));
    assert_eq!(rep.commanded(Actuator::Light), Some(true));
    assert_eq!(r.ctrl.tick(at(12, 0, 0)).commanded(Actuator::Light), None);
    let rep = r.ctrl.tick(at(18, 3, 0));
    assert_eq!(rep.commanded(Actuator::Light), Some(false));
    assert_eq!(r.ctrl.tick(at(18, 6, 0)).commanded(Actuator::Light), None);
}

#[test]
fn startup_inside_light_period_turns_light_on() {
    let mut r = rig();
    r.ctrl.resume_schedules(at(9, 30, 0));
    let rep = r.ctrl.tick(at(9, 30, 5));
    assert_eq!(rep.commanded(Actuator::Light), Some(true));
}

#[test]
fn failed_reads_are_counted_and_other_policies_still_run() {
    let mut r = rig();
    r.ctrl.resume_schedules(at(12, 0, 0));
    r.sensors.fail(Sensor::Ph).fail(Sensor::AirHumidity);
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 12);
    assert!(reports.iter().all(|rep| rep.doses_started.is_empty()));
    assert_eq!(reports[0].read_errors, 1);
    assert_eq!(reports[11].read_errors, 2);
    assert_eq!(reports[11].avg_air_temp, None);
    assert!(r.outputs.is_on(Actuator::WaterPump));
    assert!(r.outputs.is_on(Actuator::GreenLed));
}

#[test]
fn outputs_are_written_only_on_change() {
    let mut r = rig();
    let reports = run_ticks(&mut r.ctrl, at(12, 0, 0), 20);
    assert!(!reports[0].commands.is_empty());
    assert!(reports[10..].iter().all(|rep| rep.commands.is_empty()));
    assert_eq!(r.outputs.writes_for(Actuator::GreenLed), vec![true]);
    assert_eq!(r.ctrl.state().ticks, 20);
}

#[test]
fn shutdown_forces_dosing_pumps_and_running_led_off() {
    let mut r = rig();
    run_ticks(&mut r.ctrl, at(12, 0, 0), 2);
    r.outputs.clear();
    r.ctrl.shutdown().unwrap();
    let writes = r.outputs.writes();
    for pump in Actuator::DOSING_PUMPS {
        assert!(writes.contains(&(pump, false)), "{pump} not forced off");
    }
    assert!(writes.contains(&(Actuator::GreenLed, false)));
    assert_eq!(r.clock.elapsed(), std::time::Duration::ZERO);
}
