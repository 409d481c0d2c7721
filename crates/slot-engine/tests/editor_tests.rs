//! Tests for parsing, validating, rendering and saving schedule edits.

mod common;

use std::sync::Arc;

use chrono::{NaiveTime, Weekday};
use common::{nine_to_five, utc, MemoryProviders};
use slot_engine::editor::{format_local_time, parse_local_time, DayEntryForm, WindowForm};
use slot_engine::schedule::TimeWindow;
use slot_engine::{
    parse_and_validate, render, EngineError, ScheduleEditor, ScheduleForm, ScheduleLimits,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn entry(day: &str, available: bool, windows: &[(&str, i64)]) -> DayEntryForm {
    DayEntryForm {
        weekday: Some(day.to_string()),
        available: Some(available),
        windows: windows
            .iter()
            .map(|(start, minutes)| WindowForm {
                start_local_time: Some(start.to_string()),
                duration_minutes: Some(*minutes),
            })
            .collect(),
    }
}

/// Monday to Friday from 9:00 AM for eight hours, in canonical form.
fn week() -> Vec<DayEntryForm> {
    vec![
        entry("Monday", true, &[("9:00 AM", 480)]),
        entry("Tuesday", true, &[("9:00 AM", 480)]),
        entry("Wednesday", true, &[("9:00 AM", 480)]),
        entry("Thursday", true, &[("9:00 AM", 480)]),
        entry("Friday", true, &[("9:00 AM", 480)]),
        entry("Saturday", false, &[]),
        entry("Sunday", false, &[]),
    ]
}

fn now() -> chrono::DateTime<chrono::Utc> {
    utc(2026, 3, 16, 12, 0)
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn invalid_days(err: EngineError) -> Vec<usize> {
    match err {
        EngineError::InvalidDays(days) => days,
        other => panic!("expected InvalidDays, got {other:?}"),
    }
}

// ── Time strings ────────────────────────────────────────────────────────────

#[test]
fn local_times_parse_in_several_layouts() {
    assert_eq!(parse_local_time("9:00 AM"), Some(time(9, 0)));
    assert_eq!(parse_local_time("09:30 pm"), Some(time(21, 30)));
    assert_eq!(parse_local_time("12:15AM"), Some(time(0, 15)));
    assert_eq!(parse_local_time("13:45"), Some(time(13, 45)));
    assert_eq!(parse_local_time("noon"), None);
}

#[test]
fn local_times_format_without_padding() {
    assert_eq!(format_local_time(time(9, 0)), "9:00 AM");
    assert_eq!(format_local_time(time(0, 5)), "12:05 AM");
    assert_eq!(format_local_time(time(17, 30)), "5:30 PM");
}

// ── Parse and validate ──────────────────────────────────────────────────────

#[test]
fn canonical_week_parses() {
    let schedule = parse_and_validate(&ScheduleForm(week()), now(), "UTC").unwrap();

    assert_eq!(
        schedule.day(Weekday::Mon).windows,
        vec![TimeWindow::new(time(9, 0), 480)]
    );
    assert!(schedule.is_unavailable(Weekday::Sat));
}

#[test]
fn available_monday_without_windows_is_reported_at_index_zero() {
    let mut days = week();
    days[0].windows.clear();

    let err = parse_and_validate(&ScheduleForm(days), now(), "UTC").unwrap_err();

    assert_eq!(invalid_days(err), vec![0]);
}

#[test]
fn overlapping_windows_are_reported() {
    let mut days = week();
    days[1] = entry("Tuesday", true, &[("10:00 AM", 60), ("9:00 AM", 120)]);

    let err = parse_and_validate(&ScheduleForm(days), now(), "UTC").unwrap_err();

    assert_eq!(invalid_days(err), vec![1]);
}

#[test]
fn every_failing_entry_is_reported() {
    let mut days = week();
    days[0].available = None;
    days[3] = entry("Thursday", true, &[("9:00 AM", 5)]);
    days[4] = entry("Friday", true, &[("8:00", 60), ("10:00", 60), ("12:00", 60), ("14:00", 60)]);

    let err = parse_and_validate(&ScheduleForm(days), now(), "UTC").unwrap_err();

    assert_eq!(invalid_days(err), vec![0, 3, 4]);
}

#[test]
fn unparseable_fields_invalidate_their_entry() {
    let mut days = week();
    days[2].weekday = Some("Funday".to_string());
    days[5] = entry("Saturday", true, &[("quarter past", 60)]);
    days[6] = entry("Sunday", true, &[("9:00 AM", -30)]);

    let err = parse_and_validate(&ScheduleForm(days), now(), "UTC").unwrap_err();

    assert_eq!(invalid_days(err), vec![2, 5, 6]);
}

#[test]
fn duplicate_weekday_is_reported() {
    let mut days = week();
    days[6] = entry("Monday", false, &[]);

    let err = parse_and_validate(&ScheduleForm(days), now(), "UTC").unwrap_err();

    assert_eq!(invalid_days(err), vec![6]);
}

#[test]
fn spill_over_is_reported_at_the_callers_index() {
    let mut days = week();
    days[4] = entry("Friday", true, &[("10:00 PM", 240)]);
    days[5] = entry("Saturday", true, &[("1:00 AM", 60)]);
    days.reverse();

    // Reversed: Sunday, Saturday, Friday, ...
    let err = parse_and_validate(&ScheduleForm(days), now(), "UTC").unwrap_err();

    assert_eq!(invalid_days(err), vec![1]);
}

#[test]
fn wrong_number_of_entries_is_malformed() {
    let mut days = week();
    days.pop();

    let err = parse_and_validate(&ScheduleForm(days), now(), "UTC").unwrap_err();

    assert!(matches!(err, EngineError::MalformedInput(_)));
}

#[test]
fn unknown_time_zone_is_fatal() {
    let mut days = week();
    days[0].windows.clear();

    let err = parse_and_validate(&ScheduleForm(days), now(), "Europe/Atlantis").unwrap_err();

    assert!(matches!(err, EngineError::InvalidTimezone(_)));
}

#[test]
fn custom_limits_apply() {
    let limits = ScheduleLimits {
        max_window_minutes: 240,
        ..ScheduleLimits::default()
    };

    let err = slot_engine::editor::parse_and_validate_with(&ScheduleForm(week()), now(), "UTC", &limits)
        .unwrap_err();

    assert_eq!(invalid_days(err), vec![0, 1, 2, 3, 4]);
}

// ── JSON forms ──────────────────────────────────────────────────────────────

#[test]
fn legacy_field_names_are_accepted() {
    let json = r#"[
        {"day": "Monday", "availability": true, "working_hours": [{"from": "9:00 AM", "duration": 480}]},
        {"day": "Tuesday", "availability": false},
        {"day": "Wednesday", "availability": false},
        {"day": "Thursday", "availability": false},
        {"day": "Friday", "availability": false},
        {"day": "Saturday", "availability": false},
        {"day": "Sunday", "availability": false}
    ]"#;

    let form = ScheduleForm::from_json(json).unwrap();
    let schedule = parse_and_validate(&form, now(), "UTC").unwrap();

    assert_eq!(
        schedule.day(Weekday::Mon).windows,
        vec![TimeWindow::new(time(9, 0), 480)]
    );
    assert!(schedule.is_unavailable(Weekday::Tue));
}

#[test]
fn form_that_is_not_a_list_is_malformed() {
    let err = ScheduleForm::from_json(r#"{"Monday": true}"#).unwrap_err();
    assert!(matches!(err, EngineError::MalformedInput(_)));
}

#[test]
fn render_produces_canonical_monday_first_form() {
    let mut days = week();
    days.rotate_left(3);
    let schedule = parse_and_validate(&ScheduleForm(days), now(), "UTC").unwrap();

    assert_eq!(render(&schedule), ScheduleForm(week()));

    let json = serde_json::to_value(render(&schedule)).unwrap();
    assert_eq!(json[0]["weekday"], "Monday");
    assert_eq!(json[0]["windows"][0]["startLocalTime"], "9:00 AM");
    assert_eq!(json[0]["windows"][0]["durationMinutes"], 480);
}

#[test]
fn render_prints_stored_wall_clock_times() {
    let schedule = parse_and_validate(&ScheduleForm(week()), now(), "UTC").unwrap();
    let karachi: chrono_tz::Tz = "Asia/Karachi".parse().unwrap();
    let adjusted = schedule.adjust(now(), chrono_tz::UTC, karachi).unwrap();

    let stored = serde_json::to_value(render(&schedule)).unwrap();
    let moved = serde_json::to_value(render(&adjusted)).unwrap();
    assert_eq!(stored[0]["windows"][0]["startLocalTime"], "9:00 AM");
    assert_eq!(moved[0]["windows"][0]["startLocalTime"], "2:00 PM");
}

// ── Editor ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_persists_then_replaces_schedule() {
    let store = Arc::new(MemoryProviders::new());
    let editor = ScheduleEditor::new(store.clone(), ScheduleLimits::default());
    let mut provider = nine_to_five();
    let mut days = week();
    days[5] = entry("Saturday", true, &[("10:00 AM", 120)]);

    editor
        .update_schedule(&mut provider, &ScheduleForm(days), now())
        .await
        .unwrap();

    assert_eq!(store.saved_schedules(), 1);
    assert_eq!(
        provider.schedule.day(Weekday::Sat).windows,
        vec![TimeWindow::new(time(10, 0), 120)]
    );
}

#[tokio::test]
async fn rejected_update_persists_nothing() {
    let store = Arc::new(MemoryProviders::new());
    let editor = ScheduleEditor::new(store.clone(), ScheduleLimits::default());
    let mut provider = nine_to_five();
    let before = provider.clone();
    let mut days = week();
    days[0].windows.clear();

    let err = editor
        .update_schedule(&mut provider, &ScheduleForm(days), now())
        .await
        .unwrap_err();

    assert_eq!(invalid_days(err), vec![0]);
    assert_eq!(store.saved_schedules(), 0);
    assert_eq!(provider, before);
}

#[tokio::test]
async fn store_failure_leaves_provider_untouched() {
    let editor = ScheduleEditor::new(Arc::new(MemoryProviders::failing()), ScheduleLimits::default());
    let mut provider = nine_to_five();
    let before = provider.clone();
    let mut days = week();
    days[5] = entry("Saturday", true, &[("10:00 AM", 120)]);

    let err = editor
        .update_schedule(&mut provider, &ScheduleForm(days), now())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Store(_)));
    assert_eq!(provider, before);
}

#[tokio::test]
async fn change_time_zone_shifts_windows_and_zone() {
    let store = Arc::new(MemoryProviders::new());
    let editor = ScheduleEditor::new(store.clone(), ScheduleLimits::default());
    let mut provider = nine_to_five();

    editor
        .change_time_zone(&mut provider, "Asia/Karachi", now())
        .await
        .unwrap();

    assert_eq!(provider.time_zone.name(), "Asia/Karachi");
    assert_eq!(
        provider.schedule.day(Weekday::Mon).windows,
        vec![TimeWindow::new(time(14, 0), 480)]
    );
    assert_eq!(store.saved_schedules(), 1);
}

#[tokio::test]
async fn change_to_unknown_zone_is_rejected() {
    let store = Arc::new(MemoryProviders::new());
    let editor = ScheduleEditor::new(store.clone(), ScheduleLimits::default());
    let mut provider = nine_to_five();
    let before = provider.clone();

    let err = editor
        .change_time_zone(&mut provider, "Nowhere/Special", now())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidTimezone(_)));
    assert_eq!(provider, before);
    assert_eq!(store.saved_schedules(), 0);
}
