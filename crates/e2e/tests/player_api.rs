//! Device, campaign and login flows against a scripted platform

mod support;

use std::time::Duration;

use serde_json::json;
use signage_common::{DeviceStatus, Degree, Settings, TestUser};
use signage_e2e::{ApiResponse, Campaign, Device, E2eError, MultistepAuth};
use support::ScriptedTransport;

const DEVICE_PATH: &str = "/platforms/17/devices/41";
const SCREENSHOT_PATH: &str = "/platforms/17/devices/screenshot";
const SHOT_URL: &str = "https://cdn.signage.example/shots/41.jpg";

fn settings() -> Settings {
    Settings {
        server_name: "signage.example".into(),
        platform_id: 17,
        ..Default::default()
    }
}

fn device<'a>(transport: &'a ScriptedTransport, settings: &Settings) -> Device<&'a ScriptedTransport> {
    Device::new(transport, settings)
        .with_polling_interval(Duration::from_millis(5))
        .with_screenshot_timeout(Duration::from_millis(200))
        .with_status_timeout(Duration::from_millis(200))
}

fn shot(ts: i64) -> serde_json::Value {
    json!({ "file": SHOT_URL, "ts": ts })
}

fn device_record(status: &str) -> serde_json::Value {
    json!({
        "id": 41,
        "name": "lobby",
        "player_metrics": { "status": status, "project_id": 1, "campaign_id": 113 }
    })
}

#[test]
fn screenshot_waits_for_newer_timestamp() {
    let transport = ScriptedTransport::new();
    transport
        .ok_json("GET", SCREENSHOT_PATH, vec![shot(5), shot(5), shot(5), shot(8)])
        .ok_json("POST", SCREENSHOT_PATH, vec![json!({})])
        .file(SHOT_URL, vec![0xFF, 0xD8, 0xFF, 0xD9]);
    let settings = settings();

    let raw = device(&transport, &settings).retrieve_screenshot(41).unwrap();

    assert_eq!(raw, vec![0xFF, 0xD8, 0xFF, 0xD9]);
    // one read for the baseline, three predicate evaluations
    assert_eq!(transport.count("GET", SCREENSHOT_PATH), 4);
    assert_eq!(transport.count("DOWNLOAD", SHOT_URL), 1);

    let request = &transport.calls("POST", SCREENSHOT_PATH)[0];
    assert_eq!(request.body, Some(json!({ "device_id": 41 })));
}

#[test]
fn screenshot_times_out_on_stale_timestamp() {
    let transport = ScriptedTransport::new();
    transport
        .ok_json("GET", SCREENSHOT_PATH, vec![shot(5), shot(4), shot(5)])
        .ok_json("POST", SCREENSHOT_PATH, vec![json!({})]);
    let settings = settings();

    let err = device(&transport, &settings)
        .with_screenshot_timeout(Duration::from_millis(40))
        .retrieve_screenshot(41)
        .unwrap_err();

    assert!(matches!(err, E2eError::Timeout { .. }), "got {err}");
    assert_eq!(transport.count("DOWNLOAD", SHOT_URL), 0);
}

#[test]
fn screenshot_without_previous_capture_starts_from_zero() {
    let transport = ScriptedTransport::new();
    transport
        .ok_json("GET", SCREENSHOT_PATH, vec![json!({}), shot(1)])
        .ok_json("POST", SCREENSHOT_PATH, vec![json!({})])
        .file(SHOT_URL, vec![1, 2, 3]);
    let settings = settings();

    let raw = device(&transport, &settings).retrieve_screenshot(41).unwrap();
    assert_eq!(raw, vec![1, 2, 3]);
}

#[test]
fn screenshot_request_rejected() {
    let transport = ScriptedTransport::new();
    transport
        .ok_json("GET", SCREENSHOT_PATH, vec![shot(5)])
        .on("POST", SCREENSHOT_PATH, vec![ApiResponse::new(500, "{}")]);
    let settings = settings();

    let err = device(&transport, &settings).retrieve_screenshot(41).unwrap_err();
    assert!(matches!(err, E2eError::UnexpectedResponse { status: 500, .. }));
    assert_eq!(transport.count("GET", SCREENSHOT_PATH), 1);
}

#[test]
fn wait_for_status_converges() {
    let transport = ScriptedTransport::new();
    transport.ok_json(
        "GET",
        DEVICE_PATH,
        vec![device_record("pause"), device_record("pause"), device_record("playback")],
    );
    let settings = settings();

    let reached = device(&transport, &settings)
        .wait_for_status(41, DeviceStatus::Playback)
        .unwrap();

    assert!(reached);
    assert_eq!(transport.count("GET", DEVICE_PATH), 3);
}

#[test]
fn wait_for_status_times_out() {
    let transport = ScriptedTransport::new();
    transport.ok_json("GET", DEVICE_PATH, vec![device_record("offline")]);
    let settings = settings();

    let err = device(&transport, &settings)
        .with_status_timeout(Duration::from_millis(30))
        .wait_for_status(41, DeviceStatus::Playback)
        .unwrap_err();

    match err {
        E2eError::Timeout { what, .. } => assert_eq!(what, "device 41 is playback"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn status_only_record_is_enough() {
    let transport = ScriptedTransport::new();
    let status_only = |status: &str| json!({ "player_metrics": { "status": status } });
    transport.ok_json("GET", DEVICE_PATH, vec![status_only("pause"), status_only("playback")]);
    let settings = settings();
    let device = device(&transport, &settings);

    assert_eq!(device.get_status(41).unwrap(), DeviceStatus::Pause);
    assert!(device.wait_for_status(41, DeviceStatus::Playback).unwrap());
    assert_eq!(transport.count("GET", DEVICE_PATH), 2);
}

#[test]
fn get_status_requires_success() {
    let transport = ScriptedTransport::new();
    transport.on("GET", DEVICE_PATH, vec![ApiResponse::new(403, "{}")]);
    let settings = settings();

    let err = device(&transport, &settings).get_status(41).unwrap_err();
    assert!(matches!(err, E2eError::UnexpectedResponse { status: 403, .. }));
}

#[test]
fn escape_sends_command_payload() {
    let transport = ScriptedTransport::new();
    transport.ok_json("PUT", DEVICE_PATH, vec![json!({})]);
    let settings = settings();

    device(&transport, &settings).escape_playback(41).unwrap();

    let body = transport.calls("PUT", DEVICE_PATH)[0].body.clone().unwrap();
    assert_eq!(
        body,
        json!({
            "commands": [{
                "action": { "command": "escape", "event": "command", "params": [], "type": "system" }
            }]
        })
    );
}

#[test]
fn rotate_and_update_payloads() {
    let transport = ScriptedTransport::new();
    transport.ok_json("PUT", DEVICE_PATH, vec![json!({})]);
    let settings = settings();
    let device = device(&transport, &settings);

    device.rotate_screen(41, Degree::Deg180).unwrap();
    device.update_player(41).unwrap();

    let calls = transport.calls("PUT", DEVICE_PATH);
    let rotate = &calls[0].body.as_ref().unwrap()["commands"][0]["action"];
    assert_eq!(rotate["command"], "rotateMainScreen");
    assert_eq!(rotate["params"], json!([180]));

    let update = &calls[1].body.as_ref().unwrap()["commands"][0]["action"];
    assert_eq!(update["command"], "");
    assert_eq!(update["event"], "update");
}

#[test]
fn rejected_command_is_unexpected_response() {
    let transport = ScriptedTransport::new();
    transport.on("PUT", DEVICE_PATH, vec![ApiResponse::new(409, "{}")]);
    let settings = settings();

    let err = device(&transport, &settings).reboot_device(41).unwrap_err();
    match err {
        E2eError::UnexpectedResponse { context, status } => {
            assert_eq!(status, 409);
            assert!(context.contains("reboot"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn campaign_play_and_pause() {
    let transport = ScriptedTransport::new();
    transport.ok_json("PUT", "/platforms/17/campaign/113", vec![json!({})]);
    let settings = settings();
    let campaign = Campaign::new(&transport, &settings);

    campaign.play_campaign(113).unwrap();
    campaign.pause_campaign(113).unwrap();

    let calls = transport.calls("PUT", "/platforms/17/campaign/113");
    assert_eq!(calls[0].body, Some(json!({ "status": "playing" })));
    assert_eq!(calls[1].body, Some(json!({ "status": "paused" })));
}

#[test]
fn multistep_login_sequence() {
    let transport = ScriptedTransport::new();
    transport
        .ok_json("POST", "/auth/login/multi_step/start", vec![json!({ "session_id": "abc" })])
        .ok_json("POST", "/auth/login/multi_step/check_login", vec![json!({})])
        .ok_json("POST", "/auth/login/multi_step/commit_pwd", vec![json!({})])
        .ok_json("POST", "/auth/login/multi_step/finish", vec![json!({})]);

    let mut auth = MultistepAuth::new(&transport);
    let user = TestUser {
        email: "qa@example.com".into(),
        password: "secret".into(),
    };
    auth.login(&user).unwrap();
    assert_eq!(auth.session_id(), Some("abc"));

    let check = &transport.calls("POST", "/auth/login/multi_step/check_login")[0];
    assert_eq!(check.body, Some(json!({ "session_id": "abc", "login": "qa@example.com" })));
    let commit = &transport.calls("POST", "/auth/login/multi_step/commit_pwd")[0];
    assert_eq!(commit.body, Some(json!({ "session_id": "abc", "password": "secret" })));
    assert_eq!(transport.count("POST", "/auth/login/multi_step/finish"), 1);
}

#[test]
fn login_steps_need_a_session() {
    let transport = ScriptedTransport::new();
    let auth = MultistepAuth::new(&transport);

    assert!(matches!(auth.check_login("qa@example.com"), Err(E2eError::Auth(_))));
    assert_eq!(transport.count("POST", "/auth/login/multi_step/check_login"), 0);
}

#[test]
fn rejected_password_stops_login() {
    let transport = ScriptedTransport::new();
    transport
        .ok_json("POST", "/auth/login/multi_step/start", vec![json!({ "session_id": "abc" })])
        .ok_json("POST", "/auth/login/multi_step/check_login", vec![json!({})])
        .on("POST", "/auth/login/multi_step/commit_pwd", vec![ApiResponse::new(401, "{}")]);

    let mut auth = MultistepAuth::new(&transport);
    let user = TestUser {
        email: "qa@example.com".into(),
        password: "wrong".into(),
    };

    assert!(matches!(auth.login(&user), Err(E2eError::UnexpectedResponse { status: 401, .. })));
    assert_eq!(transport.count("POST", "/auth/login/multi_step/finish"), 0);
}
