//! Device management: state, remote commands and screenshots

use std::time::Duration;
use serde_json::Value;
use tracing::{debug, info};

use signage_common::{
    Action, ActionCommand, ActionEvent, Degree, DeviceInfo, DeviceStatus, DeviceUpdate,
    ScreenshotInfo, Settings,
};

use crate::client::{ApiResponse, Transport};
use crate::error::E2eResult;
use crate::wait::Poller;

/// Default time a device gets to reach a requested status
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(120);

/// Default time a device gets to publish a requested screenshot
pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(30);

/// Device API bound to one platform
pub struct Device<T: Transport> {
    transport: T,
    platform_id: i64,
    polling_interval: Duration,
    status_timeout: Duration,
    screenshot_timeout: Duration,
}

impl<T: Transport> Device<T> {
    pub fn new(transport: T, settings: &Settings) -> Self {
        Self {
            transport,
            platform_id: settings.platform_id,
            polling_interval: settings.polling_interval(),
            status_timeout: STATUS_TIMEOUT,
            screenshot_timeout: SCREENSHOT_TIMEOUT,
        }
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    pub fn with_screenshot_timeout(mut self, timeout: Duration) -> Self {
        self.screenshot_timeout = timeout;
        self
    }

    fn device_path(&self, device_id: i64) -> String {
        format!("/platforms/{}/devices/{}", self.platform_id, device_id)
    }

    fn screenshot_path(&self) -> String {
        format!("/platforms/{}/devices/screenshot", self.platform_id)
    }

    /// Fetch the full device record
    pub fn get_device(&self, device_id: i64) -> E2eResult<DeviceInfo> {
        let response = self
            .transport
            .get(&self.device_path(device_id), &[])?
            .require_success(format!("could not get device {} info", device_id))?;
        response.json()
    }

    /// Send a partial update for a device
    pub fn put_device(&self, device_id: i64, update: &DeviceUpdate) -> E2eResult<ApiResponse> {
        let payload = serde_json::to_value(update)?;
        self.transport.put(&self.device_path(device_id), &payload)
    }

    pub fn get_status(&self, device_id: i64) -> E2eResult<DeviceStatus> {
        let status = self.get_device(device_id)?.status();
        debug!("Device {} is {}", device_id, status);
        Ok(status)
    }

    /// Poll the device until it reports `expected`
    pub fn wait_for_status(&self, device_id: i64, expected: DeviceStatus) -> E2eResult<bool> {
        let poller = Poller::new(self.status_timeout, self.polling_interval);
        poller.until_true(&format!("device {} is {}", device_id, expected), || {
            Ok(self.get_status(device_id)? == expected)
        })
    }

    /// Descriptor of the latest screenshot the device published
    pub fn screenshot_info(&self, device_id: i64) -> E2eResult<ScreenshotInfo> {
        let response = self
            .transport
            .get(&self.screenshot_path(), &[("device_id", device_id.to_string())])?
            .require_success(format!("could not get screenshot info for device {}", device_id))?;
        response.json()
    }

    /// `Some(info)` once the device published a screenshot newer than `ts`
    pub fn check_new_screenshot(&self, device_id: i64, ts: i64) -> E2eResult<Option<ScreenshotInfo>> {
        let info = self.screenshot_info(device_id)?;
        if info.ts > ts {
            Ok(Some(info))
        } else {
            debug!("Screenshot of device {} still at ts {} (want > {})", device_id, info.ts, ts);
            Ok(None)
        }
    }

    /// Request a fresh screenshot and download it once the device published it
    pub fn retrieve_screenshot(&self, device_id: i64) -> E2eResult<Vec<u8>> {
        let previous_ts = self.screenshot_info(device_id)?.ts;

        let payload = serde_json::json!({ "device_id": device_id });
        self.transport
            .post(&self.screenshot_path(), Some(&payload))?
            .require_success(format!(
                "problem occurred with screenshot request from device {}",
                device_id
            ))?;

        let poller = Poller::new(self.screenshot_timeout, self.polling_interval);
        let info = poller.until(
            &format!("updated screenshot info for device {}", device_id),
            || self.check_new_screenshot(device_id, previous_ts),
        )?;

        info!("Downloading screenshot of device {} (ts {})", device_id, info.ts);
        self.transport.download(&info.file)
    }

    fn send_command(&self, device_id: i64, action: Action, label: &str) -> E2eResult<ApiResponse> {
        info!("Sending '{}' to device {}", label, device_id);
        self.put_device(device_id, &DeviceUpdate::command(action))?
            .require_success(format!(
                "could not execute \"{}\" command for device {}",
                label, device_id
            ))
    }

    pub fn escape_playback(&self, device_id: i64) -> E2eResult<ApiResponse> {
        let action = Action::new(ActionCommand::Escape, ActionEvent::Command);
        self.send_command(device_id, action, "escape")
    }

    pub fn continue_playback(&self, device_id: i64) -> E2eResult<ApiResponse> {
        let action = Action::new(ActionCommand::Continue, ActionEvent::Command);
        self.send_command(device_id, action, "continue")
    }

    pub fn restart_player(&self, device_id: i64) -> E2eResult<ApiResponse> {
        let action = Action::new(ActionCommand::Restart, ActionEvent::Command);
        self.send_command(device_id, action, "restart")
    }

    pub fn reboot_device(&self, device_id: i64) -> E2eResult<ApiResponse> {
        let action = Action::new(ActionCommand::Reboot, ActionEvent::Command);
        self.send_command(device_id, action, "reboot")
    }

    pub fn update_player(&self, device_id: i64) -> E2eResult<ApiResponse> {
        let action = Action::new(ActionCommand::None, ActionEvent::Update);
        self.send_command(device_id, action, "update")
    }

    pub fn rotate_screen(&self, device_id: i64, degrees: Degree) -> E2eResult<ApiResponse> {
        let action = Action::new(ActionCommand::RotateScreen, ActionEvent::None)
            .with_params(vec![Value::from(u16::from(degrees))]);
        self.send_command(device_id, action, "rotate screen")
    }
}
