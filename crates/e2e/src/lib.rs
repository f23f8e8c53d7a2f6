//! Signage E2E Verification
//!
//! Drives digital-signage players through the platform API and checks what
//! they put on screen:
//! - Authenticates with the multi-step login flow
//! - Sends remote-control commands and polls devices until they converge
//! - Requests screenshots and waits for the device to publish a fresh one
//! - Compares captured frames with reference images via HSV histograms
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TestRunner                             │
//! │    ├── screenshot           (Device::retrieve_screenshot)   │
//! │    ├── escape_and_continue  (Device::wait_for_status)       │
//! │    └── content              (Campaign + ImageComparator)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Device / Campaign / MultistepAuth                          │
//! │    └── Transport (HttpTransport: reqwest + cookie session)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Poller            fixed-interval wait with deadline        │
//! │  ImageComparator   640x360, H-S histogram, correlation      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod campaign;
pub mod client;
pub mod device;
pub mod error;
pub mod harness;
pub mod runner;
pub mod visual;
pub mod wait;

pub use auth::MultistepAuth;
pub use campaign::Campaign;
pub use client::{ApiResponse, HttpTransport, Transport};
pub use device::Device;
pub use error::{E2eError, E2eResult};
pub use runner::{RunnerConfig, Scenario, TestRunner};
pub use visual::ImageComparator;
pub use wait::Poller;
