//! Campaign playback control

use tracing::info;

use signage_common::{CampaignStatus, CampaignUpdate, Settings};

use crate::client::{ApiResponse, Transport};
use crate::error::E2eResult;

pub struct Campaign<T: Transport> {
    transport: T,
    platform_id: i64,
}

impl<T: Transport> Campaign<T> {
    pub fn new(transport: T, settings: &Settings) -> Self {
        Self {
            transport,
            platform_id: settings.platform_id,
        }
    }

    fn campaign_path(&self, campaign_id: i64) -> String {
        format!("/platforms/{}/campaign/{}", self.platform_id, campaign_id)
    }

    /// Send a partial update for a campaign
    pub fn put_campaign(&self, campaign_id: i64, update: &CampaignUpdate) -> E2eResult<ApiResponse> {
        let payload = serde_json::to_value(update)?;
        self.transport.put(&self.campaign_path(campaign_id), &payload)
    }

    fn set_status(&self, campaign_id: i64, status: CampaignStatus, verb: &str) -> E2eResult<ApiResponse> {
        info!("Setting campaign {} to {:?}", campaign_id, status);
        let update = CampaignUpdate { status: Some(status) };
        self.put_campaign(campaign_id, &update)?
            .require_success(format!("could not {} campaign {}", verb, campaign_id))
    }

    pub fn play_campaign(&self, campaign_id: i64) -> E2eResult<ApiResponse> {
        self.set_status(campaign_id, CampaignStatus::Playing, "play")
    }

    pub fn pause_campaign(&self, campaign_id: i64) -> E2eResult<ApiResponse> {
        self.set_status(campaign_id, CampaignStatus::Paused, "pause")
    }
}
