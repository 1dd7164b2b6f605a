use crate::{
    client::InfoPointClient,
    config::PortalConfig,
    requests::RequestClient,
    scheduler::{Coordinator, Schedule},
};

pub struct ScrapingContext {
    pub portal_config: PortalConfig,
    pub client: InfoPointClient<RequestClient>,
}

impl ScrapingContext {
    pub fn new(portal_config: PortalConfig) -> anyhow::Result<Self> {
        let client = InfoPointClient::connect(
            portal_config.credentials.clone(),
            &portal_config.transport,
        )?;
        Ok(ScrapingContext {
            portal_config,
            client,
        })
    }

    pub fn schedule(&self) -> Schedule {
        self.portal_config.schedule.clone()
    }

    pub fn into_coordinator(self) -> Coordinator<RequestClient> {
        let schedule = self.schedule();
        Coordinator::new(self.client, schedule)
    }
}
