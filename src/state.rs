use std::sync::Arc;

use crate::{
    cache::{Fetcher, HttpFetcher, SyncCache},
    config::AppConfig,
    services::{
        backend::{AddressApi, HttpBackend, OrderApi, ProfileApi},
        checkout::{CheckoutDeps, CheckoutSettings},
        payment::HostedPaymentWidget,
    },
    store::SessionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionRegistry>,
    pub addresses: Arc<dyn AddressApi>,
    pub orders: Arc<dyn OrderApi>,
    pub profiles: Arc<dyn ProfileApi>,
    pub widget: Arc<HostedPaymentWidget>,
    pub cache: Arc<SyncCache>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        addresses: Arc<dyn AddressApi>,
        orders: Arc<dyn OrderApi>,
        profiles: Arc<dyn ProfileApi>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let widget = Arc::new(HostedPaymentWidget::new());
        let deps = CheckoutDeps {
            addresses: addresses.clone(),
            orders: orders.clone(),
            widget: widget.clone(),
            settings: CheckoutSettings {
                currency: config.currency.clone(),
                payment_key_id: config.payment_key_id.clone(),
                backend_timeout: config.backend_timeout,
                payment_timeout: config.payment_timeout,
            },
        };

        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionRegistry::new(deps)),
            addresses,
            orders,
            profiles,
            widget,
            cache: Arc::new(SyncCache::new(fetcher)),
        }
    }

    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let backend = Arc::new(HttpBackend::new(&config.api_base, config.backend_timeout)?);
        let fetcher = Arc::new(HttpFetcher::new(&config.asset_origin, config.backend_timeout)?);
        Ok(Self::new(config, backend.clone(), backend.clone(), backend, fetcher))
    }
}
