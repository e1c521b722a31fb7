// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root: builds the connection, event bus and session cache
//! from one [`Config`].

use std::sync::Arc;

use crate::cache::{EventBus, HttpSessionApi, Notifier, SessionCache};
use crate::config::Config;
use crate::error::Result;
use crate::sync::ConnectionManager;

/// Everything a command needs, wired together.
pub struct App {
    pub config: Config,
    pub connection: ConnectionManager,
    pub bus: Arc<EventBus>,
    pub cache: SessionCache<HttpSessionApi>,
}

impl App {
    /// Wires the services. Does not open the push connection.
    pub fn from_config(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let connection = ConnectionManager::new(config.connection.to_connection_config());
        let bus = Arc::new(EventBus::new());
        let api = HttpSessionApi::new(
            config.api.base_url.clone(),
            config.api.token.clone(),
            config.api.timeout(),
        )?;
        let cache = SessionCache::new(api, Arc::clone(&bus), notifier);
        if let Some(user) = &config.user {
            cache.set_user(user.clone());
        }

        Ok(App {
            config,
            connection,
            bus,
            cache,
        })
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
