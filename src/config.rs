use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;

use crate::{rule::RuleOptions, site::Site};

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Every run creates its own directory under here.
    pub output_root: PathBuf,
    pub session: SessionConfig,
    pub sites: HashMap<Site, RuleOptions>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            session: SessionConfig::default(),
            sites: HashMap::new(),
        }
    }
}
impl Config {
    pub fn rule_options(&self, site: Site) -> RuleOptions {
        self.sites.get(&site).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub headless: bool,
    pub page_load_timeout_secs: u64,
    pub element_timeout_secs: u64,
    pub window_size: (u32, u32),
}
impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            page_load_timeout_secs: 60,
            element_timeout_secs: 20,
            window_size: (1920, 1080),
        }
    }
}
