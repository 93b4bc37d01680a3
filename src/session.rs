use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::anyhow;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info, warn};
use thiserror::Error;

use crate::{config::SessionConfig, site::Site};

/// The automation session is unusable; nothing else in the run can proceed.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to start the browser: {0:#}")]
    Launch(#[source] anyhow::Error),
    #[error("The browser stopped responding: {0:#}")]
    Crashed(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to load {url}: {source:#}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("{selector:?} did not appear on {url} within {timeout:?}: {source:#}")]
    NotReady {
        url: String,
        selector: String,
        timeout: Duration,
        #[source]
        source: anyhow::Error,
    },
    #[error("No saved page for {site} at {path:?}: {source}")]
    NoSavedPage {
        site: Site,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Hands out rendered documents, one site at a time.
pub trait DocumentSource {
    /// Loads the page of `site` and waits until its ready selector is present.
    /// Returns the rendered markup.
    fn load(&mut self, site: Site) -> Result<String, LoadError>;

    /// Releases whatever the source holds.
    fn close(self) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Runs `body` with `source` and closes the source afterwards, whatever the
/// outcome of `body` was.
pub fn with_session<S, T, E>(
    mut source: S,
    body: impl FnOnce(&mut S) -> Result<T, E>,
) -> Result<T, E>
where
    S: DocumentSource,
{
    let res = body(&mut source);
    if let Err(e) = source.close() {
        warn!("Failed to close the session: {e:#}");
    }
    res
}

pub struct BrowserSession {
    browser: Browser,
    tab: Arc<Tab>,
    element_timeout: Duration,
}

impl BrowserSession {
    pub fn launch(config: &SessionConfig) -> Result<Self, SessionError> {
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some(config.window_size))
            .idle_browser_timeout(Duration::from_secs(
                config.page_load_timeout_secs + config.element_timeout_secs,
            ))
            .build()
            .map_err(|e| SessionError::Launch(anyhow!("{e}")))?;
        let browser = Browser::new(options).map_err(SessionError::Launch)?;
        let tab = browser.new_tab().map_err(SessionError::Launch)?;
        tab.set_default_timeout(Duration::from_secs(config.page_load_timeout_secs));
        info!("Browser session started.");
        Ok(Self {
            browser,
            tab,
            element_timeout: Duration::from_secs(config.element_timeout_secs),
        })
    }

    /// A failed navigation may mean the browser itself is gone.
    fn check_alive(&self) -> Result<(), SessionError> {
        self.browser
            .get_version()
            .map(|_| ())
            .map_err(SessionError::Crashed)
    }
}

impl DocumentSource for BrowserSession {
    fn load(&mut self, site: Site) -> Result<String, LoadError> {
        let url = site.url();
        debug!("Navigating to {url}");
        if let Err(source) = self
            .tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
        {
            self.check_alive()?;
            return Err(LoadError::Navigation {
                url: url.to_owned(),
                source,
            });
        }
        let selector = site.ready_selector();
        if let Err(source) = self
            .tab
            .wait_for_element_with_custom_timeout(selector, self.element_timeout)
        {
            self.check_alive()?;
            return Err(LoadError::NotReady {
                url: url.to_owned(),
                selector: selector.to_owned(),
                timeout: self.element_timeout,
                source,
            });
        }
        match self.tab.get_content() {
            Ok(content) => Ok(content),
            Err(source) => {
                self.check_alive()?;
                Err(LoadError::Navigation {
                    url: url.to_owned(),
                    source,
                })
            }
        }
    }

    fn close(self) -> anyhow::Result<()> {
        self.tab.close(true)?;
        drop(self.browser);
        info!("Browser session closed.");
        Ok(())
    }
}

/// Pages saved earlier as `<dir>/<site>.html`, for offline runs.
pub struct SavedPages {
    dir: PathBuf,
}

impl SavedPages {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(dir: &Path, site: Site) -> PathBuf {
        dir.join(format!("{site}.html"))
    }
}

impl DocumentSource for SavedPages {
    fn load(&mut self, site: Site) -> Result<String, LoadError> {
        let path = Self::path_of(&self.dir, site);
        debug!("Reading saved page {path:?}");
        fs_err::read_to_string(&path).map_err(|source| LoadError::NoSavedPage {
            site,
            path,
            source,
        })
    }
}

/// In-memory pages keyed by site.
#[derive(Default)]
pub struct StaticPages {
    pages: HashMap<Site, String>,
}

impl StaticPages {
    pub fn with_page(mut self, site: Site, html: impl Into<String>) -> Self {
        self.pages.insert(site, html.into());
        self
    }
}

impl DocumentSource for StaticPages {
    fn load(&mut self, site: Site) -> Result<String, LoadError> {
        self.pages
            .get(&site)
            .cloned()
            .ok_or_else(|| LoadError::Navigation {
                url: site.url().to_owned(),
                source: anyhow!("Page is not available"),
            })
    }
}
