use serde::Deserialize;
use strum::{Display, EnumString};

use crate::schema::Schema;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumString, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Site {
    Chevron,
    Woodside,
    Genkai,
    Sendai,
}

impl Site {
    pub fn url(self) -> &'static str {
        match self {
            Self::Chevron => {
                "https://australia.chevron.com/our-businesses/scheduled-maintenance-activity-notices"
            }
            Self::Woodside => {
                "https://www.woodside.com.au/sustainability/working-openly/facility-maintenance-information"
            }
            Self::Genkai => "http://www.kyuden.co.jp/php/nuclear/genkai/g_power.php",
            Self::Sendai => "http://www.kyuden.co.jp/php/nuclear/sendai/s_power.php",
        }
    }

    /// Selector whose presence means the page has been rendered.
    pub fn ready_selector(self) -> &'static str {
        match self {
            Self::Chevron => "h4",
            Self::Woodside => "table.table.k-table > tbody",
            Self::Genkai | Self::Sendai => "#lastupdate",
        }
    }
}

/// A fixed sequence of sites sharing one output table.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, EnumString, clap::ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum Run {
    AusLng,
    Kyuden,
}

impl Run {
    pub fn sites(self) -> &'static [Site] {
        match self {
            Self::AusLng => &[Site::Chevron, Site::Woodside],
            Self::Kyuden => &[Site::Genkai, Site::Sendai],
        }
    }

    pub fn schema(self) -> Schema {
        match self {
            Self::AusLng => Schema::Maintenance,
            Self::Kyuden => Schema::Status,
        }
    }

    /// Whether the rows written are also handed back to the caller.
    pub fn keeps_table(self) -> bool {
        matches!(self, Self::Kyuden)
    }
}
