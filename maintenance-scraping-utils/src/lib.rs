#[macro_use]
pub mod macros;

pub mod fs_toml_util;

#[doc(hidden)]
pub mod __private {
    pub use once_cell;
    pub use regex;
    pub use scraper;
}
