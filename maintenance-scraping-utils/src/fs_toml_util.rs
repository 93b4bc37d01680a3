use std::{fmt::Debug, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub fn read_toml<P: Into<PathBuf> + Debug, T: for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<T> {
    let path = path.into();
    (|| toml::from_str(&fs_err::read_to_string(&path)?).map_err(anyhow::Error::new))().with_context(
        || {
            format!(
                "While trying to parse {path:?} as {}",
                std::any::type_name::<T>()
            )
        },
    )
}

/// Like [`read_toml`], but a missing file yields `T::default()`.
pub fn read_toml_or_default<P: Into<PathBuf> + Debug, T: Default + for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<T> {
    let path = path.into();
    if !path.exists() {
        return Ok(T::default());
    }
    read_toml(path)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::{read_toml, read_toml_or_default};

    #[derive(Default, Debug, PartialEq, Deserialize)]
    struct Sample {
        #[serde(default)]
        name: String,
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let path = std::env::temp_dir().join("maintenance-scraping-utils-no-such-file.toml");
        let sample: Sample = read_toml_or_default(&path).unwrap();
        assert_eq!(sample, Sample::default());
        assert!(read_toml::<_, Sample>(&path).is_err());
    }
}
