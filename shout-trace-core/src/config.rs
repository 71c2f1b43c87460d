use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::link::{Annotator, LinkSpec};
use crate::pager::{Pager, PagerConfig};

pub const CONFIG_FILE_NAME: &str = "shout-trace.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub link: LinkSpec,
    pub pager: PagerConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(Error::ConfigRead { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn annotator(&self) -> Annotator {
        Annotator::new(self.link.clone())
    }

    pub fn pager(&self) -> Pager {
        Pager::new(self.pager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{DEFAULT_HOST, DEFAULT_PORT};

    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.link.host, DEFAULT_HOST);
        assert_eq!(config.link.port, DEFAULT_PORT);
        assert!(config.link.open_in_new_target);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[link]\nport = 4444\nquery = \"editor=emacs\"\n\n[pager]\nblock_size = 512\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.link.host, DEFAULT_HOST);
        assert_eq!(config.link.port, 4444);
        assert_eq!(config.link.query.as_deref(), Some("editor=emacs"));
        assert_eq!(config.pager.block_size, 512);
        assert_eq!(config.pager.page_lines, PagerConfig::default().page_lines);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[link\nport = \"nope\"").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(Error::ConfigParse { .. })
        ));
    }
}
