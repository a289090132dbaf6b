//! INI file configuration adapter.

use crate::domain::error::AutotraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AutotraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| AutotraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, AutotraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| AutotraderError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[market]
symbol = BTC/USDT
timeframe = 5m

[strategy]
name = rsi
period = 10
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("market", "symbol"),
            Some("BTC/USDT".to_string())
        );
        assert_eq!(adapter.get_string("strategy", "name"), Some("rsi".to_string()));
        assert_eq!(adapter.get_int("strategy", "period", 14), 10);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[market]\nwindow = 100\n").unwrap();
        assert_eq!(adapter.get_string("market", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[market]\nwindow = abc\n").unwrap();
        assert_eq!(adapter.get_int("market", "window", 500), 500);
        assert_eq!(adapter.get_int("scheduler", "interval_seconds", 300), 300);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[execution]\norder_size = 0.025\n").unwrap();
        assert_eq!(adapter.get_double("execution", "order_size", 0.0), 0.025);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nnum_std_dev = wide\n").unwrap();
        assert_eq!(adapter.get_double("strategy", "num_std_dev", 2.0), 2.0);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[execution]\na = true\nb = yes\nc = 1\nd = off\ne = No\n",
        )
        .unwrap();
        assert!(adapter.get_bool("execution", "a", false));
        assert!(adapter.get_bool("execution", "b", false));
        assert!(adapter.get_bool("execution", "c", false));
        assert!(!adapter.get_bool("execution", "d", true));
        assert!(!adapter.get_bool("execution", "e", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing_or_garbage() {
        let adapter = FileConfigAdapter::from_string("[execution]\nenabled = maybe\n").unwrap();
        assert!(adapter.get_bool("execution", "enabled", true));
        assert!(!adapter.get_bool("execution", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[storage]\npath = cache/market_data.db\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("storage", "path"),
            Some("cache/market_data.db".to_string())
        );
    }

    #[test]
    fn from_file_missing_file_is_config_parse_error() {
        match FileConfigAdapter::from_file("/nonexistent/path/config.ini") {
            Err(AutotraderError::ConfigParse { file, .. }) => {
                assert!(file.contains("config.ini"));
            }
            Err(other) => panic!("expected ConfigParse, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }
}
