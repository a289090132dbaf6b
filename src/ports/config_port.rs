//! Configuration access port.
//!
//! Values are addressed by INI-style `[section] key`. Typed getters fall back
//! to `default` when the key is absent or does not parse, so callers that need
//! to distinguish "missing" from "default" check `get_string` first.

pub trait ConfigPort {
    /// Raw value, `None` when the key is absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    /// Accepts true/false, yes/no, on/off and 1/0.
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
