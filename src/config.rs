use crate::gauge::EasingMode;
use std::{env, net::IpAddr, net::Ipv4Addr, path::PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub data_path: PathBuf,
    pub easing: EasingMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            data_path: PathBuf::from("data/state.json"),
            easing: EasingMode::Frame,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = parsed(&lookup, "PORT") {
            config.port = port;
        }
        if let Some(bind) = parsed(&lookup, "HYDRA_BIND") {
            config.bind = bind;
        }
        if let Some(path) = lookup("APP_DATA_PATH").filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }
        match lookup("HYDRA_EASING").as_deref().map(str::trim) {
            None | Some("") | Some("frame") => {}
            Some("time") => config.easing = EasingMode::Time,
            Some(other) => warn!("unknown HYDRA_EASING {other:?}, keeping per-frame easing"),
        }

        config
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring invalid {key}={raw:?}");
            None
        }
    }
}
