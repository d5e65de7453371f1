//! Minimal CLI parsing for configuration overrides.

use std::env;

use crate::config::Config;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub port: Option<u16>,
    pub database: Option<String>,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg, None),
            };
            match flag.as_str() {
                "--port" => {
                    if let Some(value) = inline.or_else(|| args.next()) {
                        options.port = value.parse().ok();
                    }
                }
                "--database" => {
                    options.database = inline.or_else(|| args.next());
                }
                _ => {}
            }
        }
        options
    }

    /// Apply the overrides on top of environment configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = &self.database {
            config.database_url = database.clone();
        }
    }
}
