use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::document::TemplateDefaults;

/// Application configuration loaded from environment variables.
/// Every variable has a default; a malformed value fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Workbook every document is built from. Checked per request, not here.
    pub template_path: PathBuf,
    /// Directory holding applicant photos. No photos are embedded without it.
    pub photo_dir: Option<PathBuf>,
    pub home_province: String,
    /// `"town, province"` of the issuing office, also printed as the place of execution.
    pub home_locality: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = TemplateDefaults::default();

        Ok(Config {
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .trim()
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            template_path: var("TEMPLATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("assets/excel/template.xlsx")),
            photo_dir: var("PHOTO_DIR").map(PathBuf::from),
            home_province: var("HOME_PROVINCE").unwrap_or(defaults.home_province),
            home_locality: var("HOME_LOCALITY").unwrap_or(defaults.home_locality),
        })
    }

    /// Form defaults with the configured home province and locality.
    pub fn template_defaults(&self) -> TemplateDefaults {
        TemplateDefaults {
            home_province: self.home_province.clone(),
            home_locality: self.home_locality.clone(),
            place_of_execution: self.home_locality.clone(),
            ..TemplateDefaults::default()
        }
    }
}
