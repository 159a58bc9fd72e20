use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::AppError;
use crate::storage::KeyValueStorage;

pub const THEME_KEY: &str = "theme-storage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    System,
    Light,
    Dark,
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThemePreference::System => "system",
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        })
    }
}

impl FromStr for ThemePreference {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(ThemePreference::System),
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            _ => Err(AppError::BadRequest(format!("unknown theme: {}", s))),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeSettings {
    #[serde(default)]
    color_scheme_preference: ThemePreference,
}

/// Stored preference, or `System` when absent or unreadable.
pub async fn load_theme(storage: &dyn KeyValueStorage) -> ThemePreference {
    match storage.get(THEME_KEY).await {
        Ok(Some(blob)) => match serde_json::from_str::<ThemeSettings>(&blob) {
            Ok(settings) => settings.color_scheme_preference,
            Err(e) => {
                warn!("ignoring unreadable theme preference: {}", e);
                ThemePreference::default()
            }
        },
        Ok(None) => ThemePreference::default(),
        Err(e) => {
            error!("failed to load theme preference: {}", e);
            ThemePreference::default()
        }
    }
}

pub async fn save_theme(storage: &dyn KeyValueStorage, preference: ThemePreference) {
    let settings = ThemeSettings {
        color_scheme_preference: preference,
    };
    let result = match serde_json::to_string(&settings) {
        Ok(blob) => storage.set(THEME_KEY, &blob).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("failed to save theme preference: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn defaults_to_system_and_round_trips() {
        let storage = MemoryStorage::new();
        assert_eq!(load_theme(&storage).await, ThemePreference::System);

        save_theme(&storage, ThemePreference::Dark).await;
        assert_eq!(
            storage.get(THEME_KEY).await.unwrap().as_deref(),
            Some(r#"{"colorSchemePreference":"dark"}"#)
        );
        assert_eq!(load_theme(&storage).await, ThemePreference::Dark);
    }

    #[tokio::test]
    async fn garbage_falls_back_to_system() {
        let storage = MemoryStorage::new();
        storage.set(THEME_KEY, "{not json").await.unwrap();
        assert_eq!(load_theme(&storage).await, ThemePreference::System);
    }
}
