//! Generation settings persistence
//!
//! Render and batch options live together in `settings.json` inside the
//! application's data directory.

use crate::Result;
use docx_template::RenderOptions;
use mail_merge::BatchOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a user can tune about certificate generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateSettings {
    pub render: RenderOptions,
    pub batch: BatchOptions,
}

impl CertificateSettings {
    /// Replace options that would make every render fail with their defaults
    fn sanitized(mut self) -> Self {
        if let Err(e) = self.render.validate() {
            tracing::warn!("Ignoring saved render options: {}", e);
            self.render = RenderOptions::default();
        }
        if self.batch.concurrency == 0 {
            tracing::warn!("Batch concurrency of 0 in settings, using 1");
            self.batch.concurrency = 1;
        }
        self
    }

    fn parse_or_default(content: &str) -> Self {
        match serde_json::from_str::<CertificateSettings>(content) {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                tracing::warn!("Failed to parse settings file, using defaults: {}", e);
                CertificateSettings::default()
            }
        }
    }
}

/// Loads, caches and saves [`CertificateSettings`]
pub struct SettingsManager {
    settings_path: PathBuf,
    current: CertificateSettings,
}

impl SettingsManager {
    pub fn new(app_data_dir: impl AsRef<Path>) -> Self {
        Self {
            settings_path: app_data_dir.as_ref().join("settings.json"),
            current: CertificateSettings::default(),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, or defaults if the file doesn't exist
    pub async fn load(&mut self) -> Result<&CertificateSettings> {
        self.current = if self.settings_path.exists() {
            let content = tokio::fs::read_to_string(&self.settings_path).await?;
            CertificateSettings::parse_or_default(&content)
        } else {
            CertificateSettings::default()
        };
        Ok(&self.current)
    }

    pub fn load_sync(&mut self) -> Result<&CertificateSettings> {
        self.current = if self.settings_path.exists() {
            CertificateSettings::parse_or_default(&std::fs::read_to_string(&self.settings_path)?)
        } else {
            CertificateSettings::default()
        };
        Ok(&self.current)
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&self.current)?;
        tokio::fs::write(&self.settings_path, content).await?;
        Ok(())
    }

    pub fn save_sync(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.settings_path, serde_json::to_string_pretty(&self.current)?)?;
        Ok(())
    }

    pub fn get(&self) -> &CertificateSettings {
        &self.current
    }

    pub async fn update(&mut self, settings: CertificateSettings) -> Result<()> {
        self.current = settings;
        self.save().await
    }

    pub fn update_sync(&mut self, settings: CertificateSettings) -> Result<()> {
        self.current = settings;
        self.save_sync()
    }

    pub async fn update_render(&mut self, render: RenderOptions) -> Result<()> {
        self.current.render = render;
        self.save().await
    }

    pub async fn update_batch(&mut self, batch: BatchOptions) -> Result<()> {
        self.current.batch = batch;
        self.save().await
    }

    pub fn reset_sync(&mut self) -> Result<&CertificateSettings> {
        self.current = CertificateSettings::default();
        self.save_sync()?;
        Ok(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_template::AnchorCorner;
    use tempfile::TempDir;

    #[test]
    fn test_load_save_sync() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SettingsManager::new(temp_dir.path());
        assert_eq!(manager.load_sync().unwrap(), &CertificateSettings::default());

        let mut settings = CertificateSettings::default();
        settings.render.anchor_corner = AnchorCorner::TopLeft;
        settings.batch.output_name_pattern = "{CertificateNo}.docx".into();
        manager.update_sync(settings).unwrap();

        let mut reloaded = SettingsManager::new(temp_dir.path());
        let loaded = reloaded.load_sync().unwrap();
        assert_eq!(loaded.render.anchor_corner, AnchorCorner::TopLeft);
        assert_eq!(loaded.batch.output_name_pattern, "{CertificateNo}.docx");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("settings.json"), r#"{"batch": {"concurrency": 2}}"#).unwrap();
        let mut manager = SettingsManager::new(temp_dir.path());
        let loaded = manager.load_sync().unwrap();
        assert_eq!(loaded.batch.concurrency, 2);
        assert_eq!(loaded.render, RenderOptions::default());
    }

    #[test]
    fn test_corrupt_or_invalid_file_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        std::fs::write(&path, "{ not json").unwrap();
        let mut manager = SettingsManager::new(temp_dir.path());
        assert_eq!(manager.load_sync().unwrap(), &CertificateSettings::default());

        std::fs::write(&path, r#"{"render": {"qr_marker": ""}, "batch": {"concurrency": 0}}"#).unwrap();
        let loaded = manager.load_sync().unwrap();
        assert_eq!(loaded.render, RenderOptions::default());
        assert_eq!(loaded.batch.concurrency, 1);
    }

    #[test]
    fn test_reset_sync() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SettingsManager::new(temp_dir.path());
        let mut settings = CertificateSettings::default();
        settings.batch.max_records = 5;
        manager.update_sync(settings).unwrap();
        assert_eq!(manager.reset_sync().unwrap().batch.max_records, 0);
    }

    #[tokio::test]
    async fn test_settings_manager_async() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SettingsManager::new(temp_dir.path().join("nested"));
        manager.load().await.unwrap();

        let render = RenderOptions {
            qr_size_emu: 1_270_000,
            ..Default::default()
        };
        manager.update_render(render).await.unwrap();
        manager
            .update_batch(BatchOptions::default().with_concurrency(8))
            .await
            .unwrap();

        let mut reloaded = SettingsManager::new(temp_dir.path().join("nested"));
        let loaded = reloaded.load().await.unwrap();
        assert_eq!(loaded.render.qr_size_emu, 1_270_000);
        assert_eq!(loaded.batch.concurrency, 8);
    }
}
