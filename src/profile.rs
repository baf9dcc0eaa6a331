//! Reader profile used by the ranking and intro capabilities.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PROFILE_PATH: &str = "DIGEST_PROFILE_PATH";
const DEFAULT_PROFILE_PATH: &str = "config/profile.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProfilePreferences {
    pub prefer_practical: bool,
    pub prefer_technical_depth: bool,
    pub prefer_research_breakthroughs: bool,
    pub prefer_production_focus: bool,
    pub avoid_marketing_hype: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub title: String,
    pub background: String,
    pub expertise_level: String,
    pub interests: Vec<String>,
    pub preferences: ProfilePreferences,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "there".to_string(),
            title: String::new(),
            background: String::new(),
            expertise_level: String::new(),
            interests: Vec::new(),
            preferences: ProfilePreferences::default(),
        }
    }
}

impl UserProfile {
    /// Load from `$DIGEST_PROFILE_PATH`, then `config/profile.toml`, then
    /// fall back to the neutral default profile.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PROFILE_PATH) {
            return Self::load_from(&PathBuf::from(p));
        }
        let default = Path::new(DEFAULT_PROFILE_PATH);
        if default.exists() {
            return Self::load_from(default);
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading profile from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing profile {}", path.display()))
    }

    /// Render the profile into the block the ranking and intro prompts embed.
    pub fn prompt_context(&self) -> String {
        let p = &self.preferences;
        format!(
            "User Profile:\n\
             - Name: {}\n\
             - Title: {}\n\
             - Background: {}\n\
             - Expertise Level: {}\n\
             - Interests: {}\n\
             - Preferences:\n\
             \x20 - Prefers practical content: {}\n\
             \x20 - Prefers technical depth: {}\n\
             \x20 - Prefers research breakthroughs: {}\n\
             \x20 - Prefers production focus: {}\n\
             \x20 - Avoids marketing hype: {}",
            self.name,
            self.title,
            self.background,
            self.expertise_level,
            self.interests.join(", "),
            p.prefer_practical,
            p.prefer_technical_depth,
            p.prefer_research_breakthroughs,
            p.prefer_production_focus,
            p.avoid_marketing_hype,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_toml_with_defaults() {
        let profile: UserProfile = toml::from_str(
            r#"
            name = "Alex"
            interests = ["agents", "inference"]

            [preferences]
            prefer_practical = true
            "#,
        )
        .unwrap();
        assert_eq!(profile.name, "Alex");
        assert!(profile.preferences.prefer_practical);
        assert!(!profile.preferences.avoid_marketing_hype);
        assert!(profile.prompt_context().contains("agents, inference"));
    }
}
