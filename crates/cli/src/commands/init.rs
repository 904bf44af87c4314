//! `relaybot init` — Write the default configuration file.

use std::path::Path;

use relaybot_config::AppConfig;

/// Write the default config to `path`, creating parent directories.
///
/// Returns `false` without touching the file when it exists and `force` is
/// not set.
pub fn write_default_config(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}

pub async fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_path = AppConfig::default_path();
    let path = config_path.unwrap_or(&default_path);

    println!("🤖 RelayBot — Setup");
    println!("===================\n");

    if write_default_config(path, force)? {
        println!("✅ Created config at: {}", path.display());
    } else {
        println!("⚠️  Config already exists at: {}", path.display());
        println!("   Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    println!("\n📝 Next steps:");
    println!("   1. Put your secrets in the environment or a .env file:");
    println!("        DISCORD_TOKEN=...");
    println!("        OPENAI_API_KEY=...   (or OPENROUTER_API_KEY with provider = \"openrouter\")");
    println!("   2. Run: relaybot doctor");
    println!("   3. Run: relaybot run\n");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(write_default_config(&path, false).unwrap());
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.bot.command_prefix, "!ask");
    }

    #[test]
    fn existing_config_is_kept_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"custom\"\n").unwrap();

        assert!(!write_default_config(&path, false).unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("custom"));

        assert!(write_default_config(&path, true).unwrap());
        assert!(!std::fs::read_to_string(&path).unwrap().contains("custom"));
    }
}
