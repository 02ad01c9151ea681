use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "clarion")]
#[command(about = "Clarion article analysis engine")]
pub struct Config {
    /// Data directory
    #[arg(long, env = "CLARION_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Gemini API key. AI features degrade gracefully without it.
    #[arg(long, env = "GEMINI_API_KEY")]
    pub api_key: Option<String>,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("clarion.redb")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            api_key: None,
        }
    }
}
