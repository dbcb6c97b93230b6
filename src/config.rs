use anyhow::Result;
use poise::serenity_prelude::UserId;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub owner_id: Option<UserId>,
    pub tracked_user_id: Option<UserId>,
    pub gemini_api_key: Option<String>,
    pub sounds_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN environment variable is required"))?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:voicetime.db".to_string());

        let owner_id = parse_user_id(env::var("OWNER_ID").ok());
        // The owner doubles as the cue-tracked user unless overridden.
        let tracked_user_id = parse_user_id(env::var("TRACKED_USER_ID").ok()).or(owner_id);

        let gemini_api_key = env::var("GEMINI_API_KEY").ok();

        let sounds_dir = env::var("SOUNDS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("sounds"));

        Ok(Config {
            discord_token,
            database_url,
            owner_id,
            tracked_user_id,
            gemini_api_key,
            sounds_dir,
        })
    }
}

fn parse_user_id(raw: Option<String>) -> Option<UserId> {
    raw.and_then(|id| id.parse::<u64>().ok())
        .filter(|&id| id != 0)
        .map(UserId::new)
}
