use std::env;
use std::path::PathBuf;

pub struct Config {
    /// Credential for the external chat transport. The bundled console
    /// adapter never reads it; real transports take it at startup.
    pub bot_token: String,
    pub bible_api_key: String,
    pub bible_api_url: String,
    pub bible_id: String,
    pub completion_endpoint: Option<String>,
    pub completion_model: String,
    pub offer_follow_up: bool,
    pub lock_path: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let bot_token = env::var("BOT_TOKEN").map_err(|_| "BOT_TOKEN must be set")?;
        let bible_api_key = env::var("API_BIBLE_KEY").map_err(|_| "API_BIBLE_KEY must be set")?;

        let bible_api_url = env::var("API_BIBLE_URL")
            .unwrap_or_else(|_| "https://api.scripture.api.bible/v1/bibles".to_string());
        // English Standard Version
        let bible_id = env::var("BIBLE_ID").unwrap_or_else(|_| "de4e12af7f28f599-01".to_string());

        let completion_endpoint = env::var("COMPLETION_ENDPOINT").ok();
        let completion_model =
            env::var("COMPLETION_MODEL").unwrap_or_else(|_| "qwen2.5:1b".to_string());

        let offer_follow_up = env::var("OFFER_FOLLOW_UP")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let lock_path = env::var("LOCK_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("solace-bot.pid"));

        let port = env::var("PORT")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()?;

        Ok(Self {
            bot_token,
            bible_api_key,
            bible_api_url,
            bible_id,
            completion_endpoint,
            completion_model,
            offer_follow_up,
            lock_path,
            port,
        })
    }
}
