use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// How feedback strings from the feedback workers are mapped back onto questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackMerge {
    /// Concatenate every worker's output and zip it with the question list by index.
    #[default]
    Positional,
    /// Zip each worker's output only with the slice that worker was given.
    SliceAligned,
}

impl FromStr for FeedbackMerge {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(FeedbackMerge::Positional),
            "slice" | "slice_aligned" => Ok(FeedbackMerge::SliceAligned),
            other => Err(format!("unknown feedback merge mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub default_llm_model: String,
    pub agent_model: String,
    pub embedding_model: String,
    pub batch_size: usize,
    pub max_questions_per_request: usize,
    pub rag_enabled: bool,
    pub rag_top_k: usize,
    pub rag_min_similarity: f32,
    pub llm_max_retries: u32,
    pub llm_timeout_secs: u64,
    pub feedback_merge: FeedbackMerge,
    pub api_rps: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let server_address = match env::var("SERVER_ADDRESS") {
            Ok(addr) => addr,
            Err(_) => format!(
                "{}:{}",
                env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                env::var("PORT").unwrap_or_else(|_| "8080".to_string())
            ),
        };

        Ok(Self {
            server_address,
            database_url: get_env("DATABASE_URL")?,
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SIGNATURE")?,
            openai_api_key: get_env("OPENAI_API_KEY")?,
            openai_base_url: get_env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            default_llm_model: get_env_or("DEFAULT_LLM_MODEL", "gpt-5-2025-08-07"),
            agent_model: get_env_or("AGENT_MODEL", "gpt-4o"),
            embedding_model: get_env_or("EMBEDDING_MODEL", "text-embedding-3-large"),
            batch_size: get_env_parse_or("BATCH_SIZE", 3)?,
            max_questions_per_request: get_env_parse_or("MAX_QUESTIONS_PER_REQUEST", 50)?,
            rag_enabled: get_env_parse_or("RAG_ENABLED", false)?,
            rag_top_k: get_env_parse_or("RAG_TOP_K", 5)?,
            rag_min_similarity: get_env_parse_or("RAG_MIN_SIMILARITY", 0.0)?,
            llm_max_retries: get_env_parse_or("LLM_MAX_RETRIES", 0)?,
            llm_timeout_secs: get_env_parse_or("LLM_TIMEOUT_SECS", 120)?,
            feedback_merge: get_env_parse_or("FEEDBACK_MERGE", FeedbackMerge::Positional)?,
            api_rps: get_env_parse_or("API_RPS", 20)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
