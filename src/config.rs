use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub groq_model: String,
    pub database_path: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            groq_api_key: env::var("GROQ_API_KEY").expect("GROQ_API_KEY is required"),
            groq_model: env::var("GROQ_MODEL").unwrap_or_else(|_| "qwen-2.5-32b".into()),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "medical_advisor.db".into()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into()),
        }
    }
}
