use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_connect_retries: u32,
    pub db_connect_backoff_ms: u64,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            db_connect_retries: env::var("DB_CONNECT_RETRIES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("DB_CONNECT_RETRIES must be a number"),
            db_connect_backoff_ms: env::var("DB_CONNECT_BACKOFF_MS")
                .unwrap_or_else(|_| "250".to_string())
                .parse()
                .expect("DB_CONNECT_BACKOFF_MS must be a number"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
