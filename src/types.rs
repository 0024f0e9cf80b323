pub use crate::utils::database;
use async_trait::async_trait;
use std::env;

#[derive(Clone)]
pub enum AppEnvironment {
    Production,
    Development,
}

impl AppEnvironment {
    pub fn from(raw_environment: String) -> Self {
        match raw_environment.as_ref() {
            "production" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u32,
}

#[derive(Clone)]
pub struct GoogleContext {
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_redirect_url: String,
    pub maps_api_key: String,
}

#[derive(Clone)]
pub struct Context {
    pub app: AppContext,
    pub db_conn: database::DatabaseConnection,
    pub google: GoogleContext,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u32,
}

#[derive(Clone)]
pub struct GoogleConfig {
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_redirect_url: String,
    pub maps_api_key: String,
}

#[derive(Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub app: AppConfig,
    pub google: GoogleConfig,
}

impl Default for Config {
    fn default() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u32>()
            .expect("Invalid PORT number");
        let url = env::var("URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));
        let google_oauth_client_id =
            env::var("GOOGLE_OAUTH_CLIENT_ID").expect("GOOGLE_OAUTH_CLIENT_ID not set");
        let google_oauth_client_secret =
            env::var("GOOGLE_OAUTH_CLIENT_SECRET").expect("GOOGLE_OAUTH_CLIENT_SECRET not set");
        let google_oauth_redirect_url = env::var("GOOGLE_OAUTH_REDIRECT_URL")
            .unwrap_or_else(|_| format!("{}/api/auth/callback", url));
        let google_maps_api_key =
            env::var("GOOGLE_MAPS_API_KEY").expect("GOOGLE_MAPS_API_KEY not set");

        Self {
            database: DatabaseConfig { url: database_url },
            app: AppConfig {
                host,
                environment: AppEnvironment::from(environment),
                port,
            },
            google: GoogleConfig {
                oauth_client_id: google_oauth_client_id,
                oauth_client_secret: google_oauth_client_secret,
                oauth_redirect_url: google_oauth_redirect_url,
                maps_api_key: google_maps_api_key,
            },
        }
    }
}

#[async_trait]
pub trait ToContext {
    async fn to_context(self) -> Context;
}

#[async_trait]
impl ToContext for Config {
    async fn to_context(self) -> Context {
        let db_conn = database::connect(self.database.url.as_str()).await;
        database::migrate(db_conn.clone()).await;

        Context {
            app: AppContext {
                host: self.app.host,
                environment: self.app.environment,
                port: self.app.port,
            },
            db_conn,
            google: GoogleContext {
                oauth_client_id: self.google.oauth_client_id,
                oauth_client_secret: self.google.oauth_client_secret,
                oauth_redirect_url: self.google.oauth_redirect_url,
                maps_api_key: self.google.maps_api_key,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_tag_defaults_to_development() {
        assert!(matches!(
            AppEnvironment::from("production".to_string()),
            AppEnvironment::Production
        ));
        assert!(matches!(
            AppEnvironment::from("staging".to_string()),
            AppEnvironment::Development
        ));
    }
}
