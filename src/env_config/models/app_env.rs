use std::fmt;
use std::str::FromStr;

/// Окружение, в котором запущен сервис
#[derive(Debug, Clone, PartialEq)]
pub enum Env {
    Local,
    Docker,
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Env::Local),
            "docker" => Ok(Env::Docker),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Docker => write!(f, "docker"),
        }
    }
}

/// Переменные окружения, обязательные для запуска сервиса
#[derive(Debug)]
pub struct AppEnv {
    pub env: Env,
    pub server_port: u16,
    pub server_address: String,
    pub clickhouse_url: String,
    pub clickhouse_user: String,
    pub clickhouse_password: String,
    pub clickhouse_database: String,
    pub postgres_host: String,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_database: String,
    pub job_runner_url: String,
}

impl AppEnv {
    pub fn is_local(&self) -> bool {
        self.env == Env::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_from_str() {
        assert_eq!(Env::from_str("local").unwrap(), Env::Local);
        assert_eq!(Env::from_str("LOCAL").unwrap(), Env::Local);
        assert_eq!(Env::from_str("docker").unwrap(), Env::Docker);
        assert!(Env::from_str("staging").is_err());
    }
}
