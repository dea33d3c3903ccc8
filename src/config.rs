use crate::session::DEFAULT_QUESTIONS_PER_EXAM;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub faculty_csv: PathBuf,
    pub questions_per_exam: usize,
    pub rng_seed: Option<u64>,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            faculty_csv: PathBuf::from("faculty.csv"),
            questions_per_exam: DEFAULT_QUESTIONS_PER_EXAM,
            rng_seed: None,
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("BACKEND_HOST").unwrap_or(defaults.host);
        let port: u16 = std::env::var("BACKEND_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);
        let faculty_csv = std::env::var("FACULTY_CSV")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.faculty_csv);
        let questions_per_exam = std::env::var("QUESTIONS_PER_EXAM")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.questions_per_exam);
        let rng_seed = std::env::var("EXAM_RNG_SEED")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok());
        let cors_origin = std::env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Self {
            host,
            port,
            faculty_csv,
            questions_per_exam,
            rng_seed,
            cors_origin,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
