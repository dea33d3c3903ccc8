pub mod config;
pub mod error;
pub mod faculty;
pub mod handlers;
pub mod models;
pub mod parser;
pub mod routes;
pub mod scoring;
pub mod session;
pub mod state;

pub fn build_state(config: &config::Config) -> anyhow::Result<state::AppState> {
    let faculty = faculty::FacultyDirectory::load(&config.faculty_csv)?;
    tracing::info!(accounts = faculty.len(), "faculty directory loaded");
    Ok(state::AppState::new(faculty, config.questions_per_exam, config.rng_seed))
}
