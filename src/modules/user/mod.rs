pub mod onboarding;
pub mod repository;
pub mod routes;
