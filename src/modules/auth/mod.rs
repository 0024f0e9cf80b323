pub mod guard;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod service;
