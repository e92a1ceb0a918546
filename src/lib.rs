// src/lib.rs

// Declaração dos nossos módulos
pub mod cache;
pub mod common;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

// Contratos expostos à camada de UI/relatórios. Essas são as únicas
// formas das quais as telas podem depender.
pub use common::error::AppError;
pub use config::AppState;
pub use models::finance::PackageFinancialSummary;
pub use models::scheduling::{AvailabilityRequest, ValidationResult};
pub use models::settlement::{AgencySettlementView, SettlementBatch};
