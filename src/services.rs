pub mod availability_service;
pub use availability_service::AvailabilityService;

pub mod finance_service;
pub use finance_service::FinanceService;

pub mod settlement_service;
pub use settlement_service::SettlementService;

pub mod driver_ledger_service;
pub use driver_ledger_service::DriverLedgerService;
