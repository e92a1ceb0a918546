pub mod scheduling;
pub mod finance;
pub mod settlement;

pub use scheduling::{
    AvailabilityRequest, CandidateActivity, DateRange, PackageStatus, ResourceType,
    ScheduledActivity, ValidationResult,
};

pub use finance::{DailyBreakdown, PackageFinancialSummary, PackageFinancials, VehicleExpense};

pub use settlement::{
    AgencySettlementView, DriverCostPackage, DriverDailyRate, LedgerEntry, LedgerEntryKind,
    NewDriverDailyRate, SettlementBatch, SettlementDay, SettlementRecord, SettlementStatus,
};
