pub mod api;
pub mod config;
pub mod dates;
pub mod error;
pub mod export;
pub mod gate;
pub mod http;
pub mod intake;
pub mod review;
pub mod vendor;

pub use api::{HttpIntakeApi, IntakeApi, LocalIntakeService};
pub use config::{load_config, ClientConfig, RetryConfig};
pub use error::{
    ConfigError, DriftError, ExportError, JobError, Result, ReviewError, TransportError,
    UploadRejection,
};
pub use export::{CompletedExport, ExportCancel, StreamingExportClient};
pub use gate::UploadGate;
pub use intake::{ContractIntakeWorkflow, IntakeTarget, JobPoller, PollerState};
pub use review::{NameCheckState, ReviewFields, ReviewForm};
pub use vendor::{InMemoryVendorRepository, Vendor, VendorRepository};
