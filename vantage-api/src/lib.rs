#![deny(clippy::print_stdout, clippy::print_stderr)]

mod dto;
mod error;
mod handlers;
mod middleware;
mod router;
mod state;

pub use dto::AnomalyView;
pub use dto::AuthResponse;
pub use dto::BreakdownRow;
pub use dto::CreateTransactionRequest;
pub use dto::LoginRequest;
pub use dto::MeResponse;
pub use dto::MessageResponse;
pub use dto::PnLReportView;
pub use dto::RegisterRequest;
pub use dto::StartTrialResponse;
pub use dto::SubscriptionStatusResponse;
pub use dto::TransactionView;
pub use error::ApiError;
pub use middleware::AuthContext;
pub use router::router;
pub use state::ApiState;
