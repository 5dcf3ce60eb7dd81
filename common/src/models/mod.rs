pub mod payment;
pub mod session;
pub mod user;

pub use payment::{Payment, PaymentStatus};
pub use session::Session;
pub use user::User;
