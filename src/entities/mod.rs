pub mod levels;
pub mod licenses;
pub mod methods;
pub mod notifications;
pub mod pass_programs;
pub mod passes;
pub mod phones;
pub mod points;
pub mod secessions;
pub mod sessions;
pub mod users;

pub use methods::MethodProvider;
pub use notifications::NotificationType;
pub use points::PointType;
