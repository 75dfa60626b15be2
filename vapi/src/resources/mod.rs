//! Resource implementations

pub mod assistant;
pub mod fields;
pub mod phone_number;

pub use assistant::AssistantResource;
pub use phone_number::PhoneNumberResource;
