pub mod catalog;
pub mod conversation;
pub mod intent;
pub mod order;
pub mod profile;
