pub mod message_service;
pub mod notifier;
pub mod room_service;
