pub mod message;
pub mod room;

pub use message::MessageView;
pub use room::{ChatRoom, ChatRoomView};
