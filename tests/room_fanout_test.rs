//! Hub-level end-to-end checks: frames produced on one side of a room are
//! observed by every joined session of that room and nobody else.

use axum::extract::ws::Message;
use chrono::Utc;
use order_chat_service::models::MessageView;
use order_chat_service::websocket::message_types::{ClientFrame, ServerFrame};
use order_chat_service::websocket::ConnectionRegistry;
use uuid::Uuid;

fn message_view(sender_id: Uuid, sender_name: &str, body: &str) -> MessageView {
    MessageView {
        id: Uuid::new_v4(),
        sender_id,
        sender_name: sender_name.into(),
        sender_type: "customer".into(),
        message: body.into(),
        is_read: false,
        created_at: Utc::now(),
    }
}

fn frame_payload(frame: &ServerFrame) -> Message {
    Message::Text(serde_json::to_string(frame).unwrap())
}

fn parse_frame(msg: Message) -> ServerFrame {
    match msg {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_message_reaches_both_parties_and_no_other_room() {
    let registry = ConnectionRegistry::new();
    let room = Uuid::new_v4();
    let other_room = Uuid::new_v4();

    let (_c, mut customer_rx) = registry.join(room).await;
    let (_d, mut partner_rx) = registry.join(room).await;
    let (_s3, mut bystander_rx) = registry.join(other_room).await;

    let customer_id = Uuid::new_v4();
    let frame = ServerFrame::ChatMessage {
        message: message_view(customer_id, "asha", "Hi"),
    };
    registry.broadcast(room, frame_payload(&frame)).await;

    for rx in [&mut customer_rx, &mut partner_rx] {
        match parse_frame(rx.recv().await.unwrap()) {
            ServerFrame::ChatMessage { message } => {
                assert_eq!(message.message, "Hi");
                assert_eq!(message.sender_id, customer_id);
                assert!(!message.is_read);
            }
            other => panic!("expected chat_message, got {other:?}"),
        }
    }

    assert!(bystander_rx.try_recv().is_err());
}

#[tokio::test]
async fn read_receipt_round_trip() {
    let registry = ConnectionRegistry::new();
    let room = Uuid::new_v4();
    let partner_id = Uuid::new_v4();

    let (_c, mut customer_rx) = registry.join(room).await;

    // The partner read everything; the customer side observes the receipt.
    let frame = ServerFrame::ReadReceipt {
        user_id: partner_id,
        room_id: room,
    };
    registry.broadcast(room, frame_payload(&frame)).await;

    match parse_frame(customer_rx.recv().await.unwrap()) {
        ServerFrame::ReadReceipt { user_id, room_id } => {
            assert_eq!(user_id, partner_id);
            assert_eq!(room_id, room);
        }
        other => panic!("expected read_receipt, got {other:?}"),
    }
}

#[tokio::test]
async fn closed_session_receives_no_further_events() {
    let registry = ConnectionRegistry::new();
    let room = Uuid::new_v4();

    let (keeper_id, mut keeper_rx) = registry.join(room).await;
    let (leaver_id, mut leaver_rx) = registry.join(room).await;

    registry.leave(room, leaver_id).await;

    let frame = ServerFrame::ReadReceipt {
        user_id: Uuid::new_v4(),
        room_id: room,
    };
    registry.broadcast(room, frame_payload(&frame)).await;

    assert!(keeper_rx.recv().await.is_some());
    assert!(leaver_rx.try_recv().is_err());

    registry.leave(room, keeper_id).await;
    assert_eq!(registry.session_count(room).await, 0);
}

#[test]
fn inbound_frames_match_the_wire_contract() {
    let send: ClientFrame =
        serde_json::from_str(r#"{"type":"chat_message","message":"Hi"}"#).unwrap();
    assert!(matches!(send, ClientFrame::ChatMessage { message } if message == "Hi"));

    let receipt: ClientFrame = serde_json::from_str(r#"{"type":"read_receipt"}"#).unwrap();
    assert!(matches!(receipt, ClientFrame::ReadReceipt));
}
