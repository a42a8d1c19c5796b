use async_trait::async_trait;
use fcm::{Client, MessageBuilder, NotificationBuilder};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::MessageView;

/// Push delivery behind a trait so deployments without FCM (and tests)
/// simply inject nothing.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, device_token: String, title: String, body: String)
        -> Result<(), AppError>;
}

/// FCM (Firebase Cloud Messaging) push notification provider
pub struct FcmPush {
    client: Arc<Client>,
    api_key: String,
}

impl FcmPush {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            api_key,
        }
    }
}

#[async_trait]
impl PushProvider for FcmPush {
    async fn send(
        &self,
        device_token: String,
        title: String,
        body: String,
    ) -> Result<(), AppError> {
        let mut notification_builder = NotificationBuilder::new();
        notification_builder
            .title(&title)
            .body(&body)
            .sound("default");
        let notification = notification_builder.finalize();

        let mut message_builder = MessageBuilder::new(&self.api_key, &device_token);
        message_builder.notification(notification);
        let message = message_builder.finalize();

        match self.client.send(message).await {
            Ok(response) => {
                info!(message_id = ?response.message_id, "FCM notification sent");
                Ok(())
            }
            Err(e) => Err(AppError::Config(format!("FCM send failed: {e}"))),
        }
    }
}

/// Notification bridge: informs the counterparty of a new message for
/// offline delivery. Strictly fire-and-forget; failures are logged and
/// never fail the send path.
#[derive(Clone)]
pub struct Notifier {
    push: Option<Arc<dyn PushProvider>>,
}

impl Notifier {
    pub fn new(push: Option<Arc<dyn PushProvider>>) -> Self {
        Self { push }
    }

    pub fn disabled() -> Self {
        Self { push: None }
    }

    /// Dispatch a new-message notification on a detached task.
    pub fn notify_new_message(
        &self,
        db: PgPool,
        recipient_id: Uuid,
        room_id: Uuid,
        message: MessageView,
    ) {
        let Some(push) = self.push.clone() else {
            return;
        };

        tokio::spawn(async move {
            let token: Option<String> = match sqlx::query_scalar::<_, Option<String>>(
                "SELECT fcm_token FROM users WHERE id = $1",
            )
            .bind(recipient_id)
            .fetch_optional(&db)
            .await
            {
                Ok(row) => row.flatten(),
                Err(e) => {
                    warn!(error = %e, %recipient_id, "failed to look up device token");
                    return;
                }
            };

            let Some(token) = token.filter(|t| !t.is_empty()) else {
                debug!(%recipient_id, "no device token, skipping chat push");
                return;
            };

            let title = format!("New message from {}", message.sender_name);
            if let Err(e) = push.send(token, title, message.message.clone()).await {
                warn!(error = %e, %room_id, "chat push delivery failed");
            }
        });
    }
}
