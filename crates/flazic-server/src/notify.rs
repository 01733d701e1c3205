use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set};
use uuid::Uuid;

use flazic_db::entities::notification::{self, NotificationKind};

/// Record a notification for `recipient` about something `sender` did.
///
/// Callers pass the transaction their own write runs in, so the notification
/// lands atomically with the action it describes. Acting on your own content
/// never notifies.
pub async fn notify<C: ConnectionTrait>(
    conn: &C,
    recipient: Uuid,
    sender: Uuid,
    kind: NotificationKind,
    target_id: Option<Uuid>,
) -> Result<(), DbErr> {
    if recipient == sender {
        return Ok(());
    }

    notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(recipient),
        from_user_id: Set(sender),
        kind: Set(kind),
        target_id: Set(target_id),
        is_read: Set(false),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(conn)
    .await?;

    Ok(())
}
