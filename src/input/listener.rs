use super::event::Notification;

/// A [Listener] is informed about input activity that does not change the
/// tablet state: devices coming and going, and button presses.
///
/// Notifications are delivered on the input loop thread, so implementations
/// should return quickly and must synchronize any state they share with other
/// threads themselves.
pub trait Listener: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<F> Listener for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}
