//! Follower and notification fabric
//!
//! Users follow streamers; stream lifecycle events fan notifications out to
//! followers according to their preferences. Each user keeps a bounded
//! notification log; connected listeners get a push over the broadcast
//! channel.

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    config::NotificationConfig,
    models::{
        Identity, Notification, NotificationKind, NotificationPriority, RoomId, Subscription,
        SubscriptionPrefs,
    },
    Error, Result,
};

#[derive(Default)]
struct NotificationState {
    /// user -> notifications in arrival order
    notifications: HashMap<Identity, Vec<Notification>>,
    /// user -> streamers they follow
    subscriptions: HashMap<Identity, Vec<Subscription>>,
    /// streamer -> followers
    followers: HashMap<Identity, Vec<Identity>>,
}

pub struct NotificationFabric {
    state: RwLock<NotificationState>,
    events: broadcast::Sender<Notification>,
    config: NotificationConfig,
}

impl NotificationFabric {
    #[must_use]
    pub fn new(config: NotificationConfig) -> Self {
        let (events, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            state: RwLock::new(NotificationState::default()),
            events,
            config,
        }
    }

    /// Subscribe to pushed notifications. Listeners filter by user.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    /// Follow a streamer. Following the same streamer twice fails.
    pub fn subscribe(
        &self,
        user_id: Identity,
        streamer_id: Identity,
        streamer_name: String,
        prefs: Option<SubscriptionPrefs>,
    ) -> Result<Subscription> {
        let mut state = self.state.write();

        if let Some(subs) = state.subscriptions.get(&user_id) {
            if subs.iter().any(|s| s.streamer_id == streamer_id) {
                return Err(Error::AlreadyExists(
                    "already subscribed to this streamer".to_string(),
                ));
            }
        }

        let prefs = prefs.unwrap_or_default();
        let subscription = Subscription {
            user_id: user_id.clone(),
            streamer_id: streamer_id.clone(),
            streamer_name,
            notify_stream_start: prefs.notify_stream_start,
            notify_stream_end: prefs.notify_stream_end,
            notify_chat: prefs.notify_chat,
            notify_mentions: prefs.notify_mentions,
            created_at: Utc::now(),
        };

        state
            .subscriptions
            .entry(user_id.clone())
            .or_default()
            .push(subscription.clone());
        state
            .followers
            .entry(streamer_id.clone())
            .or_default()
            .push(user_id.clone());

        info!(user_id = %user_id, streamer_id = %streamer_id, "user subscribed to streamer");
        Ok(subscription)
    }

    pub fn unsubscribe(&self, user_id: &Identity, streamer_id: &Identity) -> Result<()> {
        let mut state = self.state.write();

        let removed = state
            .subscriptions
            .get_mut(user_id)
            .map(|subs| {
                let before = subs.len();
                subs.retain(|s| &s.streamer_id != streamer_id);
                before != subs.len()
            })
            .unwrap_or(false);

        if !removed {
            return Err(Error::NotFound("subscription not found".to_string()));
        }

        if let Some(followers) = state.followers.get_mut(streamer_id) {
            followers.retain(|f| f != user_id);
        }

        info!(user_id = %user_id, streamer_id = %streamer_id, "user unsubscribed from streamer");
        Ok(())
    }

    /// Notify every follower with the stream-start preference enabled.
    /// Returns how many notifications were delivered.
    pub fn notify_stream_started(
        &self,
        streamer_id: &Identity,
        streamer_name: &str,
        room_name: &RoomId,
        stream_title: &str,
    ) -> usize {
        let recipients = self.recipients(streamer_id, |s| s.notify_stream_start);
        if recipients.is_empty() {
            return 0;
        }

        info!(
            streamer_id = %streamer_id,
            follower_count = recipients.len(),
            "notifying stream started"
        );

        let mut delivered = Vec::with_capacity(recipients.len());
        {
            let mut state = self.state.write();
            for follower in recipients {
                let mut notification = Notification::new(
                    follower.clone(),
                    NotificationKind::StreamStarted,
                    format!("{streamer_name} is live!"),
                    stream_title.to_string(),
                    NotificationPriority::High,
                );
                notification.action_url = format!("/watch/{room_name}");
                notification
                    .data
                    .insert("streamer_id".to_string(), streamer_id.to_string());
                notification
                    .data
                    .insert("streamer_name".to_string(), streamer_name.to_string());
                notification
                    .data
                    .insert("room_name".to_string(), room_name.to_string());

                Self::push_bounded(
                    &mut state,
                    follower,
                    notification.clone(),
                    self.config.max_per_user,
                );
                delivered.push(notification);
            }
        }

        let count = delivered.len();
        for notification in delivered {
            let _ = self.events.send(notification);
        }
        count
    }

    /// Notify followers with the stream-end preference that the stream is
    /// over. Returns how many notifications were delivered.
    pub fn notify_stream_ended(
        &self,
        streamer_id: &Identity,
        streamer_name: &str,
        duration_secs: f64,
        view_count: u64,
    ) -> usize {
        let recipients = self.recipients(streamer_id, |s| s.notify_stream_end);
        if recipients.is_empty() {
            return 0;
        }

        let mut delivered = Vec::with_capacity(recipients.len());
        {
            let mut state = self.state.write();
            for follower in recipients {
                let notification = Notification::new(
                    follower.clone(),
                    NotificationKind::StreamEnded,
                    format!("{streamer_name}'s stream ended"),
                    format!("Stream lasted {duration_secs:.0}s with {view_count} viewers"),
                    NotificationPriority::Low,
                );
                Self::push_bounded(
                    &mut state,
                    follower,
                    notification.clone(),
                    self.config.max_per_user,
                );
                delivered.push(notification);
            }
        }

        let count = delivered.len();
        for notification in delivered {
            let _ = self.events.send(notification);
        }
        count
    }

    /// Deliver a one-off notification to a single user.
    pub fn send(
        &self,
        user_id: Identity,
        kind: NotificationKind,
        title: String,
        body: String,
        priority: NotificationPriority,
    ) -> Notification {
        let notification = Notification::new(user_id.clone(), kind, title, body, priority);
        {
            let mut state = self.state.write();
            Self::push_bounded(
                &mut state,
                user_id,
                notification.clone(),
                self.config.max_per_user,
            );
        }
        let _ = self.events.send(notification.clone());
        notification
    }

    /// A user's notifications, newest first.
    #[must_use]
    pub fn list(&self, user_id: &Identity, unread_only: bool, limit: usize) -> Vec<Notification> {
        let state = self.state.read();
        state
            .notifications
            .get(user_id)
            .map(|notifications| {
                notifications
                    .iter()
                    .rev()
                    .filter(|n| !unread_only || !n.is_read)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn mark_read(&self, user_id: &Identity, notification_id: &str) -> Result<()> {
        let mut state = self.state.write();
        let notifications = state
            .notifications
            .get_mut(user_id)
            .ok_or_else(|| Error::NotFound("no notifications found for user".to_string()))?;

        let notification = notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| Error::NotFound("notification not found".to_string()))?;

        notification.is_read = true;
        notification.read_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_all_read(&self, user_id: &Identity) {
        let mut state = self.state.write();
        if let Some(notifications) = state.notifications.get_mut(user_id) {
            let now = Utc::now();
            for n in notifications.iter_mut().filter(|n| !n.is_read) {
                n.is_read = true;
                n.read_at = Some(now);
            }
        }
    }

    #[must_use]
    pub fn unread_count(&self, user_id: &Identity) -> usize {
        let state = self.state.read();
        state
            .notifications
            .get(user_id)
            .map(|n| n.iter().filter(|n| !n.is_read).count())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn subscriptions(&self, user_id: &Identity) -> Vec<Subscription> {
        self.state
            .read()
            .subscriptions
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn follower_count(&self, streamer_id: &Identity) -> usize {
        self.state
            .read()
            .followers
            .get(streamer_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Drop notifications older than the TTL; returns the count.
    pub fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now() - ChronoDuration::days(self.config.ttl_days);
        let mut state = self.state.write();

        let mut swept = 0;
        for notifications in state.notifications.values_mut() {
            let before = notifications.len();
            notifications.retain(|n| n.created_at > cutoff);
            swept += before - notifications.len();
        }

        if swept > 0 {
            info!(count = swept, "cleaned up expired notifications");
        }
        swept
    }

    /// Followers of `streamer_id` whose preferences pass `pref`.
    fn recipients(
        &self,
        streamer_id: &Identity,
        pref: impl Fn(&Subscription) -> bool,
    ) -> Vec<Identity> {
        let state = self.state.read();
        let Some(followers) = state.followers.get(streamer_id) else {
            return Vec::new();
        };

        followers
            .iter()
            .filter(|follower| {
                state
                    .subscriptions
                    .get(*follower)
                    .is_some_and(|subs| {
                        subs.iter()
                            .any(|s| &s.streamer_id == streamer_id && pref(s))
                    })
            })
            .cloned()
            .collect()
    }

    fn push_bounded(
        state: &mut NotificationState,
        user_id: Identity,
        notification: Notification,
        max_per_user: usize,
    ) {
        let notifications = state.notifications.entry(user_id).or_default();
        notifications.push(notification);
        if notifications.len() > max_per_user {
            let excess = notifications.len() - max_per_user;
            notifications.drain(..excess);
        }
        debug!("notification delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fabric() -> NotificationFabric {
        NotificationFabric::new(NotificationConfig::default())
    }

    #[test]
    fn test_duplicate_subscribe_fails() {
        let fabric = fabric();
        fabric
            .subscribe(
                Identity::from("fan"),
                Identity::from("streamer"),
                "Streamer".to_string(),
                None,
            )
            .unwrap();
        assert!(matches!(
            fabric.subscribe(
                Identity::from("fan"),
                Identity::from("streamer"),
                "Streamer".to_string(),
                None,
            ),
            Err(Error::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_unsubscribe_then_resubscribe() {
        let fabric = fabric();
        let fan = Identity::from("fan");
        let streamer = Identity::from("streamer");

        fabric
            .subscribe(fan.clone(), streamer.clone(), "S".to_string(), None)
            .unwrap();
        fabric.unsubscribe(&fan, &streamer).unwrap();
        assert_eq!(fabric.follower_count(&streamer), 0);

        fabric
            .subscribe(fan.clone(), streamer.clone(), "S".to_string(), None)
            .unwrap();
        assert_eq!(fabric.follower_count(&streamer), 1);

        assert!(matches!(
            fabric.unsubscribe(&Identity::from("other"), &streamer),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_stream_started_respects_preferences() {
        let fabric = fabric();
        let streamer = Identity::from("streamer");

        fabric
            .subscribe(Identity::from("eager"), streamer.clone(), "S".to_string(), None)
            .unwrap();
        fabric
            .subscribe(
                Identity::from("quiet"),
                streamer.clone(),
                "S".to_string(),
                Some(SubscriptionPrefs {
                    notify_stream_start: false,
                    ..Default::default()
                }),
            )
            .unwrap();

        let delivered =
            fabric.notify_stream_started(&streamer, "Streamer", &RoomId::from("r1"), "Big show");
        assert_eq!(delivered, 1);

        let eager = fabric.list(&Identity::from("eager"), false, 10);
        assert_eq!(eager.len(), 1);
        assert_eq!(eager[0].kind, NotificationKind::StreamStarted);
        assert_eq!(eager[0].action_url, "/watch/r1");

        assert!(fabric.list(&Identity::from("quiet"), false, 10).is_empty());
    }

    #[test]
    fn test_stream_ended_defaults_to_silent() {
        let fabric = fabric();
        let streamer = Identity::from("streamer");
        fabric
            .subscribe(Identity::from("fan"), streamer.clone(), "S".to_string(), None)
            .unwrap();

        // Default prefs have stream-end notifications off
        assert_eq!(fabric.notify_stream_ended(&streamer, "S", 3600.0, 42), 0);
    }

    #[test]
    fn test_read_tracking() {
        let fabric = fabric();
        let user = Identity::from("fan");

        let n1 = fabric.send(
            user.clone(),
            NotificationKind::System,
            "one".to_string(),
            String::new(),
            NotificationPriority::Low,
        );
        fabric.send(
            user.clone(),
            NotificationKind::System,
            "two".to_string(),
            String::new(),
            NotificationPriority::Low,
        );

        assert_eq!(fabric.unread_count(&user), 2);
        fabric.mark_read(&user, &n1.id).unwrap();
        assert_eq!(fabric.unread_count(&user), 1);

        let unread = fabric.list(&user, true, 10);
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].title, "two");

        fabric.mark_all_read(&user);
        assert_eq!(fabric.unread_count(&user), 0);

        assert!(matches!(
            fabric.mark_read(&user, "missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_log_is_bounded() {
        let config = NotificationConfig {
            max_per_user: 3,
            ttl_days: 30,
            channel_capacity: 16,
        };
        let fabric = NotificationFabric::new(config);
        let user = Identity::from("fan");

        for i in 0..5 {
            fabric.send(
                user.clone(),
                NotificationKind::System,
                format!("n{i}"),
                String::new(),
                NotificationPriority::Low,
            );
        }

        let all = fabric.list(&user, false, 10);
        assert_eq!(all.len(), 3);
        // Oldest entries were evicted; newest first
        assert_eq!(all[0].title, "n4");
        assert_eq!(all[2].title, "n2");
    }

    #[tokio::test]
    async fn test_push_channel_delivery() {
        let fabric = fabric();
        let mut rx = fabric.subscribe_events();

        fabric.send(
            Identity::from("fan"),
            NotificationKind::Gift,
            "gift!".to_string(),
            String::new(),
            NotificationPriority::Medium,
        );

        let pushed = rx.recv().await.unwrap();
        assert_eq!(pushed.kind, NotificationKind::Gift);
        assert_eq!(pushed.user_id.as_str(), "fan");
    }

    #[test]
    fn test_sweep_expired() {
        let config = NotificationConfig {
            max_per_user: 100,
            ttl_days: 0,
            channel_capacity: 16,
        };
        let fabric = NotificationFabric::new(config);
        fabric.send(
            Identity::from("fan"),
            NotificationKind::System,
            "old".to_string(),
            String::new(),
            NotificationPriority::Low,
        );

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(fabric.sweep_expired(), 1);
        assert!(fabric.list(&Identity::from("fan"), false, 10).is_empty());
    }
}
