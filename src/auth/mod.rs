use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Signed-in patient identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub patient_id: String,
    pub email: String,
    pub name: String,
}

/// Token returned by `subscribe`, used to unregister the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type AuthCallback = Box<dyn Fn(Option<&User>) + Send + Sync>;

#[derive(Default)]
struct AuthInner {
    current: Option<User>,
    subscribers: HashMap<u64, AuthCallback>,
    next_subscription: u64,
}

/// Process-wide auth context, passed into the layers that need it instead
/// of being looked up ambiently.
///
/// Subscribers are invoked with the new user on sign-in and with None on
/// sign-out, and once immediately on registration with the current state.
#[derive(Clone, Default)]
pub struct AuthSession {
    inner: Arc<Mutex<AuthInner>>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.lock().expect("auth state poisoned").current.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_user().is_some()
    }

    /// Register an auth-change callback. Fires immediately with the current
    /// state so late subscribers don't miss an earlier sign-in.
    pub fn subscribe(
        &self,
        callback: impl Fn(Option<&User>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = self.inner.lock().expect("auth state poisoned");

        callback(inner.current.as_ref());

        let id = inner.next_subscription;
        inner.next_subscription += 1;
        inner.subscribers.insert(id, Box::new(callback));

        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .lock()
            .expect("auth state poisoned")
            .subscribers
            .remove(&id.0);
    }

    pub fn sign_in(&self, user: User) {
        let mut inner = self.inner.lock().expect("auth state poisoned");
        info!("Signed in: {}", user.email);
        inner.current = Some(user);
        Self::notify(&inner);
    }

    pub fn sign_out(&self) {
        let mut inner = self.inner.lock().expect("auth state poisoned");
        if let Some(user) = &inner.current {
            info!("Signed out: {}", user.email);
        }
        inner.current = None;
        Self::notify(&inner);
    }

    fn notify(inner: &AuthInner) {
        for callback in inner.subscribers.values() {
            callback(inner.current.as_ref());
        }
    }
}
