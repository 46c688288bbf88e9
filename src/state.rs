use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    cache::KeyValueCache,
    config::Config,
    services::{otp::OtpMailer, question_cache::QuestionCache, start_marker::StartMarkers},
    store::{AdminStore, AttemptStore, QuestionStore, UserStore},
};

/// Everything a handler may touch. Collaborators are injected, so tests swap
/// in `MemoryStore` / `MemoryCache` without touching the handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub questions: Arc<dyn QuestionStore>,
    pub attempts: Arc<dyn AttemptStore>,
    pub users: Arc<dyn UserStore>,
    pub admins: Arc<dyn AdminStore>,
    pub cache: Arc<dyn KeyValueCache>,
    pub mailer: Arc<dyn OtpMailer>,
    pub question_cache: QuestionCache,
    pub start_markers: StartMarkers,
}

impl AppState {
    /// Wires one store object that implements every storage trait.
    pub fn new<S>(
        config: Config,
        store: Arc<S>,
        cache: Arc<dyn KeyValueCache>,
        mailer: Arc<dyn OtpMailer>,
    ) -> Self
    where
        S: QuestionStore + AttemptStore + UserStore + AdminStore + 'static,
    {
        let questions: Arc<dyn QuestionStore> = store.clone();
        let attempts: Arc<dyn AttemptStore> = store.clone();
        let users: Arc<dyn UserStore> = store.clone();
        let admins: Arc<dyn AdminStore> = store;

        Self {
            question_cache: QuestionCache::new(cache.clone(), questions.clone()),
            start_markers: StartMarkers::new(cache.clone()),
            config,
            questions,
            attempts,
            users,
            admins,
            cache,
            mailer,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
