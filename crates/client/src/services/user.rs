//! Account endpoints and local session upkeep.

use std::path::Path;

use serde_json::{Value, json};
use shopfront_core::storage::UserSession;
use shopfront_core::{DataCache, EventBus, Topic};

use super::types::{LoginResult, SendCodeResult, UpdateUserParams, UploadResult, UserInfo};
use crate::error::ApiError;
use crate::request::{ApiClient, UploadOptions};

#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
    session: UserSession,
    data: DataCache,
    events: EventBus,
}

impl UserService {
    pub fn new(api: ApiClient, session: UserSession, data: DataCache, events: EventBus) -> Self {
        Self { api, session, data, events }
    }

    pub async fn send_code(&self, phone: &str) -> Result<SendCodeResult, ApiError> {
        self.api.post("/user/send-code", &json!({ "phone": phone })).await
    }

    /// Log in with a phone verification code and persist the session.
    pub async fn login(&self, phone: &str, code: &str) -> Result<LoginResult, ApiError> {
        let result: LoginResult = self
            .api
            .post("/user/login", &json!({ "phone": phone, "code": code }))
            .await?;

        self.session.set_token(&result.token).await;
        self.remember(&result.user_info).await;
        self.emit(Topic::UserLogin, &result.user_info);
        tracing::info!(user_id = %result.user_info.id, "logged in");

        Ok(result)
    }

    /// End the session. Local state is cleared even when the server call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.api.post::<Value, _>("/user/logout", &()).await;

        self.session.clear().await;
        self.data.remove_user().await;
        self.events.emit(Topic::UserLogout, &Value::Null);

        result.map(|_| ())
    }

    /// Fetch the profile from the server and refresh the local copies.
    pub async fn user_info(&self) -> Result<UserInfo, ApiError> {
        let info: UserInfo = self.api.get("/user/info", &()).await?;
        self.remember(&info).await;
        Ok(info)
    }

    /// Last known profile, without a network call.
    pub async fn cached_user_info(&self) -> Option<UserInfo> {
        match self.data.user::<UserInfo>().await {
            Some(info) => Some(info),
            None => self.session.user_info::<UserInfo>().await,
        }
    }

    pub async fn update_user_info(&self, params: &UpdateUserParams) -> Result<UserInfo, ApiError> {
        let info: UserInfo = self.api.put("/user/info", params).await?;
        self.remember(&info).await;
        self.emit(Topic::UserInfoUpdate, &info);
        Ok(info)
    }

    pub async fn upload_avatar(&self, file_path: impl AsRef<Path>) -> Result<UploadResult, ApiError> {
        self.api
            .upload("/user/avatar", file_path, "avatar", UploadOptions::default())
            .await
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.is_logged_in().await
    }

    async fn remember(&self, info: &UserInfo) {
        self.session.set_user_info(info).await;
        self.data.set_user(info).await;
    }

    fn emit(&self, topic: Topic, info: &UserInfo) {
        match serde_json::to_value(info) {
            Ok(payload) => {
                self.events.emit(topic, &payload);
            }
            Err(e) => tracing::error!(error = %e, "user info not serializable"),
        }
    }
}
