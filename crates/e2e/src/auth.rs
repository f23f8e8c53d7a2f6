//! Multi-step login against the platform API
//!
//! The platform authenticates in four requests sharing one session ID:
//! start, check login, commit password, finish. The session cookie ends up
//! in the transport's cookie store.

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use signage_common::TestUser;

use crate::client::Transport;
use crate::error::{E2eError, E2eResult};

const URL_START: &str = "/auth/login/multi_step/start";
const URL_CHECK_LOGIN: &str = "/auth/login/multi_step/check_login";
const URL_COMMIT_PASSWORD: &str = "/auth/login/multi_step/commit_pwd";
const URL_FINISH: &str = "/auth/login/multi_step/finish";
const URL_LOGOUT: &str = "/users/logout";

#[derive(Debug, Deserialize)]
struct StartResponse {
    session_id: String,
}

pub struct MultistepAuth<T: Transport> {
    transport: T,
    session_id: Option<String>,
}

impl<T: Transport> MultistepAuth<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session_id: None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Hand back the transport, now carrying the session
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn require_session(&self) -> E2eResult<&str> {
        self.session_id
            .as_deref()
            .ok_or_else(|| E2eError::Auth("no session; call start() first".to_string()))
    }

    /// Step 1: obtain a session ID
    pub fn start(&mut self) -> E2eResult<()> {
        let response = self
            .transport
            .post(URL_START, None)?
            .require_success("could not start login session")?;
        let start: StartResponse = response.json()?;
        self.session_id = Some(start.session_id);
        Ok(())
    }

    /// Step 2: check login
    pub fn check_login(&self, login: &str) -> E2eResult<()> {
        let body = json!({ "session_id": self.require_session()?, "login": login });
        self.transport
            .post(URL_CHECK_LOGIN, Some(&body))?
            .require_success(format!("login {} rejected", login))?;
        Ok(())
    }

    /// Step 3: commit and check password
    pub fn commit_password(&self, password: &str) -> E2eResult<()> {
        let body = json!({ "session_id": self.require_session()?, "password": password });
        self.transport
            .post(URL_COMMIT_PASSWORD, Some(&body))?
            .require_success("password rejected")?;
        Ok(())
    }

    /// Step 4: finish the procedure
    pub fn finish(&self) -> E2eResult<()> {
        let body = json!({ "session_id": self.require_session()? });
        self.transport
            .post(URL_FINISH, Some(&body))?
            .require_success("could not finish login")?;
        Ok(())
    }

    pub fn login(&mut self, user: &TestUser) -> E2eResult<()> {
        self.start()?;
        self.check_login(&user.email)?;
        self.commit_password(&user.password)?;
        self.finish()?;
        info!("Logged in as {}", user.email);
        Ok(())
    }

    pub fn logout(&mut self) -> E2eResult<()> {
        self.transport
            .post(URL_LOGOUT, None)?
            .require_success("could not log out")?;
        self.session_id = None;
        Ok(())
    }
}
