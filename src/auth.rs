use crate::loader::{DataLoader, LoadError};
use crate::models::{AuthRequest, AuthResponse, Banner, Severity};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Signup,
    GoogleAuth,
}

impl AuthAction {
    pub fn path(&self) -> &'static str {
        match self {
            AuthAction::Login => "/login",
            AuthAction::Signup => "/signup",
            AuthAction::GoogleAuth => "/google_auth",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AuthAction::Login => "Login",
            AuthAction::Signup => "Signup",
            AuthAction::GoogleAuth => "Google sign-in",
        }
    }
}

/// Posts credentials to the site's auth endpoints and turns the reply into a banner.
pub struct AuthClient<'a> {
    loader: &'a DataLoader,
}

impl<'a> AuthClient<'a> {
    pub fn new(loader: &'a DataLoader) -> Self {
        Self { loader }
    }

    pub async fn submit(&self, action: AuthAction, username: &str, password: &str) -> Banner {
        let username = username.trim();
        if let Some(banner) = validate(action, username, password) {
            return banner;
        }

        let request = AuthRequest { username, password };
        let reply = self
            .loader
            .post_json::<_, AuthResponse>(action.path(), &request)
            .await;

        match &reply {
            Ok(response) => info!(path = action.path(), success = response.success, "auth reply"),
            Err(err) => warn!(path = action.path(), error = %err, "auth request failed"),
        }

        banner_for(action, reply)
    }
}

fn validate(action: AuthAction, username: &str, password: &str) -> Option<Banner> {
    if username.is_empty() {
        return Some(Banner::new(Severity::Warning, "Please enter a username."));
    }
    if action != AuthAction::GoogleAuth && password.is_empty() {
        return Some(Banner::new(Severity::Warning, "Please enter a password."));
    }
    None
}

pub fn banner_for(action: AuthAction, reply: Result<AuthResponse, LoadError>) -> Banner {
    match reply {
        Ok(response) if response.success => {
            let message = if response.message.is_empty() {
                format!("{} successful.", action.label())
            } else {
                response.message
            };
            Banner::new(Severity::Info, message)
        }
        Ok(response) => {
            let message = if response.message.is_empty() {
                format!("{} failed.", action.label())
            } else {
                response.message
            };
            Banner::new(Severity::Error, message)
        }
        Err(err) => Banner::new(
            Severity::Error,
            format!("{} failed: could not reach the server ({})", action.label(), err),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{local_config, serve_once};
    use tempfile::tempdir;

    #[test]
    fn successful_reply_is_an_info_banner() {
        let banner = banner_for(
            AuthAction::Login,
            Ok(AuthResponse {
                success: true,
                message: "Welcome back, asha".to_string(),
            }),
        );
        assert_eq!(banner, Banner::new(Severity::Info, "Welcome back, asha"));
    }

    #[test]
    fn rejected_reply_without_message_gets_a_default() {
        let banner = banner_for(
            AuthAction::Signup,
            Ok(AuthResponse {
                success: false,
                message: String::new(),
            }),
        );
        assert_eq!(banner.severity, Severity::Error);
        assert_eq!(banner.message, "Signup failed.");
    }

    #[test]
    fn transport_error_is_an_error_banner() {
        let banner = banner_for(AuthAction::Login, Err(LoadError::NoBaseUrl("/login".into())));
        assert_eq!(banner.severity, Severity::Error);
        assert!(banner.message.starts_with("Login failed: could not reach the server"));
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_before_any_request() {
        let tmp = tempdir().unwrap();
        let loader = DataLoader::new(&local_config(tmp.path()));
        let client = AuthClient::new(&loader);

        let banner = client.submit(AuthAction::Login, "  ", "secret").await;
        assert_eq!(banner.severity, Severity::Warning);

        let banner = client.submit(AuthAction::Signup, "asha", "").await;
        assert_eq!(banner.message, "Please enter a password.");
    }

    #[tokio::test]
    async fn posts_credentials_as_json() {
        let tmp = tempdir().unwrap();
        let (base, server) = serve_once(
            "200 OK",
            r#"{"success": true, "message": "Signed up"}"#.to_string(),
        )
        .await;

        let mut config = local_config(tmp.path());
        config.base_url = Some(base);
        let loader = DataLoader::new(&config);

        let banner = AuthClient::new(&loader)
            .submit(AuthAction::Signup, " asha ", "pw123")
            .await;
        assert_eq!(banner, Banner::new(Severity::Info, "Signed up"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /signup"));
        assert!(request.ends_with(r#"{"username":"asha","password":"pw123"}"#));
    }

    #[tokio::test]
    async fn failed_login_reply_surfaces_server_message() {
        let tmp = tempdir().unwrap();
        let (base, server) = serve_once(
            "401 Unauthorized",
            r#"{"success": false, "message": "Invalid credentials"}"#.to_string(),
        )
        .await;

        let mut config = local_config(tmp.path());
        config.base_url = Some(base);
        let loader = DataLoader::new(&config);

        let banner = AuthClient::new(&loader)
            .submit(AuthAction::Login, "asha", "wrong")
            .await;
        assert_eq!(banner, Banner::new(Severity::Error, "Invalid credentials"));
        server.await.unwrap();
    }
}
