use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};
use url::Url;

use super::{AuthError, EnvSource, Result};

pub const APP_URL_ENV: &str = "APP_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OAuthProviderKind {
    Discord,
    Google,
    Github,
    Twitter,
    Notion,
    Spotify,
}

impl OAuthProviderKind {
    fn env_prefix(self) -> String {
        format!("AUTH_{}", self.to_string().to_uppercase())
    }

    pub fn client_id_var(self) -> String {
        format!("{}_ID", self.env_prefix())
    }

    pub fn client_secret_var(self) -> String {
        format!("{}_SECRET", self.env_prefix())
    }

    /// Identity providers whose verified emails may be linked to an existing account.
    pub fn links_accounts_by_email(self) -> bool {
        matches!(
            self,
            OAuthProviderKind::Discord
                | OAuthProviderKind::Google
                | OAuthProviderKind::Github
                | OAuthProviderKind::Twitter
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuthProviderConfig {
    pub kind: OAuthProviderKind,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub allow_dangerous_email_account_linking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<Url>,
}

/// Providers whose `AUTH_<NAME>_ID` and `AUTH_<NAME>_SECRET` are both set, in declaration order.
pub fn configured_providers(env: &impl EnvSource) -> Result<Vec<OAuthProviderConfig>> {
    let mut providers = Vec::new();

    for kind in OAuthProviderKind::iter() {
        let (Some(client_id), Some(client_secret)) =
            (env.var(&kind.client_id_var()), env.var(&kind.client_secret_var()))
        else {
            tracing::debug!(provider = %kind, "OAuth provider not configured");
            continue;
        };

        let redirect_uri = match kind {
            OAuthProviderKind::Notion => Some(notion_redirect_uri(env)?),
            _ => None,
        };

        providers.push(OAuthProviderConfig {
            kind,
            client_id,
            client_secret,
            allow_dangerous_email_account_linking: kind.links_accounts_by_email(),
            redirect_uri,
        });
    }

    Ok(providers)
}

fn notion_redirect_uri(env: &impl EnvSource) -> Result<Url> {
    let app_url = env
        .var(APP_URL_ENV)
        .ok_or_else(|| AuthError::MissingVar(APP_URL_ENV.to_string()))?;

    let raw = format!("{}/api/auth/callback/notion", app_url.trim_end_matches('/'));
    Url::parse(&raw).map_err(|e| AuthError::InvalidVar {
        var: APP_URL_ENV.to_string(),
        message: e.to_string(),
    })
}
