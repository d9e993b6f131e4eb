//! Fixed items shown instead of results when something needs the user's attention.

use crate::gate::GateError;
use twitchy_core::models::{Action, BuiltinIcon, DisplayItem, Icon};

pub const MISSING_CREDENTIALS: &str = "Missing credentials";
pub const UNABLE_TO_LOGIN: &str = "Unable to login";
pub const CLIENT_ID_FAILED: &str = "Client ID failed!";
pub const USER_TOKEN_REQUIRED: &str = "User token required";

fn error_item(title: &str) -> DisplayItem {
    DisplayItem::new(title).icon(Icon::Builtin(BuiltinIcon::Error))
}

/// The single item shown while the session is unauthenticated. Typing a
/// client id and activating the item stores it.
pub fn credentials(err: &GateError, query: &str) -> DisplayItem {
    if !err.needs_credentials() {
        return unable_to_login();
    }
    let typed = query.trim();
    if typed.is_empty() {
        return error_item(MISSING_CREDENTIALS)
            .subtitle("Type your Twitch client id and press enter")
            .icon(Icon::Builtin(BuiltinIcon::Settings));
    }
    error_item(MISSING_CREDENTIALS)
        .subtitle(format!("Press enter to use '{typed}' as client id"))
        .icon(Icon::Builtin(BuiltinIcon::Settings))
        .action(Action::SetClientId {
            client_id: typed.to_string(),
        })
}

/// Informational only. Resetting credentials stays an explicit command.
pub fn unable_to_login() -> DisplayItem {
    error_item(UNABLE_TO_LOGIN)
        .subtitle("Check your Twitch credentials in the plugin settings")
}

pub fn user_token_required() -> DisplayItem {
    error_item(USER_TOKEN_REQUIRED)
        .subtitle(
            "Followed channels need a user access token with user:read:follows in oauth_token",
        )
        .icon(Icon::Builtin(BuiltinIcon::Settings))
}

pub fn client_id_failed(reason: &str) -> DisplayItem {
    error_item(CLIENT_ID_FAILED).subtitle(reason.to_string())
}

pub fn action_failed(reason: &str) -> DisplayItem {
    error_item("Action failed").subtitle(reason.to_string())
}

pub fn settings_reset() -> DisplayItem {
    DisplayItem::new("Settings reset")
        .subtitle("Type your Twitch client id and press enter")
        .icon(Icon::Builtin(BuiltinIcon::Cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use twitchy_core::settings::SettingKey;

    #[test]
    fn typed_text_becomes_client_id_action() {
        let err = GateError::CredentialMissing {
            key: SettingKey::ClientId,
        };
        let item = credentials(&err, " abc123 ");
        assert_eq!(item.title, MISSING_CREDENTIALS);
        assert_eq!(
            item.action,
            Action::SetClientId {
                client_id: "abc123".into()
            }
        );
        assert_eq!(credentials(&err, "").action, Action::None);
    }

    #[test]
    fn unreachable_is_unable_to_login() {
        let err = GateError::Unreachable {
            message: "dns".into(),
        };
        let item = credentials(&err, "x");
        assert_eq!(item.title, UNABLE_TO_LOGIN);
        assert_eq!(item.action, Action::None);
    }
}
