use altbot_social::Account;

use crate::settings::EngineSettings;

/// Do-not-interact check: the bot itself, bots (when configured) and accounts
/// whose bio carries one of the configured tags are left alone.
pub fn is_dni(account: &Account, settings: &EngineSettings) -> bool {
    if account.acct == settings.bot_username {
        return true;
    }
    if account.bot && settings.dni.ignore_bots {
        return true;
    }
    settings
        .dni
        .tags
        .iter()
        .filter(|tag| !tag.is_empty())
        .any(|tag| account.note.contains(tag.as_str()))
}
