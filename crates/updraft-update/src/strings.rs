//! User-facing message strings
//!
//! The engine never renders dialogs itself, but hosts need the same
//! messages in the user's language. [`BuiltinStrings`] ships English and
//! French; hosts with their own translations implement [`StringTable`].

use std::fmt;

/// Presentation language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    French,
}

impl Locale {
    /// Resolve a language tag such as `fr`, `fr-CA` or `fr_FR.UTF-8`
    ///
    /// Anything that is not French falls back to English.
    pub fn from_tag(tag: &str) -> Self {
        let language = tag
            .split(['-', '_', '.'])
            .next()
            .unwrap_or_default()
            .trim();
        if language.eq_ignore_ascii_case("fr") {
            Self::French
        } else {
            Self::English
        }
    }

    /// Two-letter language code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::French => "fr",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Identifier of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKey {
    UpdateChecking,
    UpdateAvailable,
    CurrentVersion,
    UpdateVersion,
    LatestVersionInstalled,
    NoInternetConnection,
    AlreadyRunning,
    CheckError,
    StartingDownload,
    VerifyingDownload,
    DownloadCancelled,
    DownloadError,
    ChecksumMismatch,
    HandoffStarted,
    HandoffFailed,
    DownloadedTag,
    OfTag,
    AtTag,
    TimeRemaining,
}

impl StringKey {
    pub const ALL: [StringKey; 19] = [
        Self::UpdateChecking,
        Self::UpdateAvailable,
        Self::CurrentVersion,
        Self::UpdateVersion,
        Self::LatestVersionInstalled,
        Self::NoInternetConnection,
        Self::AlreadyRunning,
        Self::CheckError,
        Self::StartingDownload,
        Self::VerifyingDownload,
        Self::DownloadCancelled,
        Self::DownloadError,
        Self::ChecksumMismatch,
        Self::HandoffStarted,
        Self::HandoffFailed,
        Self::DownloadedTag,
        Self::OfTag,
        Self::AtTag,
        Self::TimeRemaining,
    ];
}

/// Lookup of localized messages
pub trait StringTable: Send + Sync {
    fn get(&self, key: StringKey, locale: Locale) -> &str;
}

/// English and French messages compiled into the engine
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinStrings;

impl StringTable for BuiltinStrings {
    fn get(&self, key: StringKey, locale: Locale) -> &str {
        match locale {
            Locale::English => english(key),
            Locale::French => french(key),
        }
    }
}

fn english(key: StringKey) -> &'static str {
    match key {
        StringKey::UpdateChecking => "Checking for updates",
        StringKey::UpdateAvailable => "A new version is available. Do you want to update now?",
        StringKey::CurrentVersion => "Current version:",
        StringKey::UpdateVersion => "New version:",
        StringKey::LatestVersionInstalled => "You already have the latest version installed.",
        StringKey::NoInternetConnection => "No internet connection is available.",
        StringKey::AlreadyRunning => "An update check is already running.",
        StringKey::CheckError => "An error occurred while checking for updates.",
        StringKey::StartingDownload => "Starting download...",
        StringKey::VerifyingDownload => "Verifying download...",
        StringKey::DownloadCancelled => "The download was cancelled.",
        StringKey::DownloadError => "The update could not be downloaded. Please try again later.",
        StringKey::ChecksumMismatch => "The downloaded file is corrupted and was discarded.",
        StringKey::HandoffStarted => "The update will be installed once the application closes.",
        StringKey::HandoffFailed => "The update could not be installed.",
        StringKey::DownloadedTag => "Downloaded",
        StringKey::OfTag => "of",
        StringKey::AtTag => "at",
        StringKey::TimeRemaining => "Estimated time remaining:",
    }
}

fn french(key: StringKey) -> &'static str {
    match key {
        StringKey::UpdateChecking => "Recherche de mises à jour",
        StringKey::UpdateAvailable => {
            "Une nouvelle version est disponible. Voulez-vous mettre à jour maintenant ?"
        }
        StringKey::CurrentVersion => "Version actuelle :",
        StringKey::UpdateVersion => "Nouvelle version :",
        StringKey::LatestVersionInstalled => "Vous avez déjà la dernière version installée.",
        StringKey::NoInternetConnection => "Aucune connexion Internet n'est disponible.",
        StringKey::AlreadyRunning => "Une recherche de mises à jour est déjà en cours.",
        StringKey::CheckError => {
            "Une erreur est survenue lors de la recherche de mises à jour."
        }
        StringKey::StartingDownload => "Démarrage du téléchargement...",
        StringKey::VerifyingDownload => "Vérification du téléchargement...",
        StringKey::DownloadCancelled => "Le téléchargement a été annulé.",
        StringKey::DownloadError => {
            "La mise à jour n'a pas pu être téléchargée. Veuillez réessayer plus tard."
        }
        StringKey::ChecksumMismatch => "Le fichier téléchargé est corrompu et a été supprimé.",
        StringKey::HandoffStarted => {
            "La mise à jour sera installée à la fermeture de l'application."
        }
        StringKey::HandoffFailed => "La mise à jour n'a pas pu être installée.",
        StringKey::DownloadedTag => "Téléchargé",
        StringKey::OfTag => "sur",
        StringKey::AtTag => "à",
        StringKey::TimeRemaining => "Temps restant estimé :",
    }
}
