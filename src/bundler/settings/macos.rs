//! Signing and notarization configuration.

/// macOS signing and notarization configuration.
///
/// The identity and credential profile arrive as explicit parameters from
/// the CLI edge (`BUNDLE_SIGNING_IDENTITY`, `BUNDLE_NOTARY_PROFILE`); the
/// stages never read the environment themselves.
#[derive(Clone, Debug, Default)]
pub struct MacOsSettings {
    /// Code signing identity name.
    ///
    /// Example: "Developer ID Application: Your Name (TEAMID)".
    /// Use "-" for ad-hoc signing (development only).
    pub signing_identity: Option<String>,

    /// Keychain credential profile for the notarization service.
    pub notary_profile: Option<String>,

    /// Minimum macOS version (LSMinimumSystemVersion).
    pub minimum_system_version: Option<String>,

    /// Skip stapling the notarization ticket.
    ///
    /// Stapling attaches the ticket to the image so offline verification
    /// succeeds later. Only skip for testing.
    pub skip_stapling: bool,
}
