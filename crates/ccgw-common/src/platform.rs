use serde::Serialize;

const CLI_VERSION: &str = "0.1.5";

/// Platform identifiers accepted by `loadCodeAssist`/`onboardUser` client
/// metadata. Mirrors `gemini-cli`'s own enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Platform {
    #[serde(rename = "DARWIN_ARM64")]
    DarwinArm64,
    #[serde(rename = "DARWIN_AMD64")]
    DarwinAmd64,
    #[serde(rename = "LINUX_ARM64")]
    LinuxArm64,
    #[serde(rename = "LINUX_AMD64")]
    LinuxAmd64,
    #[serde(rename = "WINDOWS_AMD64")]
    WindowsAmd64,
    #[serde(rename = "PLATFORM_UNSPECIFIED")]
    Unspecified,
}

impl Platform {
    pub fn detect() -> Self {
        let system = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        match system {
            "macos" => match arch {
                "aarch64" => Platform::DarwinArm64,
                _ => Platform::DarwinAmd64,
            },
            "linux" => match arch {
                "aarch64" => Platform::LinuxArm64,
                _ => Platform::LinuxAmd64,
            },
            "windows" => Platform::WindowsAmd64,
            _ => Platform::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    pub ide_type: &'static str,
    pub platform: Platform,
    pub plugin_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duet_project: Option<String>,
}

pub fn client_metadata(project_id: Option<&str>) -> ClientMetadata {
    ClientMetadata {
        ide_type: "IDE_UNSPECIFIED",
        platform: Platform::detect(),
        plugin_type: "GEMINI",
        duet_project: project_id.map(|value| value.to_string()),
    }
}

/// `GeminiCLI/<version> (<uname -s>; <uname -m>)`, matching the upstream CLI's
/// own User-Agent format so Cloud Code Assist treats us the same way.
pub fn user_agent() -> String {
    let system = match std::env::consts::OS {
        "macos" => "Darwin",
        "linux" => "Linux",
        "windows" => "Windows",
        other => other,
    };
    let arch = std::env::consts::ARCH;
    format!("GeminiCLI/{CLI_VERSION} ({system}; {arch})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_has_expected_prefix() {
        assert!(user_agent().starts_with("GeminiCLI/0.1.5 ("));
    }

    #[test]
    fn client_metadata_includes_project_when_present() {
        let meta = client_metadata(Some("proj-1"));
        assert_eq!(meta.duet_project.as_deref(), Some("proj-1"));
        let meta = client_metadata(None);
        assert!(meta.duet_project.is_none());
    }
}
