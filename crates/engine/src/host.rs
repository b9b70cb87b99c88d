//! In-process host backend.
//!
//! Answers the registered commands from facts about the machine it runs on:
//! operating system, CPU architecture, the Steam install and the launcher
//! paths of the supported games.

use crate::commands::CommandName;
use crate::config::HostConfig;
use crate::transport::{Transport, TransportError, TransportResult};
use crate::types::{GamePaths, OperatingSystemType, RequirementState, Requirements};
use serde_json::Value;
use std::path::{Path, PathBuf};
use steamlocate::SteamDir;

const MW3_APP_ID: u32 = 115300;
const BO2_APP_ID: u32 = 202970;
const BO2_MP_APP_ID: u32 = 202990;
const BO1_APP_ID: u32 = 42700;
const BO1_MP_APP_ID: u32 = 42710;
const WAW_APP_ID: u32 = 10090;

const SUPPORTED_ARCH: &str = "x86_64";

pub struct HostBackend {
    os: Option<OperatingSystemType>,
    arch: String,
    /// Candidate Steam installs. Empty means "wherever Steam is installed".
    steam_dirs: Vec<PathBuf>,
    setup_marker: Option<PathBuf>,
}

impl HostBackend {
    pub fn new(
        os: Option<OperatingSystemType>,
        arch: impl Into<String>,
        steam_dirs: Vec<PathBuf>,
        setup_marker: Option<PathBuf>,
    ) -> Self {
        Self {
            os,
            arch: arch.into(),
            steam_dirs,
            setup_marker,
        }
    }

    /// Backend for the current machine. Configured Steam directories replace
    /// the platform's usual Steam location when given.
    pub fn detect(config: &HostConfig) -> Self {
        let info = os_info::get();
        let arch = info.architecture().unwrap_or("unknown");
        tracing::debug!(os = %info.os_type(), arch, "detected host platform");
        Self::new(
            current_os(),
            arch,
            config.steam_dirs.clone(),
            config.setup_marker.clone(),
        )
    }

    pub fn operating_system_type(&self) -> TransportResult<OperatingSystemType> {
        self.os.ok_or_else(|| {
            TransportError::Rejected(Value::String(format!(
                "unsupported operating system: {}",
                std::env::consts::OS
            )))
        })
    }

    pub fn requirements(&self) -> Requirements {
        let operating_system = match self.os {
            Some(OperatingSystemType::Linux) => RequirementState::Met,
            other => {
                let name = other.map(|os| os.as_str()).unwrap_or(std::env::consts::OS);
                RequirementState::not_met(format!(
                    "The current operating system ({}) is not supported - Linux is required. \
                     If you're using Windows, please use the Plutonium Launcher \
                     (https://plutonium.pw/) instead.",
                    name
                ))
            }
        };

        let architecture = if self.arch == SUPPORTED_ARCH {
            RequirementState::Met
        } else {
            RequirementState::not_met(format!(
                "The current operating system architecture ({}) is not supported. The only \
                 supported architecture is x86_64 (the standard for Intel and AMD CPUs).",
                self.arch
            ))
        };

        let steam_dir = self.locate_steam();
        let steam = if steam_dir.is_some() {
            RequirementState::Met
        } else {
            RequirementState::not_met(
                "Steam is not installed or could not be found. If you are sure Steam is \
                 installed, please make sure that it has been ran at least once.",
            )
        };

        let paths = match steam_dir {
            Some(ref dir) => {
                let find = |app_id| launcher_path(dir, app_id);
                GamePaths {
                    mw3: find(MW3_APP_ID),
                    bo2: find(BO2_APP_ID),
                    bo2_mp: find(BO2_MP_APP_ID),
                    bo1: find(BO1_APP_ID),
                    bo1_mp: find(BO1_MP_APP_ID),
                    waw: find(WAW_APP_ID),
                }
            }
            None => GamePaths::default(),
        };

        Requirements::new(operating_system, architecture, steam, paths)
    }

    /// Setup is complete once the setup marker exists.
    pub fn is_setup(&self) -> bool {
        self.setup_marker
            .as_deref()
            .map(Path::exists)
            .unwrap_or(false)
    }

    fn locate_steam(&self) -> Option<SteamDir> {
        if self.steam_dirs.is_empty() {
            return match SteamDir::locate() {
                Ok(dir) => Some(dir),
                Err(e) => {
                    tracing::debug!(error = %e, "steam install not found");
                    None
                }
            };
        }
        self.steam_dirs
            .iter()
            .filter(|dir| dir.join("steamapps").is_dir())
            .find_map(|dir| SteamDir::from_dir(dir).ok())
    }

    /// Run one registered command locally.
    pub fn handle(&self, command: CommandName) -> TransportResult<Value> {
        let value = match command {
            CommandName::GetOperatingSystemType => {
                serde_json::to_value(self.operating_system_type()?)
            }
            CommandName::GetRequirements => serde_json::to_value(self.requirements()),
            CommandName::IsSetup => Ok(Value::Bool(self.is_setup())),
        };
        value.map_err(|e| TransportError::Protocol(format!("cannot encode response: {}", e)))
    }
}

#[async_trait::async_trait]
impl Transport for HostBackend {
    async fn invoke(&self, command: &str, _args: Option<Value>) -> TransportResult<Value> {
        let name: CommandName = command.parse().map_err(|_| {
            TransportError::Rejected(Value::String(format!("command {} not found", command)))
        })?;
        tracing::debug!(command, "host backend handling command");
        self.handle(name)
    }
}

pub fn current_os() -> Option<OperatingSystemType> {
    match std::env::consts::OS {
        "linux" => Some(OperatingSystemType::Linux),
        "macos" => Some(OperatingSystemType::MacOS),
        "windows" => Some(OperatingSystemType::Windows),
        _ => None,
    }
}

/// Launcher path Steam recorded for `app_id`, searching every library.
fn launcher_path(steam: &SteamDir, app_id: u32) -> Option<PathBuf> {
    match steam.find_app(app_id) {
        Ok(Some((app, _library))) => app.launcher_path,
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(app_id, error = %e, "steam app lookup failed");
            None
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_steam(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "engine_host_{}_{}",
            tag,
            &crate::types::new_run_id()[..8]
        ));
        std::fs::create_dir_all(dir.join("steamapps").join("common")).unwrap();
        dir
    }

    /// Write `libraryfolders.vdf` listing `libraries`, already escaped for
    /// Valve's KeyValues format.
    fn write_library_folders(steam: &Path, libraries: &[&str]) {
        let mut vdf = String::from("\"libraryfolders\"\n{\n");
        for (i, path) in libraries.iter().enumerate() {
            vdf.push_str(&format!(
                "\t\"{}\"\n\t{{\n\t\t\"path\"\t\t\"{}\"\n\t\t\"label\"\t\t\"\"\n\t}}\n",
                i, path
            ));
        }
        vdf.push_str("}\n");
        std::fs::write(steam.join("steamapps").join("libraryfolders.vdf"), vdf).unwrap();
    }

    /// Write an app manifest and return the launcher path it records.
    fn write_manifest(library: &Path, app_id: u32, install_dir: &str) -> PathBuf {
        let steamapps = library.join("steamapps");
        std::fs::create_dir_all(&steamapps).unwrap();
        let launcher = PathBuf::from(format!("/opt/launchers/{}/launcher.exe", app_id));
        std::fs::write(
            steamapps.join(format!("appmanifest_{}.acf", app_id)),
            format!(
                "\"AppState\"\n{{\n\t\"appid\"\t\t\"{}\"\n\t\"name\"\t\t\"{}\"\n\t\"installdir\"\t\t\"{}\"\n\t\"LauncherPath\"\t\t\"{}\"\n}}\n",
                app_id,
                install_dir,
                install_dir,
                launcher.display()
            ),
        )
        .unwrap();
        launcher
    }

    #[test]
    fn test_requirements_on_supported_machine() {
        let steam = temp_steam("ok");
        let extra = temp_steam("lib");
        write_library_folders(
            &steam,
            &[&steam.display().to_string(), &extra.display().to_string()],
        );
        let mw3 = write_manifest(&steam, MW3_APP_ID, "Call of Duty Modern Warfare 3");
        let bo2 = write_manifest(&extra, BO2_APP_ID, "Call of Duty Black Ops II");

        let host = HostBackend::new(
            Some(OperatingSystemType::Linux),
            "x86_64",
            vec![PathBuf::from("/nonexistent/steam"), steam.clone()],
            None,
        );
        let reqs = host.requirements();

        assert!(reqs.all_met);
        assert_eq!(reqs.mw3_path, Some(mw3));
        assert_eq!(reqs.bo2_path, Some(bo2));
        assert_eq!(reqs.waw_path, None);

        let _ = std::fs::remove_dir_all(&steam);
        let _ = std::fs::remove_dir_all(&extra);
    }

    #[test]
    fn test_library_path_with_escaped_quote() {
        let steam = temp_steam("main");
        let quoted = std::env::temp_dir().join(format!(
            "engine_host_\"games\"_{}",
            &crate::types::new_run_id()[..8]
        ));
        std::fs::create_dir_all(quoted.join("steamapps").join("common")).unwrap();
        let escaped = quoted.display().to_string().replace('"', "\\\"");
        write_library_folders(&steam, &[&steam.display().to_string(), &escaped]);
        let mw3 = write_manifest(&quoted, MW3_APP_ID, "Call of Duty Modern Warfare 3");

        let host = HostBackend::new(
            Some(OperatingSystemType::Linux),
            "x86_64",
            vec![steam.clone()],
            None,
        );
        assert_eq!(host.requirements().mw3_path, Some(mw3));

        let _ = std::fs::remove_dir_all(&steam);
        let _ = std::fs::remove_dir_all(&quoted);
    }

    #[test]
    fn test_requirements_on_unsupported_machine() {
        let host = HostBackend::new(
            Some(OperatingSystemType::Windows),
            "aarch64",
            vec![PathBuf::from("/nonexistent/steam")],
            None,
        );
        let reqs = host.requirements();

        assert!(!reqs.all_met);
        assert!(reqs
            .operating_system
            .message()
            .unwrap()
            .contains("(Windows)"));
        assert!(reqs.architecture.message().unwrap().contains("(aarch64)"));
        assert!(!reqs.steam.is_met());
        assert_eq!(reqs.mw3_path, None);
    }

    #[test]
    fn test_setup_marker() {
        let marker = std::env::temp_dir().join(format!(
            "engine_setup_{}",
            &crate::types::new_run_id()[..8]
        ));
        let host = HostBackend::new(None, "x86_64", vec![], Some(marker.clone()));
        assert!(!host.is_setup());

        std::fs::write(&marker, b"done").unwrap();
        assert!(host.is_setup());
        let _ = std::fs::remove_file(&marker);

        let no_marker = HostBackend::new(None, "x86_64", vec![], None);
        assert!(!no_marker.is_setup());
    }

    #[tokio::test]
    async fn test_transport_answers_registered_commands() {
        let host = HostBackend::new(Some(OperatingSystemType::MacOS), "x86_64", vec![], None);
        assert_eq!(
            host.invoke("get_operating_system_type", None).await.unwrap(),
            serde_json::json!("MacOS")
        );
        assert_eq!(
            host.invoke("is_setup", None).await.unwrap(),
            serde_json::json!(false)
        );

        let err = host.invoke("launch_game", None).await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_unknown_os_is_rejected() {
        let host = HostBackend::new(None, "x86_64", vec![], None);
        let err = host
            .invoke("get_operating_system_type", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
    }
}
