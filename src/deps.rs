//! Startup checks for the external tools, with best-effort installation.

use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::Config;

/// Outcome of checking one external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    /// Found; first line of its version output
    Present(String),
    /// Was missing and has just been installed
    Installed,
    /// Still missing; what the user should do about it
    Missing(String),
}

#[derive(Debug, Clone)]
pub struct DependencyReport {
    pub tool: String,
    pub status: DependencyStatus,
}

impl DependencyReport {
    /// Text for the user, if this report deserves a notice
    pub fn notice(&self) -> Option<String> {
        match &self.status {
            DependencyStatus::Present(_) => None,
            DependencyStatus::Installed => Some(format!("{} installed successfully!", self.tool)),
            DependencyStatus::Missing(hint) => Some(hint.clone()),
        }
    }
}

/// Runs `<program> <version_arg>`; returns the first output line on success.
pub async fn check_tool(program: &str, version_arg: &str) -> Option<String> {
    let output = Command::new(program)
        .arg(version_arg)
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    Some(text.lines().next().unwrap_or_default().trim().to_string())
}

/// Checks yt-dlp and ffmpeg, installing them when allowed.
pub async fn ensure_dependencies(config: &Config) -> Vec<DependencyReport> {
    let ytdlp = ensure(
        "yt-dlp",
        &config.ytdlp_path,
        "--version",
        config.auto_install_dependencies,
        ytdlp_install_plans(),
        "Failed to install yt-dlp. Please install manually:\npip install yt-dlp",
    )
    .await;
    let ffmpeg = ensure(
        "FFmpeg",
        &config.ffmpeg_path,
        "-version",
        config.auto_install_dependencies,
        ffmpeg_install_plans(),
        "Failed to install FFmpeg automatically.\nPlease install FFmpeg manually: https://ffmpeg.org/",
    )
    .await;
    vec![ytdlp, ffmpeg]
}

async fn ensure(
    tool: &str,
    program: &str,
    version_arg: &str,
    auto_install: bool,
    plans: Vec<Vec<&'static str>>,
    manual_hint: &str,
) -> DependencyReport {
    let report = |status| DependencyReport { tool: tool.to_string(), status };

    if let Some(version) = check_tool(program, version_arg).await {
        info!(tool, %version, "dependency found");
        return report(DependencyStatus::Present(version));
    }
    warn!(tool, program, "dependency missing");

    if auto_install {
        for plan in plans {
            if run_install(&plan).await && check_tool(program, version_arg).await.is_some() {
                info!(tool, installer = plan[0], "dependency installed");
                return report(DependencyStatus::Installed);
            }
        }
    }
    report(DependencyStatus::Missing(manual_hint.to_string()))
}

async fn run_install(plan: &[&str]) -> bool {
    let Some((program, args)) = plan.split_first() else {
        return false;
    };
    info!(command = %plan.join(" "), "attempting install");
    match Command::new(program).args(args).stdin(Stdio::null()).status().await {
        Ok(status) if status.success() => true,
        Ok(status) => {
            warn!(command = %plan.join(" "), code = ?status.code(), "install command failed");
            false
        }
        Err(e) => {
            warn!(command = %plan.join(" "), error = %e, "install command could not start");
            false
        }
    }
}

fn ytdlp_install_plans() -> Vec<Vec<&'static str>> {
    vec![
        vec!["python3", "-m", "pip", "install", "--upgrade", "yt-dlp"],
        vec!["python", "-m", "pip", "install", "--upgrade", "yt-dlp"],
    ]
}

/// Package manager commands tried in order for the current platform.
pub fn ffmpeg_install_plans() -> Vec<Vec<&'static str>> {
    if cfg!(target_os = "macos") {
        vec![vec!["brew", "install", "ffmpeg"]]
    } else if cfg!(target_os = "linux") {
        vec![
            vec!["sudo", "apt", "install", "-y", "ffmpeg"],
            vec!["sudo", "yum", "install", "-y", "ffmpeg"],
            vec!["sudo", "pacman", "-S", "--noconfirm", "ffmpeg"],
        ]
    } else {
        Vec::new()
    }
}
