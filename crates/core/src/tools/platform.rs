use crate::{error::InstallError, tools::Tool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Other(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
    Other(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        Self::from_names(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build from `std::env::consts`-style names.
    pub fn from_names(os: &'static str, arch: &'static str) -> Self {
        let os = match os {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            other => Os::Other(other),
        };
        let arch = match arch {
            "x86_64" => Arch::X86_64,
            "aarch64" => Arch::Aarch64,
            other => Arch::Other(other),
        };
        Self { os, arch }
    }

    /// Static ffmpeg build matching the CPU, under the `builds` directory URL.
    pub fn ffmpeg_archive_url(&self, builds: &str) -> Result<String, InstallError> {
        let asset = match self.arch {
            Arch::X86_64 => "ffmpeg-master-latest-linux64-gpl.tar.xz",
            Arch::Aarch64 => "ffmpeg-master-latest-linuxarm64-gpl.tar.xz",
            Arch::Other(arch) => {
                return Err(InstallError::UnsupportedArchitecture {
                    tool: Tool::Ffmpeg,
                    arch: arch.to_string(),
                });
            }
        };
        Ok(format!("{}/{}", builds.trim_end_matches('/'), asset))
    }
}
