//! Remote command syntax
//!
//! Every directory and extraction command a strategy runs is built here so that the channel
//! implementations only have to move bytes. Paths are always single-quoted.

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum Dialect {
    /// POSIX `sh` with coreutils and `tar`
    #[default]
    Posix,
    /// Windows PowerShell with the bundled `tar.exe`
    #[value(name = "powershell")]
    PowerShell,
}

/// Quote `value` as a single shell word for POSIX `sh`
pub fn posix_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Quote `value` as a PowerShell single-quoted string literal
pub fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn powershell(script: &str) -> String {
    format!(
        "powershell -NoProfile -NonInteractive -Command \"{}\"",
        script.replace('"', "\\\"")
    )
}

impl Dialect {
    pub fn quote(self, value: &str) -> String {
        match self {
            Dialect::Posix => posix_quote(value),
            Dialect::PowerShell => powershell_quote(value),
        }
    }

    /// Prints `d` for a directory and `f` for anything else, exits non-zero when missing
    pub fn stat(self, path: &str) -> String {
        let path = self.quote(path);
        match self {
            Dialect::Posix => format!(
                "if [ -d {path} ]; then echo d; elif [ -e {path} ]; then echo f; else exit 1; fi"
            ),
            Dialect::PowerShell => powershell(&format!(
                "$i = Get-Item -LiteralPath {path} -ErrorAction Stop; \
                 if ($i.PSIsContainer) {{ 'd' }} else {{ 'f' }}"
            )),
        }
    }

    /// Create exactly one directory, failing if it exists or the parent is missing
    pub fn mkdir(self, path: &str) -> String {
        let path = self.quote(path);
        match self {
            Dialect::Posix => format!("mkdir {path}"),
            Dialect::PowerShell => powershell(&format!(
                "New-Item -ItemType Directory -Path {path} -ErrorAction Stop | Out-Null"
            )),
        }
    }

    /// Recursively delete `path`, succeeding when it does not exist
    pub fn remove_tree(self, path: &str) -> String {
        let path = self.quote(path);
        match self {
            Dialect::Posix => format!("rm -rf {path}"),
            Dialect::PowerShell => powershell(&format!(
                "if (Test-Path -LiteralPath {path}) \
                 {{ Remove-Item -LiteralPath {path} -Recurse -Force -ErrorAction Stop }}"
            )),
        }
    }

    pub fn remove_file(self, path: &str) -> String {
        let path = self.quote(path);
        match self {
            Dialect::Posix => format!("rm -f {path}"),
            Dialect::PowerShell => powershell(&format!(
                "Remove-Item -LiteralPath {path} -Force -ErrorAction SilentlyContinue"
            )),
        }
    }

    /// Unpack a `.tar.gz` archive into `destination`, overwriting existing files
    pub fn extract(self, archive: &str, destination: &str) -> String {
        let archive = self.quote(archive);
        let destination = self.quote(destination);
        match self {
            Dialect::Posix => format!("tar -xzf {archive} -C {destination}"),
            Dialect::PowerShell => powershell(&format!(
                "tar.exe -xzf {archive} -C {destination}; exit $LASTEXITCODE"
            )),
        }
    }

    /// Write stdin to `path`, replacing any existing file
    pub fn write_file(self, path: &str) -> String {
        let path = self.quote(path);
        match self {
            Dialect::Posix => format!("cat > {path}"),
            Dialect::PowerShell => powershell(&format!(
                "$in = [Console]::OpenStandardInput(); $out = [IO.File]::Create({path}); \
                 $in.CopyTo($out); $out.Close()"
            )),
        }
    }
}
