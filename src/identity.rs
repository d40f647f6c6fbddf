//! Application and host identity used in file headers

/// Name and version of the application doing the logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub name: String,
    pub version: String,
}

impl AppIdentity {
    /// Build from optional overrides, falling back to the running process
    pub fn resolve(name: Option<&str>, version: Option<&str>) -> Self {
        Self {
            name: name
                .map(str::to_string)
                .unwrap_or_else(process_name),
            version: version
                .map(str::to_string)
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// File stem of the current executable, or "unknown"
fn process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Library version, reported as the host framework in headers
pub fn framework_version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// OS descriptor, e.g. "linux (unix)"
pub fn os_description() -> String {
    format!("{} ({})", std::env::consts::OS, std::env::consts::FAMILY)
}

/// CPU descriptor, e.g. "x86_64, 8 logical cores"
pub fn cpu_description() -> String {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    format!("{}, {} logical cores", std::env::consts::ARCH, cores)
}
