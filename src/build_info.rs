use serde::Serialize;

/// Version and git state baked in by `build.rs`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: String,
    pub version: &'static str,
    pub git_describe: &'static str,
    pub git_hash: &'static str,
    pub puffin: bool,
}

impl BuildInfo {
    pub fn new(name: &str) -> Self {
        BuildInfo {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION"),
            git_describe: env!("GIT_DESCRIBE"),
            git_hash: env!("GIT_HASH"),
            puffin: cfg!(feature = "profile-with-puffin"),
        }
    }
}

pub fn print_report(name: &str) {
    match serde_json::to_string_pretty(&BuildInfo::new(name)) {
        Ok(report) => println!("{report}"),
        Err(e) => eprintln!("failed to format build info: {e}"),
    }
}
