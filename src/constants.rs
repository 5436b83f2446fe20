//! Canonical schema identifiers and shared defaults.

// Output schema versions
pub const COMPAT_SCHEMA_VERSION: &str = "compat-source-v1";
pub const SETTINGS_SCHEMA_VERSION: &str = "emulator-settings-v1";
pub const LAYER_C_SCHEMA_VERSION: &str = "layerC-v1";
pub const MERGED_VERSION: &str = "emulatorCompatibility-v0.1-merged";

/// Placeholder carried in `gameId` until a catalog mapping exists.
pub const UNMAPPED_GAME_ID: &str = "UNMAPPED";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; compat-ingest/0.1)";
pub const DEFAULT_CACHE_DIR: &str = ".cache/compat";
pub const DEFAULT_OUT_DIR: &str = "out";
pub const DEFAULT_MAX_AGE_DAYS: u64 = 7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 10_000;

/// Merge input file glob prefix/suffix (`compat.<source>.json`).
pub const COMPAT_FILE_PREFIX: &str = "compat.";
pub const JSON_SUFFIX: &str = ".json";

/// Output file name for a source under the batch driver's out dir.
pub fn output_file_name(schema_version: &str, source_id: &str) -> String {
    match schema_version {
        SETTINGS_SCHEMA_VERSION => format!("settings.{source_id}.json"),
        LAYER_C_SCHEMA_VERSION => format!("layerC.{source_id}.json"),
        _ => format!("{COMPAT_FILE_PREFIX}{source_id}{JSON_SUFFIX}"),
    }
}

/// Bundled schema file (under `schemas/`) for a declared document version.
pub fn schema_file_name(version: &str) -> Option<&'static str> {
    match version {
        COMPAT_SCHEMA_VERSION => Some("compat-source.v1.json"),
        SETTINGS_SCHEMA_VERSION => Some("emulator-settings.v1.json"),
        LAYER_C_SCHEMA_VERSION => Some("layerC.v1.json"),
        MERGED_VERSION => Some("merged.json"),
        _ => None,
    }
}
