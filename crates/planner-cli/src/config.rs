use std::path::Path;

/// Loads `.env` from the crate directory and then from the working directory.
///
/// Variables already set in the process environment win.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(&format!("{}/.env", env!("CARGO_MANIFEST_DIR"))));
    dotenvy::dotenv().ok();
}
