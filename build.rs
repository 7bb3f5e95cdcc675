//! Build script for guild-bridge
//!
//! Migrations are embedded with `sqlx::migrate!`, so the crate must be
//! rebuilt whenever a migration file is added or edited.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
