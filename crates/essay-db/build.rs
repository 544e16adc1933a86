//! Embeds `migrations/NNN_slug.{up,down}.sql` into the crate as `MIGRATIONS`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

#[derive(Debug, Default)]
struct Pair {
    slug: String,
    up: Option<String>,
    down: Option<String>,
}

fn main() {
    let manifest_dir = PathBuf::from(required_env("CARGO_MANIFEST_DIR"));
    let migrations_dir = manifest_dir.join("migrations");
    println!("cargo:rerun-if-changed={}", migrations_dir.display());

    let pairs = collect(&migrations_dir);
    let source = render(&pairs);

    let out_path = PathBuf::from(required_env("OUT_DIR")).join("migrations.rs");
    if let Err(err) = std::fs::write(&out_path, source) {
        panic!("essay-db build: write {}: {err}", out_path.display());
    }
}

fn collect(dir: &Path) -> BTreeMap<i32, Pair> {
    let mut pairs: BTreeMap<i32, Pair> = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => panic!("essay-db build: scan {}: {err}", dir.display()),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        println!("cargo:rerun-if-changed={}", entry.path().display());

        let Some((version, slug, is_up)) = split_name(&name) else {
            continue;
        };
        let pair = pairs.entry(version).or_default();
        pair.slug = slug.to_owned();
        if is_up {
            pair.up = Some(name);
        } else {
            pair.down = Some(name);
        }
    }

    for (version, pair) in &pairs {
        if pair.up.is_none() || pair.down.is_none() {
            panic!("essay-db build: migration {version} ({}) needs both up and down files", pair.slug);
        }
    }
    pairs
}

/// `001_create_essays.up.sql` -> `(1, "create_essays", true)`.
fn split_name(name: &str) -> Option<(i32, &str, bool)> {
    let (version, rest) = name.split_once('_')?;
    let version = version.parse().ok()?;
    if let Some(slug) = rest.strip_suffix(".up.sql") {
        return Some((version, slug, true));
    }
    rest.strip_suffix(".down.sql").map(|slug| (version, slug, false))
}

fn render(pairs: &BTreeMap<i32, Pair>) -> String {
    let mut out = String::from(
        "/// Generated by build.rs from crates/essay-db/migrations.\n\
         #[derive(Clone, Copy, Debug)]\n\
         pub struct EmbeddedMigration {\n\
         \x20   pub version: i32,\n\
         \x20   pub description: &'static str,\n\
         \x20   pub up_sql: &'static str,\n\
         \x20   pub down_sql: &'static str,\n\
         }\n\n\
         pub static MIGRATIONS: &[EmbeddedMigration] = &[\n",
    );
    for (version, pair) in pairs {
        let _ = writeln!(
            out,
            "    EmbeddedMigration {{ version: {version}, description: {desc:?}, up_sql: {up}, down_sql: {down} }},",
            desc = pair.slug.replace('_', " "),
            up = include_sql(pair.up.as_deref()),
            down = include_sql(pair.down.as_deref()),
        );
    }
    out.push_str("];\n");
    out
}

fn include_sql(file: Option<&str>) -> String {
    match file {
        Some(file) => format!(
            "include_str!(concat!(env!(\"CARGO_MANIFEST_DIR\"), {:?}))",
            format!("/migrations/{file}")
        ),
        None => "\"\"".to_owned(),
    }
}

fn required_env(key: &str) -> String {
    match std::env::var(key) {
        Ok(value) => value,
        Err(err) => panic!("essay-db build: missing env {key}: {err}"),
    }
}
