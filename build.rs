use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::{env, fs};

const LOCALES_DIR: &str = "locales";
const DEFAULT_LOCALE: &str = "es";

fn main() {
    println!("cargo:rerun-if-changed={LOCALES_DIR}");

    let mut locales = BTreeMap::<String, BTreeMap<String, String>>::new();
    let entries = fs::read_dir(LOCALES_DIR).unwrap_or_else(|error| {
        panic!("failed to read `{LOCALES_DIR}` directory: {error}");
    });
    for entry in entries {
        let path = entry
            .unwrap_or_else(|error| panic!("failed to read locale entry: {error}"))
            .path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        println!("cargo:rerun-if-changed={}", path.display());

        let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let raw = fs::read_to_string(&path)
            .unwrap_or_else(|error| panic!("failed to read {}: {error}", path.display()));
        let table = raw
            .parse::<toml::Table>()
            .unwrap_or_else(|error| panic!("invalid locale file {}: {error}", path.display()));

        let mut messages = BTreeMap::new();
        flatten_table("", &table, &mut messages, &path);
        locales.insert(locale.to_string(), messages);
    }

    if !locales.contains_key(DEFAULT_LOCALE) {
        panic!("default locale `{DEFAULT_LOCALE}` has no catalog under `{LOCALES_DIR}`");
    }

    let mut out = String::new();
    let _ = writeln!(out, "pub const DEFAULT_LOCALE: &str = {DEFAULT_LOCALE:?};");
    let _ = writeln!(out, "pub static LOCALES: &[(&str, &[(&str, &str)])] = &[");
    for (locale, messages) in &locales {
        let _ = writeln!(out, "    ({locale:?}, &[");
        for (key, value) in messages {
            let _ = writeln!(out, "        ({key:?}, {value:?}),");
        }
        let _ = writeln!(out, "    ]),");
    }
    let _ = writeln!(out, "];");

    let out_dir = env::var("OUT_DIR").unwrap_or_else(|error| panic!("OUT_DIR not set: {error}"));
    let target = Path::new(&out_dir).join("finform_i18n_generated.rs");
    fs::write(&target, out)
        .unwrap_or_else(|error| panic!("failed to write {}: {error}", target.display()));
}

fn flatten_table(
    prefix: &str,
    table: &toml::Table,
    messages: &mut BTreeMap<String, String>,
    path: &Path,
) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(text) => {
                messages.insert(full_key, text.clone());
            }
            toml::Value::Table(nested) => flatten_table(&full_key, nested, messages, path),
            other => panic!(
                "locale key `{full_key}` in {} must be a string or table, found {}",
                path.display(),
                other.type_str()
            ),
        }
    }
}
