use std::fs;
use std::path::{Path, PathBuf};

fn sources(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).expect("read src dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            sources(&path, out);
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

#[test]
fn every_dependency_is_used_by_the_binary() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let manifest = fs::read_to_string(root.join("Cargo.toml")).expect("manifest");
    let section = manifest
        .split("[dependencies]")
        .nth(1)
        .expect("dependencies table")
        .split("\n[")
        .next()
        .unwrap_or_default();
    let deps: Vec<String> = section
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(name, _)| name.trim().replace('-', "_"))
        .filter(|name| !name.is_empty())
        .collect();
    assert!(!deps.is_empty());

    let mut files = Vec::new();
    sources(&root.join("src"), &mut files);
    let code: String = files
        .iter()
        .map(|path| fs::read_to_string(path).expect("source"))
        .collect();

    let unused: Vec<&String> = deps
        .iter()
        .filter(|name| !code.contains(&format!("{name}::")))
        .collect();
    assert!(unused.is_empty(), "dependencies never referenced: {unused:?}");
}
