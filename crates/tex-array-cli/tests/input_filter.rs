use std::fs;
use std::path::Path;
use std::process::Command;

/// Runs `pack --print-config` and returns the layer count the inputs produced.
fn gathered_layers(dir: &Path, extra: &[&str]) -> u64 {
    let out = Command::new(env!("CARGO_BIN_EXE_tex-array"))
        .args(["--quiet", "pack"])
        .arg(dir)
        .args(["--resolution", "8", "--format", "rgba32", "--print-config"])
        .args(extra)
        .output()
        .expect("run tex-array");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let cfg: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    cfg["array_size"].as_u64().expect("array_size")
}

fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, b"").expect("write");
    }
}

#[test]
fn only_decodable_extensions_become_layers() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(
        dir.path(),
        &["a.png", "b.JPG", "notes.txt", "c.png.bak", "sub/d.bmp", "noext"],
    );
    assert_eq!(gathered_layers(dir.path(), &[]), 3);
}

#[test]
fn exclude_wins_over_include() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["keep_a.png", "keep_b.png", "skip_c.png", "other.png"]);
    assert_eq!(
        gathered_layers(dir.path(), &["--include", "**/keep_*", "--include", "**/skip_*"]),
        3
    );
    assert_eq!(
        gathered_layers(
            dir.path(),
            &["--include", "**/keep_*", "--include", "**/skip_*", "--exclude", "**/skip_*"]
        ),
        2
    );
}
