//! Drives the `qcrypt` binary end to end in a temp directory.
//!
//! Every run passes `--allow-insecure-mock` so the tests work on builds
//! without a usable KEM backend; real backends still win when present.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn qcrypt(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qcrypt"))
        .current_dir(dir)
        .env("QCRYPT_CONFIG", dir.join("qcrypt.toml"))
        .env_remove("QCRYPT_KEY")
        .env_remove("QCRYPT_LOG")
        .env_remove("RUST_LOG")
        .arg("--allow-insecure-mock")
        .args(args)
        .output()
        .expect("run qcrypt")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn encrypt_then_decrypt_with_key_file() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("hello.txt"), b"hello world").unwrap();

    let enc = qcrypt(tmp.path(), &["encrypt", "hello.txt"]);
    assert!(enc.status.success(), "encrypt failed: {}", stderr(&enc));
    assert!(tmp.path().join("hello.txt.qcrypt.json").exists());
    assert!(tmp.path().join("hello.txt.key").exists());

    std::fs::remove_file(tmp.path().join("hello.txt")).unwrap();
    let dec = qcrypt(
        tmp.path(),
        &["decrypt", "hello.txt.qcrypt.json", "--key", "@hello.txt.key"],
    );
    assert!(dec.status.success(), "decrypt failed: {}", stderr(&dec));
    assert_eq!(
        std::fs::read(tmp.path().join("hello.txt")).unwrap(),
        b"hello world"
    );
}

#[test]
fn decrypt_to_stdout_with_inline_key() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("note"), b"inline key").unwrap();
    assert!(qcrypt(tmp.path(), &["encrypt", "note", "--tagged-key"]).status.success());

    let key = std::fs::read_to_string(tmp.path().join("note.key")).unwrap();
    assert!(key.starts_with("b64:"));

    let dec = qcrypt(
        tmp.path(),
        &["decrypt", "note.qcrypt.json", "--key", key.trim(), "--out", "-"],
    );
    assert!(dec.status.success(), "decrypt failed: {}", stderr(&dec));
    assert_eq!(dec.stdout, b"inline key");
}

#[test]
fn many_inputs_with_json_summary() {
    let tmp = TempDir::new().unwrap();
    let names = ["a.txt", "b.txt", "c.txt", "d.txt"];
    for name in names {
        std::fs::write(tmp.path().join(name), name.as_bytes()).unwrap();
    }

    let mut args = vec!["encrypt", "--out-dir", "sealed", "--variant", "1024", "--json"];
    args.extend(names);
    let enc = qcrypt(tmp.path(), &args);
    assert!(enc.status.success(), "encrypt failed: {}", stderr(&enc));

    let summary: serde_json::Value = serde_json::from_str(&stdout(&enc)).unwrap();
    let entries = summary.as_array().unwrap();
    assert_eq!(entries.len(), names.len());
    for entry in entries {
        assert_eq!(entry["variant"], "1024");
        assert!(entry.get("private_key").is_none());
    }
    for name in names {
        assert!(tmp.path().join("sealed").join(format!("{name}.qcrypt.json")).exists());
    }
}

#[test]
fn wrong_key_reports_generic_message() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("one"), b"1").unwrap();
    std::fs::write(tmp.path().join("two"), b"2").unwrap();
    assert!(qcrypt(tmp.path(), &["encrypt", "one", "two"]).status.success());

    let dec = qcrypt(tmp.path(), &["decrypt", "one.qcrypt.json", "--key", "@two.key"]);
    assert!(!dec.status.success());
    assert!(stderr(&dec).contains("error: cannot decrypt"), "{}", stderr(&dec));
}

#[test]
fn partial_encrypt_failure_reports_each_input_once() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("present"), b"here").unwrap();

    let enc = qcrypt(tmp.path(), &["encrypt", "present", "absent"]);
    assert!(!enc.status.success());
    assert!(tmp.path().join("present.qcrypt.json").exists());

    let err = stderr(&enc);
    assert_eq!(err.matches("absent: reading absent").count(), 1, "{err}");
    assert!(err.contains("error: 1 of 2 inputs failed"), "{err}");
}

#[test]
fn garbage_key_is_bad_input() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("f"), b"data").unwrap();
    assert!(qcrypt(tmp.path(), &["encrypt", "f"]).status.success());

    let dec = qcrypt(
        tmp.path(),
        &["decrypt", "f.qcrypt.json", "--key", "kyber_privkey_123"],
    );
    assert!(!dec.status.success());
    assert!(stderr(&dec).contains("invalid key or request"));
}

#[test]
fn digest_matches_known_vector() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("abc"), b"abc").unwrap();

    let out = qcrypt(tmp.path(), &["digest", "abc"]);
    assert!(out.status.success());
    assert!(stdout(&out)
        .starts_with("sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"));

    // Unknown algorithm falls back to the default rather than failing
    let out = qcrypt(tmp.path(), &["digest", "abc", "--algorithm", "md5"]);
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("sha256:"));
}

#[test]
fn config_show_renders_file_values() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("qcrypt.toml"),
        "[pipeline]\nvariant = \"512\"\ndigest_algorithm = \"blake3\"\n",
    )
    .unwrap();

    let out = qcrypt(tmp.path(), &["config", "show"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("variant = \"512\""));
    assert!(text.contains("digest_algorithm = \"blake3\""));
}

#[test]
fn invalid_config_variant_fails() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("qcrypt.toml"), "[pipeline]\nvariant = \"999\"\n").unwrap();
    std::fs::write(tmp.path().join("f"), b"data").unwrap();

    let out = qcrypt(tmp.path(), &["encrypt", "f"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unknown KEM variant"));
}

#[test]
fn invalid_variant_flag_fails() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("f"), b"data").unwrap();

    let out = qcrypt(tmp.path(), &["encrypt", "f", "--variant", "999"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unknown KEM variant \"999\""), "{}", stderr(&out));
    assert!(!tmp.path().join("f.qcrypt.json").exists());
}

#[test]
fn backends_json_lists_real_backends() {
    let tmp = TempDir::new().unwrap();
    let out = qcrypt(tmp.path(), &["backends", "--json"]);
    assert!(out.status.success());

    let reports: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    for report in reports.as_array().unwrap() {
        assert_ne!(report["backend"], "insecure-mock");
    }
}
