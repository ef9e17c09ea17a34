//! File-level encrypt/decrypt behind the `qcrypt` commands
//!
//! `encrypt` writes two files next to each other:
//!   <name>.qcrypt.json  container (safe to store or ship anywhere)
//!   <name>.key          private key text (mode 0600 on unix)

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use qcrypt_crypto::{
    decode_key, digest, encode_key, encode_key_tagged, BackendSelection, DigestAlgorithm,
    KemVariant, Pipeline, PipelineOptions,
};

pub const CONTAINER_SUFFIX: &str = ".qcrypt.json";
pub const KEY_SUFFIX: &str = ".key";

/// What `encrypt_file` produced. Contains no secret material.
#[derive(Debug, Serialize)]
pub struct EncryptedFile {
    pub input: PathBuf,
    pub container: PathBuf,
    pub key: PathBuf,
    pub variant: KemVariant,
    pub backend: BackendSelection,
    pub bytes: u64,
    pub digest_algorithm: DigestAlgorithm,
    pub container_digest: String,
    pub public_key_digest: String,
}

/// Container and key paths for `input`, in `out_dir` or beside the input.
pub fn output_paths(input: &Path, out_dir: Option<&Path>) -> Result<(PathBuf, PathBuf)> {
    let name = input
        .file_name()
        .with_context(|| format!("input has no file name: {}", input.display()))?;
    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let mut container = name.to_os_string();
    container.push(CONTAINER_SUFFIX);
    let mut key = name.to_os_string();
    key.push(KEY_SUFFIX);
    Ok((dir.join(container), dir.join(key)))
}

/// Default plaintext path for a container: strip `.qcrypt.json`, or append
/// `.decrypted` if the name does not carry the suffix.
pub fn default_plaintext_path(container: &Path) -> PathBuf {
    let text = container.to_string_lossy();
    match text.strip_suffix(CONTAINER_SUFFIX) {
        Some(stem) if !stem.is_empty() && !stem.ends_with(std::path::MAIN_SEPARATOR) => {
            PathBuf::from(stem)
        }
        _ => PathBuf::from(format!("{text}.decrypted")),
    }
}

pub fn encrypt_file(
    pipeline: &Pipeline<'_>,
    input: &Path,
    out_dir: Option<&Path>,
    options: &PipelineOptions,
    tagged_key: bool,
) -> Result<EncryptedFile> {
    let plaintext =
        std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let (container_path, key_path) = output_paths(input, out_dir)?;

    let outcome = pipeline
        .encrypt(&plaintext, options)
        .with_context(|| format!("encrypting {}", input.display()))?;

    let json = outcome.container.to_json_pretty();
    std::fs::write(&container_path, json.as_bytes())
        .with_context(|| format!("writing {}", container_path.display()))?;

    let key_text = SecretString::from(if tagged_key {
        encode_key_tagged(&outcome.key_pair.private_key)
    } else {
        encode_key(&outcome.key_pair.private_key)
    });
    write_private(&key_path, key_text.expose_secret())
        .with_context(|| format!("writing {}", key_path.display()))?;

    tracing::info!(
        input = %input.display(),
        container = %container_path.display(),
        backend = %outcome.backend.backend,
        variant = %outcome.variant,
        "encrypted file"
    );

    Ok(EncryptedFile {
        input: input.to_path_buf(),
        container: container_path,
        key: key_path,
        variant: outcome.variant,
        backend: outcome.backend,
        bytes: plaintext.len() as u64,
        digest_algorithm: outcome.digest_algorithm,
        container_digest: outcome.digest,
        public_key_digest: digest(&outcome.key_pair.public_key, outcome.digest_algorithm),
    })
}

/// Decrypt the container at `path` with key text (any encoding `decode_key`
/// accepts). Returns the plaintext; nothing is written.
pub fn decrypt_file(
    pipeline: &Pipeline<'_>,
    path: &Path,
    key_text: &SecretString,
    options: &PipelineOptions,
) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let key = decode_key(key_text.expose_secret());
    tracing::debug!(encoding = ?key.encoding(), tagged = key.is_tagged(), "decoded key text");

    let plaintext = pipeline
        .decrypt_bytes(&bytes, key.bytes(), options)
        .with_context(|| format!("decrypting {}", path.display()))?;
    Ok(plaintext)
}

/// Resolve a `--key` argument: `@path` reads the key from a file, anything
/// else is the key text itself.
pub fn read_key_arg(arg: &str) -> Result<SecretString> {
    match arg.strip_prefix('@') {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading key file {path}"))?;
            Ok(SecretString::from(text.trim_end_matches(['\r', '\n']).to_string()))
        }
        None => Ok(SecretString::from(arg.to_string())),
    }
}

/// Write `contents` readable by the owner only.
pub fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;
    file.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcrypt_crypto::{BackendKind, BackendRegistry, CryptoError};
    use tempfile::TempDir;

    fn mock_options() -> PipelineOptions {
        PipelineOptions {
            allow_insecure_mock: true,
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn test_output_paths() {
        let (container, key) = output_paths(Path::new("/data/report.pdf"), None).unwrap();
        assert_eq!(container, Path::new("/data/report.pdf.qcrypt.json"));
        assert_eq!(key, Path::new("/data/report.pdf.key"));

        let (container, _) =
            output_paths(Path::new("notes.txt"), Some(Path::new("/out"))).unwrap();
        assert_eq!(container, Path::new("/out/notes.txt.qcrypt.json"));

        assert!(output_paths(Path::new("/"), None).is_err());
    }

    #[test]
    fn test_default_plaintext_path() {
        assert_eq!(
            default_plaintext_path(Path::new("/data/report.pdf.qcrypt.json")),
            Path::new("/data/report.pdf")
        );
        assert_eq!(
            default_plaintext_path(Path::new("blob.json")),
            Path::new("blob.json.decrypted")
        );
    }

    #[test]
    fn test_encrypt_then_decrypt_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("secret.txt");
        std::fs::write(&input, b"file contents").unwrap();

        let registry = BackendRegistry::with_backends(&[]);
        let pipeline = Pipeline::with_registry(&registry);
        let opts = mock_options();

        let written = encrypt_file(&pipeline, &input, None, &opts, false).unwrap();
        assert_eq!(written.backend.backend, BackendKind::InsecureMock);
        assert_eq!(written.bytes, 13);
        assert!(written.container.exists());
        assert_eq!(written.container_digest.len(), opts.digest_algorithm.hex_len());

        let key = read_key_arg(&format!("@{}", written.key.display())).unwrap();
        let plaintext = decrypt_file(&pipeline, &written.container, &key, &opts).unwrap();
        assert_eq!(plaintext, b"file contents");
    }

    #[test]
    fn test_tagged_key_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.bin");
        std::fs::write(&input, [0u8, 1, 2]).unwrap();

        let registry = BackendRegistry::with_backends(&[]);
        let pipeline = Pipeline::with_registry(&registry);
        let written = encrypt_file(&pipeline, &input, None, &mock_options(), true).unwrap();

        let text = std::fs::read_to_string(&written.key).unwrap();
        assert!(text.starts_with("b64:"));
    }

    #[test]
    fn test_wrong_key_surfaces_crypto_error() {
        let tmp = TempDir::new().unwrap();
        let registry = BackendRegistry::with_backends(&[]);
        let pipeline = Pipeline::with_registry(&registry);
        let opts = mock_options();

        let first = tmp.path().join("one.txt");
        let second = tmp.path().join("two.txt");
        std::fs::write(&first, b"one").unwrap();
        std::fs::write(&second, b"two").unwrap();
        let one = encrypt_file(&pipeline, &first, None, &opts, false).unwrap();
        let two = encrypt_file(&pipeline, &second, None, &opts, false).unwrap();

        let wrong = read_key_arg(&format!("@{}", two.key.display())).unwrap();
        let err = decrypt_file(&pipeline, &one.container, &wrong, &opts).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CryptoError>(),
            Some(CryptoError::AuthenticationFailed)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("k.key");
        write_private(&path, "b64:AAAA").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_inline_key_arg() {
        let key = read_key_arg("hex:00ff").unwrap();
        assert_eq!(key.expose_secret(), "hex:00ff");
        assert!(read_key_arg("@/nonexistent/qcrypt/key").is_err());
    }
}
