//! Signature and version-resource inspection.
//!
//! The walker treats signing inspection as a collaborator behind
//! [`SignatureResolver`]; production resolution shells out to PowerShell on
//! Windows, and everything else (non-Windows hosts, tests, inspection
//! failures) degrades to content-hash identity.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Buffer size for chunked SHA-256 computation (8 KB).
const HASH_BUF_SIZE: usize = 8192;

#[cfg(target_os = "windows")]
const POWERSHELL_EXE: &str = r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe";

/// Signature/version metadata for one file. All fields are absent for
/// unsigned files or files without a version resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerInfo {
    pub publisher: Option<String>,
    pub product: Option<String>,
    pub binary_name: Option<String>,
    pub version: Option<String>,
}

/// Resolves signing metadata for a single file.
///
/// Implementations must not fail the walk: an `Err` is logged by the caller
/// and the file degrades to a hash-rule candidate.
pub trait SignatureResolver {
    fn resolve(&self, path: &Path) -> Result<SignerInfo, String>;
}

/// Resolver that never reports signature metadata; every file becomes a
/// hash-rule candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashOnlyResolver;

impl SignatureResolver for HashOnlyResolver {
    fn resolve(&self, _path: &Path) -> Result<SignerInfo, String> {
        Ok(SignerInfo::default())
    }
}

/// PowerShell-backed resolver: `Get-AuthenticodeSignature` for the
/// publisher identity, the shell's `VersionInfo` for product, binary name,
/// and file version. Only signatures whose chain validates contribute a
/// publisher; everything else degrades to hash identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerShellResolver;

impl SignatureResolver for PowerShellResolver {
    #[cfg(target_os = "windows")]
    fn resolve(&self, path: &Path) -> Result<SignerInfo, String> {
        use std::process::Command;

        let quoted = path.to_string_lossy().replace('\'', "''");
        let script = format!(
            "$f = Get-Item -LiteralPath '{quoted}'; \
             $sig = Get-AuthenticodeSignature -LiteralPath '{quoted}'; \
             [pscustomobject]@{{ \
               Publisher = if ($sig.Status -eq 'Valid') {{ $sig.SignerCertificate.Subject }} else {{ $null }}; \
               Product = $f.VersionInfo.ProductName; \
               BinaryName = $f.VersionInfo.OriginalFilename; \
               Version = $f.VersionInfo.FileVersion \
             }} | ConvertTo-Json -Compress"
        );

        let output = Command::new(POWERSHELL_EXE)
            .args(["-NoProfile", "-NonInteractive", "-Command", &script])
            .output()
            .map_err(|err| format!("failed launching powershell: {}", err))?;
        if !output.status.success() {
            return Err(format!(
                "signature inspection exited with {}",
                output.status
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_signer_json(stdout.trim())
            .ok_or_else(|| "unparseable signature inspection output".to_string())
    }

    #[cfg(not(target_os = "windows"))]
    fn resolve(&self, path: &Path) -> Result<SignerInfo, String> {
        tracing::warn!(
            path = %path.display(),
            "signature inspection is a stub on non-Windows"
        );
        Ok(SignerInfo::default())
    }
}

#[cfg(any(test, target_os = "windows"))]
fn parse_signer_json(raw: &str) -> Option<SignerInfo> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let field = |name: &str| {
        value
            .get(name)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };
    Some(SignerInfo {
        publisher: field("Publisher"),
        product: field("Product"),
        binary_name: field("BinaryName"),
        version: field("Version"),
    })
}

/// The resolver appropriate for this host: PowerShell-backed on Windows,
/// hash-only elsewhere.
pub fn default_resolver() -> Box<dyn SignatureResolver> {
    #[cfg(target_os = "windows")]
    {
        Box::new(PowerShellResolver)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(HashOnlyResolver)
    }
}

/// Compute the SHA-256 of a file by reading in 8 KB chunks.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    use sha2::{Digest, Sha256};

    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(encode_hex(&hasher.finalize()))
}

fn encode_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
