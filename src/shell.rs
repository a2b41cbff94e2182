// ABOUTME: Quoting and argument checks for commands sent to remote shells.
// ABOUTME: POSIX sh on Linux hosts, PowerShell on Windows hosts.

use crate::types::OsType;

/// Quote `value` as a single literal argument for the host's shell.
pub fn quote(os: OsType, value: &str) -> String {
    match os {
        OsType::Linux => format!("'{}'", value.replace('\'', "'\\''")),
        OsType::Windows => format!("'{}'", value.replace('\'', "''")),
    }
}

/// Quote a path, leaving a leading `~/` unquoted so the remote shell expands it.
pub fn quote_path(os: OsType, path: &str) -> String {
    match (os, path.strip_prefix("~/")) {
        (OsType::Linux, Some(rest)) => format!("\"$HOME\"/{}", quote(os, rest)),
        (OsType::Windows, Some(rest)) => format!("(Join-Path $HOME {})", quote(os, rest)),
        _ => quote(os, path),
    }
}

/// Join two path segments with the host's separator.
pub fn join(os: OsType, base: &str, child: &str) -> String {
    let sep = match os {
        OsType::Linux => '/',
        OsType::Windows => '\\',
    };
    format!("{}{}{}", base.trim_end_matches(['/', '\\']), sep, child)
}

/// Wrap a PowerShell script so it runs under the default Windows OpenSSH shell.
pub fn powershell(script: &str) -> String {
    format!(
        "powershell -NoProfile -NonInteractive -Command \"{}\"",
        script.replace('"', "\\\"")
    )
}

/// Command that writes its stdin to `path`.
pub fn write_stdin_to(os: OsType, path: &str) -> String {
    match os {
        OsType::Linux => format!("cat > {}", quote_path(os, path)),
        OsType::Windows => powershell(&format!(
            "[Console]::In.ReadToEnd() | Set-Content -NoNewline -Path {}",
            quote_path(os, path)
        )),
    }
}

/// Whether `value` is safe to use as a path argument: no shell metacharacters,
/// no parent-directory traversal.
pub fn is_safe_path(value: &str) -> bool {
    !value.is_empty()
        && !value.split(['/', '\\']).any(|segment| segment == "..")
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '\\' | '.' | '-' | '_' | '~' | ':'))
}
