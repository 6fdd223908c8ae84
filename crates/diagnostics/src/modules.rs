//! Loaded module enumeration
//!
//! Linux reads `/proc/self/maps`, Windows walks a ToolHelp module snapshot;
//! other platforms only know the current executable.
//! Order follows the platform's enumeration order.

use std::collections::HashSet;
use std::path::PathBuf;

/// One executable image mapped into the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    /// File path
    pub path: String,
    /// File version, empty when unknown
    pub version: String,
}

impl LoadedModule {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }
}

/// Enumerate the modules loaded into this process.
///
/// The main executable reports `app_version`; shared objects report their
/// soname version suffix (`libssl.so.3` -> `3`). Other modules have no
/// version.
pub fn loaded_modules(app_version: &str) -> Vec<LoadedModule> {
    let exe = std::env::current_exe().ok();

    let paths = platform_module_paths().unwrap_or_else(|| {
        exe.iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
    });

    paths
        .into_iter()
        .map(|path| {
            let version = if exe.as_ref().is_some_and(|e| *e == PathBuf::from(&path)) {
                app_version.to_string()
            } else {
                soname_version(&path).to_string()
            };
            LoadedModule { path, version }
        })
        .collect()
}

#[cfg(target_os = "linux")]
fn platform_module_paths() -> Option<Vec<String>> {
    let maps = std::fs::read_to_string("/proc/self/maps").ok()?;
    Some(parse_maps(&maps))
}

#[cfg(windows)]
fn platform_module_paths() -> Option<Vec<String>> {
    use std::ffi::OsString;
    use std::mem;
    use std::os::windows::ffi::OsStringExt;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, Module32FirstW, Module32NextW, MODULEENTRY32W,
        TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
    };

    let mut paths = Vec::new();

    // SAFETY: the snapshot handle is closed before returning and `entry` is
    // sized as the API requires
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, 0).ok()?;

        let mut entry: MODULEENTRY32W = mem::zeroed();
        entry.dwSize = mem::size_of::<MODULEENTRY32W>() as u32;

        if Module32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let len = entry
                    .szExePath
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExePath.len());
                paths.push(
                    OsString::from_wide(&entry.szExePath[..len])
                        .to_string_lossy()
                        .into_owned(),
                );

                if Module32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }

        let _ = CloseHandle(snapshot);
    }

    (!paths.is_empty()).then_some(paths)
}

#[cfg(not(any(target_os = "linux", windows)))]
fn platform_module_paths() -> Option<Vec<String>> {
    None
}

/// Unique file-backed mappings, first occurrence wins
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_maps(maps: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    for line in maps.lines() {
        // address perms offset dev inode path; only the path can contain '/'
        let Some(idx) = line.find('/') else {
            continue;
        };
        let path = line[idx..].trim_end();
        if seen.insert(path.to_string()) {
            paths.push(path.to_string());
        }
    }
    paths
}

fn soname_version(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.find(".so.") {
        Some(idx) => &file_name[idx + 4..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
55d0c0a00000-55d0c0a2a000 r--p 00000000 08:01 1311 /usr/bin/viewer
55d0c0a2a000-55d0c0b00000 r-xp 0002a000 08:01 1311 /usr/bin/viewer
55d0c1e1c000-55d0c1e3d000 rw-p 00000000 00:00 0    [heap]
7f1e2c000000-7f1e2c028000 r--p 00000000 08:01 2048 /usr/lib/x86_64-linux-gnu/libc.so.6
7f1e2c200000-7f1e2c300000 r--p 00000000 08:01 4096 /usr/lib/libssl.so.3.0.2
7ffd8a1f0000-7ffd8a211000 rw-p 00000000 00:00 0    [stack]
";

    #[test]
    fn test_parse_maps_keeps_unique_paths_in_order() {
        let paths = parse_maps(MAPS);
        assert_eq!(
            paths,
            vec![
                "/usr/bin/viewer",
                "/usr/lib/x86_64-linux-gnu/libc.so.6",
                "/usr/lib/libssl.so.3.0.2",
            ]
        );
    }

    #[test]
    fn test_soname_version() {
        assert_eq!(soname_version("/usr/lib/libc.so.6"), "6");
        assert_eq!(soname_version("/usr/lib/libssl.so.3.0.2"), "3.0.2");
        assert_eq!(soname_version("/usr/bin/viewer"), "");
    }

    #[cfg(windows)]
    #[test]
    fn test_windows_snapshot_lists_system_dlls() {
        let paths = platform_module_paths().unwrap();
        assert!(paths.len() > 1);
        assert!(paths
            .iter()
            .any(|p| p.to_ascii_lowercase().ends_with("ntdll.dll")));
    }

    #[test]
    fn test_loaded_modules_not_empty() {
        let modules = loaded_modules("9.9.9");
        assert!(!modules.is_empty());
    }
}
