//! Registry-backed environment store and the Win32 helpers around it.

use std::env;
use std::ffi::OsStr;
use std::io;
use std::os::windows::ffi::OsStrExt;

use tracing::debug;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::UI::Shell::{IsUserAnAdmin, ShellExecuteW};
use windows::Win32::UI::WindowsAndMessaging::{
    SendMessageTimeoutW, HWND_BROADCAST, SMTO_ABORTIFHUNG, SW_SHOW, WM_SETTINGCHANGE,
};
use winreg::enums::{
    RegType, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE, KEY_READ, KEY_SET_VALUE,
    REG_EXPAND_SZ, REG_SZ,
};
use winreg::{RegKey, RegValue, HKEY};

use crate::env::has_env_token;
use crate::error::{Error, Result};
use crate::reader::{EnvironmentStore, PathScope, PATH_VALUE};

/// The real per-user and machine-wide environment keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryStore;

impl RegistryStore {
    fn root(scope: PathScope) -> HKEY {
        match scope {
            PathScope::User => HKEY_CURRENT_USER,
            PathScope::System => HKEY_LOCAL_MACHINE,
        }
    }

    fn open(scope: PathScope, flags: u32) -> Result<RegKey> {
        RegKey::predef(Self::root(scope))
            .open_subkey_with_flags(scope.subkey(), flags)
            .map_err(|err| Error::from_io(scope, err))
    }
}

impl EnvironmentStore for RegistryStore {
    fn read_raw(&self, scope: PathScope) -> Result<String> {
        let key = Self::open(scope, KEY_READ)?;
        // get_raw_value does not expand REG_EXPAND_SZ data
        let raw = key.get_raw_value(PATH_VALUE).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::RegistryValueMissing {
                scope,
                name: PATH_VALUE,
            },
            _ => Error::Registry { scope, source: err },
        })?;
        if raw.vtype != REG_SZ && raw.vtype != REG_EXPAND_SZ {
            return Err(Error::RegistryValueMissing {
                scope,
                name: PATH_VALUE,
            });
        }
        Ok(decode_utf16_reg(&raw.bytes))
    }

    fn write(&mut self, scope: PathScope, value: &str) -> Result<()> {
        let key = Self::open(scope, KEY_QUERY_VALUE | KEY_SET_VALUE)?;
        let current = key.get_raw_value(PATH_VALUE).ok().map(|raw| raw.vtype);
        let vtype = value_type(value, current);
        debug!(%scope, expandable = vtype == REG_EXPAND_SZ, "writing PATH to registry");

        let raw = RegValue {
            bytes: encode_utf16_reg(value),
            vtype,
        };
        key.set_raw_value(PATH_VALUE, &raw)
            .map_err(|err| Error::from_io(scope, err))?;

        broadcast_env_change();
        Ok(())
    }
}

/// Values carrying `%NAME%` tokens must stay expandable; otherwise keep
/// whatever string type was there.
fn value_type(value: &str, current: Option<RegType>) -> RegType {
    if has_env_token(value) {
        return REG_EXPAND_SZ;
    }
    match current {
        Some(vtype) if vtype == REG_SZ || vtype == REG_EXPAND_SZ => vtype,
        _ => REG_SZ,
    }
}

/// Tells running applications that the environment changed.
pub fn broadcast_env_change() {
    let env = to_wide("Environment");
    let mut result = 0usize;
    unsafe {
        let _ = SendMessageTimeoutW(
            HWND_BROADCAST,
            WM_SETTINGCHANGE,
            WPARAM(0),
            LPARAM(env.as_ptr() as isize),
            SMTO_ABORTIFHUNG,
            2000,
            Some(&mut result),
        );
    }
}

pub fn is_admin() -> bool {
    unsafe { IsUserAnAdmin().as_bool() }
}

/// Launches this executable again through the `runas` verb.
pub fn restart_as_admin() -> io::Result<()> {
    let exe = env::current_exe()?;
    let args = env::args()
        .skip(1)
        .map(|a| quote_arg(&a))
        .collect::<Vec<_>>()
        .join(" ");

    let op = to_wide("runas");
    let exe_w = to_wide(&exe.to_string_lossy());
    let args_w = to_wide(&args);

    let result = unsafe {
        ShellExecuteW(
            None,
            PCWSTR(op.as_ptr()),
            PCWSTR(exe_w.as_ptr()),
            if args.is_empty() {
                PCWSTR::null()
            } else {
                PCWSTR(args_w.as_ptr())
            },
            PCWSTR::null(),
            SW_SHOW,
        )
    };

    if result.0 as isize <= 32 {
        Err(io::Error::other(format!(
            "ShellExecuteW failed with code {}",
            result.0 as isize
        )))
    } else {
        Ok(())
    }
}

fn quote_arg(arg: &str) -> String {
    if arg.contains(' ') || arg.contains('"') {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(Some(0)).collect()
}

fn decode_utf16_reg(bytes: &[u8]) -> String {
    if bytes.len() < 2 {
        return String::new();
    }

    let mut utf16: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    while utf16.last() == Some(&0) {
        utf16.pop();
    }
    String::from_utf16_lossy(&utf16)
}

fn encode_utf16_reg(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .chain(Some(0))
        .flat_map(|u| u.to_le_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_strings_survive_encoding() {
        let value = r"%SystemRoot%\system32;C:\Prögram Files\tool";
        assert_eq!(decode_utf16_reg(&encode_utf16_reg(value)), value);
        assert_eq!(decode_utf16_reg(&[]), "");
        assert_eq!(decode_utf16_reg(&[0x41]), "");
    }

    #[test]
    fn tokens_force_expandable_strings() {
        assert!(value_type(r"%X%\bin", Some(REG_SZ)) == REG_EXPAND_SZ);
        assert!(value_type(r"C:\bin", Some(REG_EXPAND_SZ)) == REG_EXPAND_SZ);
        assert!(value_type(r"C:\bin", None) == REG_SZ);
    }

    #[test]
    fn arguments_with_spaces_are_quoted() {
        assert_eq!(quote_arg("plain"), "plain");
        assert_eq!(quote_arg("two words"), "\"two words\"");
    }
}
