//! Key code tables for the keys a remote can press.
//!
//! The remote only ever synthesises five keys: the four arrows and Return.
//! Each [`RemoteKey`] carries its platform-native code so an executor can
//! inject it without a lookup table of its own.
//!
//! | key        | macOS CGKeyCode | X11 KeySym | Windows VK |
//! |------------|-----------------|------------|------------|
//! | ArrowLeft  | `0x7B`          | `0xFF51`   | `0x25`     |
//! | ArrowUp    | `0x7E`          | `0xFF52`   | `0x26`     |
//! | ArrowRight | `0x7C`          | `0xFF53`   | `0x27`     |
//! | ArrowDown  | `0x7D`          | `0xFF54`   | `0x28`     |
//! | Enter      | `0x24`          | `0xFF0D`   | `0x0D`     |
//!
//! CGKeyCode values come from `HIToolbox/Events.h`, KeySyms from
//! `X11/keysymdef.h`, and VK codes from `WinUser.h`.

use std::fmt;

use serde::Serialize;

/// A key the remote can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RemoteKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Enter,
}

impl RemoteKey {
    /// Every key, in table order.
    pub const ALL: [RemoteKey; 5] = [
        RemoteKey::ArrowLeft,
        RemoteKey::ArrowUp,
        RemoteKey::ArrowRight,
        RemoteKey::ArrowDown,
        RemoteKey::Enter,
    ];

    /// macOS virtual key code (`kVK_*`).
    pub fn cg_keycode(self) -> u16 {
        match self {
            RemoteKey::ArrowLeft => 0x7B,  // kVK_LeftArrow
            RemoteKey::ArrowRight => 0x7C, // kVK_RightArrow
            RemoteKey::ArrowDown => 0x7D,  // kVK_DownArrow
            RemoteKey::ArrowUp => 0x7E,    // kVK_UpArrow
            RemoteKey::Enter => 0x24,      // kVK_Return
        }
    }

    /// X11 KeySym (`XK_*`).
    pub fn x11_keysym(self) -> u32 {
        match self {
            RemoteKey::ArrowLeft => 0xFF51,
            RemoteKey::ArrowUp => 0xFF52,
            RemoteKey::ArrowRight => 0xFF53,
            RemoteKey::ArrowDown => 0xFF54,
            RemoteKey::Enter => 0xFF0D,
        }
    }

    /// Windows virtual key code (`VK_*`).
    pub fn windows_vk(self) -> u8 {
        match self {
            RemoteKey::ArrowLeft => 0x25,
            RemoteKey::ArrowUp => 0x26,
            RemoteKey::ArrowRight => 0x27,
            RemoteKey::ArrowDown => 0x28,
            RemoteKey::Enter => 0x0D,
        }
    }

    /// The native code for the platform this crate was compiled for.
    pub fn native_code(self) -> u32 {
        #[cfg(target_os = "macos")]
        return u32::from(self.cg_keycode());
        #[cfg(target_os = "windows")]
        return u32::from(self.windows_vk());
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        return self.x11_keysym();
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteKey::ArrowUp => "up",
            RemoteKey::ArrowDown => "down",
            RemoteKey::ArrowLeft => "left",
            RemoteKey::ArrowRight => "right",
            RemoteKey::Enter => "enter",
        };
        f.write_str(name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
