use std::sync::OnceLock;

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_u32_hex_or_dec(&v))
        .unwrap_or(default)
}

/// Accepts `0x`-prefixed hex, `$`-prefixed hex or decimal.
pub fn parse_u32_hex_or_dec(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix('$')) {
        u32::from_str_radix(stripped, 16).ok()
    } else {
        s.parse::<u32>().ok()
    }
}

// Log every executed instruction with its disassembly (trace level)
pub fn trace() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("DEBUG_TRACE", false))
}

pub fn dispatch() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("DEBUG_DISPATCH", false))
}

pub fn quiet() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("QUIET", false))
}

/// Instructions the outer dispatch loop hands to one inner-loop entry.
pub fn cpu_slice() -> usize {
    static VALUE: OnceLock<u32> = OnceLock::new();
    (*VALUE.get_or_init(|| env_u32("CPU_SLICE", 0x1000))).max(1) as usize
}
