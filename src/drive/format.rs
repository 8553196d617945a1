//! Human-readable byte counts.
//!
//! All rounding is done on integers so results are exact: a value is
//! rounded half-up to the requested number of decimals, the same rule a
//! browser's `toFixed`/`Math.round` pair produces for these inputs.

use std::fmt;

use serde::Serialize;

const KIB: u64 = 1024;
const MIB_SHIFT: u32 = 20;
const GIB_SHIFT: u32 = 30;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// `bytes / 2^shift`, rounded half-up to `decimals` places, as an integer
/// count of the smallest decimal step.
fn scaled_steps(bytes: u64, shift: u32, decimals: u32) -> u128 {
    let factor = 10u128.pow(decimals);
    let numerator = bytes as u128 * factor;
    if shift == 0 {
        return numerator;
    }
    (numerator + (1u128 << (shift - 1))) >> shift
}

/// Fixed-point rendering with exactly `decimals` places.
fn fixed(bytes: u64, shift: u32, decimals: u32) -> String {
    let steps = scaled_steps(bytes, shift, decimals);
    if decimals == 0 {
        return steps.to_string();
    }
    let factor = 10u128.pow(decimals);
    format!(
        "{}.{:0width$}",
        steps / factor,
        steps % factor,
        width = decimals as usize
    )
}

/// Format a byte count for a file row: `0 Bytes`, `1.5 KB`, `1 MB`.
///
/// The unit is the largest of Bytes/KB/MB/GB not exceeding the value
/// (`floor(log_1024(bytes))`, capped at GB); the scaled value keeps at
/// most two decimals with trailing zeros dropped.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut index = 0usize;
    while index + 1 < SIZE_UNITS.len() && bytes >= KIB.pow(index as u32 + 1) {
        index += 1;
    }

    let steps = scaled_steps(bytes, 10 * index as u32, 2);
    let whole = steps / 100;
    let frac = steps % 100;
    let value = if frac == 0 {
        whole.to_string()
    } else if frac % 10 == 0 {
        format!("{}.{}", whole, frac / 10)
    } else {
        format!("{}.{:02}", whole, frac)
    };
    format!("{} {}", value, SIZE_UNITS[index])
}

/// Per-category size label: MB with one decimal, or GB with two once the
/// amount reaches 1024 MB.
pub fn format_storage_size(bytes: u64) -> String {
    if bytes >= 1 << GIB_SHIFT {
        format!("{} GB", fixed(bytes, GIB_SHIFT, 2))
    } else {
        format!("{} MB", fixed(bytes, MIB_SHIFT, 1))
    }
}

/// Megabytes with two decimals, as used in the insufficient-storage alert.
pub fn megabytes(bytes: u64) -> String {
    fixed(bytes, MIB_SHIFT, 2)
}

/// Display unit for the usage summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayUnit {
    MB,
    GB,
}

impl DisplayUnit {
    /// Unit for a usage total: MB while the total is under 0.01 GB.
    pub fn for_usage(used_bytes: u64) -> Self {
        // used / 2^30 < 0.01  <=>  used * 100 < 2^30
        if (used_bytes as u128) * 100 < 1u128 << GIB_SHIFT {
            DisplayUnit::MB
        } else {
            DisplayUnit::GB
        }
    }

    fn shift(self) -> u32 {
        match self {
            DisplayUnit::MB => MIB_SHIFT,
            DisplayUnit::GB => GIB_SHIFT,
        }
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayUnit::MB => f.write_str("MB"),
            DisplayUnit::GB => f.write_str("GB"),
        }
    }
}

/// A `(value, unit)` pair with the value fixed at two decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayAmount {
    pub value: String,
    pub unit: DisplayUnit,
}

impl DisplayAmount {
    pub fn in_unit(bytes: u64, unit: DisplayUnit) -> Self {
        Self {
            value: fixed(bytes, unit.shift(), 2),
            unit,
        }
    }
}

impl fmt::Display for DisplayAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}
