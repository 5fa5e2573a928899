// src/config/duration.rs

use std::time::Duration;

use crate::scheduler::DEFAULT_TICK;

/// Parse a duration such as `"250ms"`, `"3s"`, `"2m"`, `"1h"` or `"10t"`
/// (host ticks of 50ms).
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => scaled_secs(value, 60, s),
        "h" => scaled_secs(value, 60 * 60, s),
        "t" => {
            let ticks = u32::try_from(value)
                .map_err(|_| format!("tick count {value} is too large"))?;
            Ok(DEFAULT_TICK * ticks)
        }
        _ => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, h, or t"
        )),
    }
}

fn scaled_secs(value: u64, secs_per_unit: u64, input: &str) -> Result<Duration, String> {
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{input}' is too large"))
}
